//! Configuration types for runs and for the remote API client.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CheckerError, Result};

/// Placeholder substituted with the identifier in [`GraphClientConfig::relative_url_template`].
pub const ID_PLACEHOLDER: &str = "{id}";

/// Configuration for one scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Identifiers per remote request.
    ///
    /// Must not exceed what the remote API accepts in a single batch. Default: 50.
    pub batch_size: usize,

    /// Maximum number of remote requests outstanding at any instant.
    ///
    /// Default: 10.
    pub concurrency_limit: usize,

    /// How often a progress snapshot is emitted while a run is active.
    ///
    /// Default: 500ms.
    pub progress_interval: Duration,

    /// Upper bound on a single group's remote call.
    ///
    /// A call that exceeds it degrades to unverified for the whole group.
    /// `None` disables the bound. Default: 30s.
    pub call_timeout: Option<Duration>,

    /// Capacity of the event channel handed to the caller by `Scheduler::start`.
    ///
    /// Default: 64.
    pub event_buffer: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            concurrency_limit: 10,
            progress_interval: Duration::from_millis(500),
            call_timeout: Some(Duration::from_secs(30)),
            event_buffer: 64,
        }
    }
}

impl CheckerConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn without_call_timeout(mut self) -> Self {
        self.call_timeout = None;
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Reject values the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(CheckerError::config("batch_size must be greater than 0"));
        }
        if self.concurrency_limit == 0 {
            return Err(CheckerError::config(
                "concurrency_limit must be greater than 0",
            ));
        }
        if self.progress_interval.is_zero() {
            return Err(CheckerError::config(
                "progress_interval must be greater than 0",
            ));
        }
        if self.call_timeout.is_some_and(|t| t.is_zero()) {
            return Err(CheckerError::config("call_timeout must be greater than 0"));
        }
        if self.event_buffer == 0 {
            return Err(CheckerError::config("event_buffer must be greater than 0"));
        }
        Ok(())
    }

    pub(crate) fn batch_size_nonzero(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.batch_size)
            .ok_or_else(|| CheckerError::config("batch_size must be greater than 0"))
    }
}

/// Configuration for [`crate::checkers::GraphBatchClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphClientConfig {
    /// Batch endpoint that accepts `{"batch": [...]}` bodies.
    pub endpoint: String,

    /// Sub-request path; `{id}` is replaced with the identifier.
    pub relative_url_template: String,

    /// Text that marks a resolved URL as the generic placeholder asset.
    pub placeholder_marker: String,

    /// Transport-level timeout for one batch request.
    pub request_timeout: Duration,

    pub user_agent: String,
}

impl Default for GraphClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://graph.facebook.com".to_string(),
            relative_url_template: "{id}/picture?type=normal&redirect=false".to_string(),
            placeholder_marker: "static.xx.fbcdn.net".to_string(),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("batch-checker/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl GraphClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn with_relative_url_template(mut self, template: impl Into<String>) -> Self {
        self.relative_url_template = template.into();
        self
    }

    pub fn with_placeholder_marker(mut self, marker: impl Into<String>) -> Self {
        self.placeholder_marker = marker.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(CheckerError::config("endpoint must not be empty"));
        }
        if !self.relative_url_template.contains(ID_PLACEHOLDER) {
            return Err(CheckerError::config(format!(
                "relative_url_template must contain {ID_PLACEHOLDER}"
            )));
        }
        if self.placeholder_marker.is_empty() {
            return Err(CheckerError::config("placeholder_marker must not be empty"));
        }
        Ok(())
    }

    /// Sub-request path for one identifier.
    ///
    /// The identifier is percent-encoded, so it always fills a single path
    /// segment and cannot add query parameters or a fragment.
    pub fn relative_url_for(&self, id: &str) -> String {
        self.relative_url_template.replace(ID_PLACEHOLDER, &urlencoding::encode(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CheckerConfig::default().validate().is_ok());
        assert!(GraphClientConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let err = CheckerConfig::new().with_batch_size(0).validate().unwrap_err();
        assert!(matches!(err, CheckerError::Config(_)));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = CheckerConfig::new().with_concurrency_limit(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected_but_none_allowed() {
        assert!(CheckerConfig::new()
            .with_call_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(CheckerConfig::new().without_call_timeout().validate().is_ok());
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let config = GraphClientConfig::default().with_relative_url_template("picture");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_url_for_substitutes_id() {
        let config = GraphClientConfig::default();
        assert_eq!(
            config.relative_url_for("1000123"),
            "1000123/picture?type=normal&redirect=false"
        );
    }

    #[test]
    fn test_relative_url_for_encodes_reserved_characters() {
        let config = GraphClientConfig::default();
        assert_eq!(
            config.relative_url_for("123/friends?limit=5000&x=1"),
            "123%2Ffriends%3Flimit%3D5000%26x%3D1/picture?type=normal&redirect=false"
        );
        assert_eq!(
            config.relative_url_for("a b#frag"),
            "a%20b%23frag/picture?type=normal&redirect=false"
        );
    }
}
