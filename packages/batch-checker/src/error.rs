//! Typed errors for the batch checker.
//!
//! None of these reach the caller of a run. The call wrapper turns every
//! failure into an `Unknown` outcome carrying the error's display text, so a
//! run always finishes with one result per identifier.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while configuring or talking to the remote API.
#[derive(Debug, Error)]
pub enum CheckerError {
    /// Invalid configuration value
    #[error("config error: {0}")]
    Config(String),

    /// Transport failure (connection refused, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote API answered the batch with a non-2xx status
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body was not valid JSON
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Response was valid JSON but not the expected batch array
    #[error("unexpected response shape: {0}")]
    ResponseShape(String),

    /// The call did not finish within the configured timeout
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The run was cancelled before the call finished
    #[error("operation cancelled")]
    Cancelled,

    /// The event stream closed without a completion message
    #[error("run ended without a completion message")]
    RunAborted,
}

impl CheckerError {
    /// Create a config error from anything displayable.
    pub fn config(message: impl Into<String>) -> Self {
        CheckerError::Config(message.into())
    }
}

/// Result type alias for checker operations.
pub type Result<T> = std::result::Result<T, CheckerError>;
