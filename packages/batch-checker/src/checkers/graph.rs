//! Batch API client: one HTTP request per group.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::wire::{classify, parse_batch_response, BatchRequest};
use crate::error::{CheckerError, Result};
use crate::traits::checker::GroupChecker;
use crate::types::{config::GraphClientConfig, group::Group, result::CheckResult};

/// Checks groups against a remote batch endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use batch_checker::{GraphBatchClient, GraphClientConfig};
///
/// let client = GraphBatchClient::new(GraphClientConfig::new("https://graph.example.com"))?;
/// let results = client.check_group(&group).await;
/// ```
#[derive(Clone)]
pub struct GraphBatchClient {
    client: reqwest::Client,
    config: GraphClientConfig,
}

impl GraphBatchClient {
    /// Create a client with its own connection pool.
    pub fn new(config: GraphClientConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    /// Create a client that reuses an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, config: GraphClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GraphClientConfig {
        &self.config
    }

    /// Send one batch request and return the raw sub-response entries.
    ///
    /// Entries are positional: entry `i` answers `group.identifiers()[i]`.
    pub async fn send_batch(&self, group: &Group) -> Result<Vec<Value>> {
        let request = BatchRequest::from_relative_urls(
            group
                .identifiers()
                .iter()
                .map(|id| self.config.relative_url_for(id)),
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CheckerError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw = response.text().await?;
        parse_batch_response(&raw)
    }
}

#[async_trait]
impl GroupChecker for GraphBatchClient {
    async fn check_group(&self, group: &Group) -> Vec<CheckResult> {
        let entries = match self.send_batch(group).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    group = group.index(),
                    size = group.len(),
                    error = %e,
                    "Batch request failed, reporting whole group as unverified"
                );
                let reason = e.to_string();
                return group
                    .identifiers()
                    .iter()
                    .map(|id| CheckResult::unknown(id.clone(), reason.clone()))
                    .collect();
            }
        };

        if entries.len() != group.len() {
            debug!(
                group = group.index(),
                expected = group.len(),
                received = entries.len(),
                "Sub-response count does not match group size"
            );
        }

        group
            .identifiers()
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let outcome = classify(entries.get(i), &self.config.placeholder_marker);
                CheckResult::from_outcome(id.clone(), outcome)
            })
            .collect()
    }
}
