use anyhow::{Context, Result};
use batch_checker::{CheckerConfig, GraphClientConfig};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::Args;

/// Checker settings loaded from environment variables.
///
/// Every value is optional; unset values fall back to library defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub endpoint: Option<String>,
    pub relative_url: Option<String>,
    pub placeholder_marker: Option<String>,
    pub batch_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub progress_interval_ms: Option<u64>,
    pub call_timeout_secs: Option<u64>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            endpoint: lookup("CHECKER_ENDPOINT"),
            relative_url: lookup("CHECKER_RELATIVE_URL"),
            placeholder_marker: lookup("CHECKER_PLACEHOLDER_MARKER"),
            batch_size: parse(&lookup, "CHECKER_BATCH_SIZE")?,
            concurrency: parse(&lookup, "CHECKER_CONCURRENCY")?,
            progress_interval_ms: parse(&lookup, "CHECKER_PROGRESS_INTERVAL_MS")?,
            call_timeout_secs: parse(&lookup, "CHECKER_CALL_TIMEOUT_SECS")?,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a valid number"))
        })
        .transpose()
}

/// Effective configuration: command-line flags win over the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub checker: CheckerConfig,
    pub client: GraphClientConfig,
}

impl Settings {
    pub fn resolve(env: EnvConfig, args: &Args) -> Result<Self> {
        let mut checker = CheckerConfig::default();
        if let Some(size) = args.batch_size.or(env.batch_size) {
            checker = checker.with_batch_size(size);
        }
        if let Some(limit) = args.concurrency.or(env.concurrency) {
            checker = checker.with_concurrency_limit(limit);
        }
        if let Some(ms) = args.interval_ms.or(env.progress_interval_ms) {
            checker = checker.with_progress_interval(Duration::from_millis(ms));
        }
        match args.timeout_secs.or(env.call_timeout_secs) {
            Some(0) => checker = checker.without_call_timeout(),
            Some(secs) => checker = checker.with_call_timeout(Duration::from_secs(secs)),
            None => {}
        }
        checker.validate().context("Invalid checker configuration")?;

        let mut client = GraphClientConfig::default();
        if let Some(endpoint) = args.endpoint.clone().or(env.endpoint) {
            client.endpoint = endpoint;
        }
        if let Some(template) = env.relative_url {
            client = client.with_relative_url_template(template);
        }
        if let Some(marker) = env.placeholder_marker {
            client = client.with_placeholder_marker(marker);
        }
        client.validate().context("Invalid client configuration")?;

        Ok(Self { checker, client })
    }
}
