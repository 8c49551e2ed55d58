// Command-line entry point for batch existence checks

mod config;
mod input;
mod report;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use batch_checker::{GraphBatchClient, ProgressSnapshot, RunEvent, Scheduler};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{EnvConfig, Settings};

/// Check a list of identifiers against the remote batch API.
#[derive(Debug, Parser)]
#[command(name = "check", version)]
pub struct Args {
    /// File with one identifier per line, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    pub input: PathBuf,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only print live identifiers, one per line
    #[arg(long)]
    pub live_only: bool,

    /// Identifiers per remote request
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Maximum simultaneous remote requests
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Progress report interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Per-request timeout in seconds (0 disables it)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Batch API endpoint
    #[arg(long)]
    pub endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (stderr, so stdout stays clean for the report)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,batch_checker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let env = EnvConfig::from_env().context("Failed to load configuration")?;
    let settings = Settings::resolve(env, &args)?;
    tracing::info!(
        endpoint = %settings.client.endpoint,
        batch_size = settings.checker.batch_size,
        concurrency = settings.checker.concurrency_limit,
        "Configuration loaded"
    );

    let identifiers = input::read_identifiers(&args.input)?;
    let total = identifiers.len();
    tracing::info!(total, "Identifiers loaded");

    let client = GraphBatchClient::new(settings.client).context("Failed to create HTTP client")?;
    let scheduler = Scheduler::new(Arc::new(client), settings.checker)
        .context("Failed to create scheduler")?;

    let mut run = scheduler.start(identifiers);
    let mut last: Option<ProgressSnapshot> = None;
    let mut interrupted = false;

    loop {
        let event = tokio::select! {
            event = run.next_event() => event,
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                tracing::warn!("Interrupted, cancelling run");
                run.cancel();
                continue;
            }
        };

        match event {
            Some(RunEvent::Progress(snapshot)) => {
                tracing::info!(
                    completed = snapshot.completed_count,
                    total,
                    items_per_second = snapshot.items_per_second,
                    "Progress"
                );
                last = Some(snapshot);
            }
            Some(RunEvent::Completed(summary)) => {
                let results = last.map(|s| s.results).unwrap_or_default();
                report::write_report(
                    &summary,
                    &results,
                    args.output.as_deref(),
                    args.live_only,
                )?;
                eprintln!("{}", report::summary_line(&summary));
                return Ok(());
            }
            None => anyhow::bail!("Run ended without a completion message"),
        }
    }
}
