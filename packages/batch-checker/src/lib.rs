//! Batch existence checker.
//!
//! Takes a large list of opaque identifiers and checks each against a remote
//! API that only accepts bounded-size batches, with a hard cap on concurrent
//! requests, periodic progress snapshots, and failures reported as data
//! instead of errors.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use batch_checker::{CheckerConfig, GraphBatchClient, GraphClientConfig, Scheduler};
//!
//! let client = GraphBatchClient::new(GraphClientConfig::default())?;
//! let scheduler = Scheduler::new(Arc::new(client), CheckerConfig::default())?;
//!
//! let report = scheduler.start(identifiers).collect().await?;
//! println!("{} of {} live", report.summary.live, report.summary.total);
//! ```
//!
//! # Modules
//!
//! - [`batcher`] - Partitioning into request-sized groups
//! - [`checkers`] - `GroupChecker` implementations (batch HTTP client)
//! - [`scheduler`] - Bounded-concurrency run orchestration and progress reporting
//! - [`traits`] - The `GroupChecker` seam
//! - [`types`] - Results, progress messages, and configuration
//! - [`testing`] - Mock checker for tests

pub mod batcher;
pub mod checkers;
pub mod error;
pub mod scheduler;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use batcher::partition;
pub use checkers::GraphBatchClient;
pub use error::{CheckerError, Result};
pub use scheduler::{RunHandle, RunReport, Scheduler};
pub use traits::checker::GroupChecker;
pub use types::{
    config::{CheckerConfig, GraphClientConfig},
    group::{Group, Identifier},
    progress::{ProgressSnapshot, RunEvent, RunSummary},
    result::{CheckOutcome, CheckResult, CheckStatus},
};

// Re-export for callers that cancel runs or drive `Scheduler::run` directly
pub use tokio_util::sync::CancellationToken;
