//! Messages streamed to the caller during a run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::CheckResult;

/// Point-in-time copy of a run's merged results.
///
/// Snapshots are owned copies; later merges never show up in one already sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub results: Vec<CheckResult>,
    pub completed_count: usize,
    pub items_per_second: f64,
}

impl ProgressSnapshot {
    /// Build a snapshot, deriving throughput from the time since run start.
    pub fn new(results: Vec<CheckResult>, completed_count: usize, elapsed: Duration) -> Self {
        Self {
            results,
            completed_count,
            items_per_second: items_per_second(completed_count, elapsed),
        }
    }

    /// The terminal snapshot: count forced to the input length, rate zeroed.
    pub fn terminal(results: Vec<CheckResult>, total: usize) -> Self {
        Self {
            results,
            completed_count: total,
            items_per_second: 0.0,
        }
    }
}

fn items_per_second(completed: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        completed as f64 / secs
    } else {
        0.0
    }
}

/// Totals reported with the completion message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: Uuid,
    pub total: usize,
    pub live: usize,
    /// All `Die` results, including unverified ones.
    pub dead: usize,
    /// `Die` results whose check could not be completed.
    pub unverified: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn from_results(
        run_id: Uuid,
        results: &[CheckResult],
        cancelled: bool,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let live = results.iter().filter(|r| r.is_live()).count();
        let unverified = results.iter().filter(|r| r.is_unverified()).count();
        Self {
            run_id,
            total: results.len(),
            live,
            dead: results.len() - live,
            unverified,
            cancelled,
            started_at,
            finished_at: Utc::now(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Everything the caller ever receives from a run.
///
/// Zero or more `Progress` events, then exactly one `Completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RunEvent {
    Progress(ProgressSnapshot),
    Completed(RunSummary),
}

impl RunEvent {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunEvent::Completed(_))
    }
}
