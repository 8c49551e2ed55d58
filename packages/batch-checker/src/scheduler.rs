//! Scheduler: runs every group through a [`GroupChecker`] under a concurrency cap.
//!
//! # Architecture
//!
//! ```text
//! Scheduler::start(identifiers)
//!     │
//!     ├─► partition() ─► pending (FIFO)
//!     │
//!     ├─► dispatch loop ── in_flight: JoinSet (len ≤ concurrency_limit)
//!     │       │                 └─► check_group() under call_timeout
//!     │       └─► merge ─► completed_results ──batch──► Reporter task
//!     │                                                     │ every progress_interval
//!     │                                                     ▼
//!     └─► final snapshot + Completed ───────────────► RunEvent channel ─► caller
//! ```
//!
//! The reporter owns its own copy of merged results, fed over a channel, so a
//! snapshot never aliases state the scheduler is still mutating. Progress
//! snapshots are sent with `try_send` and dropped when the caller lags; the
//! final snapshot and the completion message are always delivered.

use std::collections::{HashMap, VecDeque};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::batcher::partition;
use crate::error::{CheckerError, Result};
use crate::traits::checker::GroupChecker;
use crate::types::{
    config::CheckerConfig,
    group::{Group, Identifier},
    progress::{ProgressSnapshot, RunEvent, RunSummary},
    result::CheckResult,
};

/// Runs identifier lists against a checker, one run at a time per call.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use batch_checker::{CheckerConfig, GraphBatchClient, GraphClientConfig, RunEvent, Scheduler};
///
/// let client = GraphBatchClient::new(GraphClientConfig::default())?;
/// let scheduler = Scheduler::new(Arc::new(client), CheckerConfig::default())?;
///
/// let mut run = scheduler.start(identifiers);
/// while let Some(event) = run.next_event().await {
///     match event {
///         RunEvent::Progress(p) => println!("{} done, {:.1}/s", p.completed_count, p.items_per_second),
///         RunEvent::Completed(summary) => println!("{} live", summary.live),
///     }
/// }
/// ```
pub struct Scheduler<C: ?Sized> {
    checker: Arc<C>,
    config: CheckerConfig,
    batch_size: NonZeroUsize,
}

impl<C: ?Sized> Clone for Scheduler<C> {
    fn clone(&self) -> Self {
        Self {
            checker: self.checker.clone(),
            config: self.config.clone(),
            batch_size: self.batch_size,
        }
    }
}

impl<C: GroupChecker + ?Sized + 'static> Scheduler<C> {
    /// Create a scheduler, rejecting an unusable config.
    pub fn new(checker: Arc<C>, config: CheckerConfig) -> Result<Self> {
        config.validate()?;
        let batch_size = config.batch_size_nonzero()?;
        Ok(Self {
            checker,
            config,
            batch_size,
        })
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Spawn a run in the background and hand back its event stream.
    ///
    /// The returned handle always yields a `Completed` event eventually, even
    /// when the run task itself dies unexpectedly.
    pub fn start(&self, identifiers: Vec<Identifier>) -> RunHandle {
        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(self.config.event_buffer);

        let identifiers: Arc<[Identifier]> = identifiers.into();
        let scheduler = self.clone();
        let run_ids = identifiers.clone();
        let run_tx = tx.clone();
        let run_cancel = cancel.clone();
        let run_task = tokio::spawn(async move {
            scheduler
                .run_with_id(run_id, &run_ids, run_tx, run_cancel)
                .await
        });

        let task = tokio::spawn(supervise(run_task, identifiers, tx, run_id));

        RunHandle {
            run_id,
            events: rx,
            cancel,
            task,
        }
    }

    /// Drive one run to completion in the current task.
    ///
    /// Sends zero or more `Progress` events, then the terminal snapshot and
    /// exactly one `Completed` event on `events`.
    pub async fn run(
        &self,
        identifiers: &[Identifier],
        events: mpsc::Sender<RunEvent>,
        cancel: CancellationToken,
    ) -> RunSummary {
        self.run_with_id(Uuid::new_v4(), identifiers, events, cancel)
            .await
    }

    async fn run_with_id(
        &self,
        run_id: Uuid,
        identifiers: &[Identifier],
        events: mpsc::Sender<RunEvent>,
        cancel: CancellationToken,
    ) -> RunSummary {
        let span = info_span!("check_run", run_id = %run_id);
        self.execute(run_id, identifiers, events, cancel)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        identifiers: &[Identifier],
        events: mpsc::Sender<RunEvent>,
        cancel: CancellationToken,
    ) -> RunSummary {
        let total = identifiers.len();
        let mut state = RunState::new(partition(identifiers, self.batch_size), total);

        info!(
            total,
            groups = state.pending.len(),
            batch_size = self.batch_size.get(),
            concurrency_limit = self.config.concurrency_limit,
            "Check run starting"
        );

        let (merged_tx, merged_rx) = mpsc::unbounded_channel();
        let reporter_stop = CancellationToken::new();
        let reporter = Reporter {
            merged: merged_rx,
            events: events.clone(),
            interval: self.config.progress_interval,
            started_at: state.started_at,
        };
        let reporter_handle = tokio::spawn(
            reporter
                .run(reporter_stop.clone())
                .instrument(info_span!("progress_reporter")),
        );

        let cancelled = self.drive(&mut state, &merged_tx, &cancel).await;
        if cancelled {
            state.cancel_remaining();
        }

        drop(merged_tx);
        reporter_stop.cancel();
        if let Err(e) = reporter_handle.await {
            warn!(error = %e, "Progress reporter stopped abnormally");
        }

        let elapsed = state.started_at.elapsed();
        let summary = RunSummary::from_results(
            run_id,
            &state.completed_results,
            cancelled,
            state.started_wall,
            elapsed,
        );

        info!(
            total,
            live = summary.live,
            dead = summary.dead,
            unverified = summary.unverified,
            cancelled,
            elapsed_ms = summary.elapsed_ms,
            "Check run complete"
        );

        let snapshot = ProgressSnapshot::terminal(state.completed_results, total);
        deliver(&events, RunEvent::Progress(snapshot)).await;
        deliver(&events, RunEvent::Completed(summary.clone())).await;

        summary
    }

    /// Dispatch and merge until every group is done. Returns true if cancelled.
    async fn drive(
        &self,
        state: &mut RunState,
        merged: &mpsc::UnboundedSender<Vec<CheckResult>>,
        cancel: &CancellationToken,
    ) -> bool {
        let limit = self.config.concurrency_limit;
        let mut draining = false;

        loop {
            if cancel.is_cancelled() {
                return true;
            }

            while state.in_flight.len() < limit {
                let Some(group) = state.pending.pop_front() else {
                    break;
                };
                self.dispatch(state, group);
            }

            if state.pending.is_empty() && !draining {
                draining = true;
                debug!(in_flight = state.in_flight.len(), "All groups dispatched, draining");
            }

            if state.in_flight.is_empty() {
                return false;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return true,
                joined = state.in_flight.join_next_with_id() => {
                    if let Some(joined) = joined {
                        state.settle(joined, merged);
                    }
                }
            }
        }
    }

    fn dispatch(&self, state: &mut RunState, group: Group) {
        debug!(
            group = group.index(),
            size = group.len(),
            in_flight = state.in_flight.len() + 1,
            "Dispatching group"
        );

        let checker = self.checker.clone();
        let timeout = self.config.call_timeout;
        let task_group = group.clone();
        let handle = state.in_flight.spawn(
            async move { check_with_timeout(checker.as_ref(), &task_group, timeout).await }
                .in_current_span(),
        );
        state.in_flight_groups.insert(handle.id(), group);
    }
}

/// Wait for the run task; if it died, finish the run on its behalf.
///
/// Every identifier is reported unverified so the caller still receives a
/// complete terminal snapshot followed by exactly one `Completed`.
async fn supervise(
    run_task: JoinHandle<RunSummary>,
    identifiers: Arc<[Identifier]>,
    events: mpsc::Sender<RunEvent>,
    run_id: Uuid,
) {
    let started_at = Utc::now();
    let Err(e) = run_task.await else {
        return;
    };

    error!(run_id = %run_id, error = %e, "Run task failed before completing");
    let reason = format!("run failed: {e}");
    let results: Vec<CheckResult> = identifiers
        .iter()
        .map(|id| CheckResult::unknown(id.clone(), reason.clone()))
        .collect();
    let summary = RunSummary::from_results(run_id, &results, false, started_at, Duration::ZERO);
    let total = results.len();
    deliver(&events, RunEvent::Progress(ProgressSnapshot::terminal(results, total))).await;
    deliver(&events, RunEvent::Completed(summary)).await;
}

async fn check_with_timeout<C: GroupChecker + ?Sized>(
    checker: &C,
    group: &Group,
    timeout: Option<Duration>,
) -> Vec<CheckResult> {
    let Some(limit) = timeout else {
        return checker.check_group(group).await;
    };

    match tokio::time::timeout(limit, checker.check_group(group)).await {
        Ok(results) => results,
        Err(_) => {
            warn!(group = group.index(), timeout = ?limit, "Group check timed out");
            unverified(group, &CheckerError::Timeout(limit).to_string())
        }
    }
}

fn unverified(group: &Group, reason: &str) -> Vec<CheckResult> {
    group
        .identifiers()
        .iter()
        .map(|id| CheckResult::unknown(id.clone(), reason))
        .collect()
}

/// Force exactly one result per identifier in the group.
fn reconcile(group: &Group, mut results: Vec<CheckResult>) -> Vec<CheckResult> {
    if results.len() != group.len() {
        warn!(
            group = group.index(),
            expected = group.len(),
            received = results.len(),
            "Checker returned the wrong number of results"
        );
        results.truncate(group.len());
        let missing = &group.identifiers()[results.len()..];
        results.extend(
            missing
                .iter()
                .map(|id| CheckResult::unknown(id.clone(), "missing result")),
        );
    }
    results
}

async fn deliver(events: &mpsc::Sender<RunEvent>, event: RunEvent) {
    if events.send(event).await.is_err() {
        debug!("Event receiver dropped, discarding event");
    }
}

/// State owned by the scheduler for the lifetime of one run.
struct RunState {
    pending: VecDeque<Group>,
    in_flight: JoinSet<Vec<CheckResult>>,
    in_flight_groups: HashMap<task::Id, Group>,
    completed_results: Vec<CheckResult>,
    completed_count: usize,
    started_at: Instant,
    started_wall: DateTime<Utc>,
}

impl RunState {
    fn new(groups: Vec<Group>, total: usize) -> Self {
        Self {
            pending: groups.into(),
            in_flight: JoinSet::new(),
            in_flight_groups: HashMap::new(),
            completed_results: Vec::with_capacity(total),
            completed_count: 0,
            started_at: Instant::now(),
            started_wall: Utc::now(),
        }
    }

    fn settle(
        &mut self,
        joined: std::result::Result<(task::Id, Vec<CheckResult>), task::JoinError>,
        merged: &mpsc::UnboundedSender<Vec<CheckResult>>,
    ) {
        let (id, results) = match joined {
            Ok((id, results)) => (id, Ok(results)),
            Err(e) => (e.id(), Err(e)),
        };

        let Some(group) = self.in_flight_groups.remove(&id) else {
            error!(task_id = %id, "Finished task has no recorded group");
            return;
        };

        let results = match results {
            Ok(results) => reconcile(&group, results),
            Err(e) => {
                error!(group = group.index(), error = %e, "Group check task failed");
                unverified(&group, &format!("check task failed: {e}"))
            }
        };

        debug!(group = group.index(), size = group.len(), "Group complete");
        self.merge(results, merged);
    }

    fn merge(
        &mut self,
        results: Vec<CheckResult>,
        merged: &mpsc::UnboundedSender<Vec<CheckResult>>,
    ) {
        self.completed_count += results.len();
        // Reporter is stopped only after the last merge, so this cannot fail mid-run.
        let _ = merged.send(results.clone());
        self.completed_results.extend(results);
    }

    /// Abandon in-flight calls and report every unchecked identifier as cancelled.
    fn cancel_remaining(&mut self) {
        self.in_flight.abort_all();
        let abandoned = self.in_flight_groups.len();
        let skipped = self.pending.len();

        let unchecked: Vec<Group> = self
            .in_flight_groups
            .drain()
            .map(|(_, group)| group)
            .chain(self.pending.drain(..))
            .collect();
        let reason = CheckerError::Cancelled.to_string();
        for group in unchecked {
            let results = unverified(&group, &reason);
            self.completed_count += results.len();
            self.completed_results.extend(results);
        }

        info!(
            abandoned_groups = abandoned,
            skipped_groups = skipped,
            completed = self.completed_count,
            "Run cancelled"
        );
    }
}

/// Lower-priority task that turns merged batches into periodic snapshots.
struct Reporter {
    merged: mpsc::UnboundedReceiver<Vec<CheckResult>>,
    events: mpsc::Sender<RunEvent>,
    interval: Duration,
    started_at: Instant,
}

impl Reporter {
    async fn run(mut self, stop: CancellationToken) {
        let mut results: Vec<CheckResult> = Vec::new();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await; // Skip first immediate tick

        loop {
            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    let snapshot =
                        ProgressSnapshot::new(results.clone(), results.len(), self.started_at.elapsed());
                    if let Err(e) = self.events.try_send(RunEvent::Progress(snapshot)) {
                        debug!(error = %e, "Skipping progress snapshot");
                    }
                }
                batch = self.merged.recv() => match batch {
                    Some(batch) => results.extend(batch),
                    None => break,
                },
            }
        }
    }
}

/// Caller-side handle to a run started with [`Scheduler::start`].
pub struct RunHandle {
    run_id: Uuid,
    events: mpsc::Receiver<RunEvent>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Final outcome of a run, assembled from its event stream.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub results: Vec<CheckResult>,
    /// Number of progress events received, the terminal snapshot included.
    pub progress_events: usize,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Ask the run to stop. The run still ends with a `Completed` event.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Next event, or `None` once the run has finished and the stream is drained.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    /// Drain the event stream and return the final results.
    pub async fn collect(mut self) -> Result<RunReport> {
        let mut last: Option<ProgressSnapshot> = None;
        let mut progress_events = 0;

        while let Some(event) = self.events.recv().await {
            match event {
                RunEvent::Progress(snapshot) => {
                    progress_events += 1;
                    last = Some(snapshot);
                }
                RunEvent::Completed(summary) => {
                    let _ = (&mut self.task).await;
                    return Ok(RunReport {
                        summary,
                        results: last.map(|s| s.results).unwrap_or_default(),
                        progress_events,
                    });
                }
            }
        }

        Err(CheckerError::RunAborted)
    }
}
