//! Testing utilities including a mock checker.
//!
//! Useful for exercising the scheduler, and applications built on it, without
//! making real network calls.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::traits::checker::GroupChecker;
use crate::types::{
    group::{Group, Identifier},
    result::{CheckOutcome, CheckResult},
};

/// Reason reported for every identifier of a group hit by a simulated transport failure.
pub const SIMULATED_FAILURE: &str = "simulated transport failure";

/// A mock checker with configurable outcomes, latency, and failure modes.
///
/// Identifiers without a configured outcome are reported `Dead`. A group that
/// contains a failing identifier is reported unverified as a whole, the same
/// way a failed batch request is.
#[derive(Default)]
pub struct MockChecker {
    /// Predefined outcomes by identifier
    outcomes: RwLock<HashMap<Identifier, CheckOutcome>>,

    /// Identifiers whose group fails as a whole
    failing: RwLock<HashSet<Identifier>>,

    /// Identifiers whose group task panics
    panicking: RwLock<HashSet<Identifier>>,

    /// Identifiers whose group never answers
    hanging: RwLock<HashSet<Identifier>>,

    /// Latency applied to every call
    latency: Duration,

    /// Per-identifier latency; a group waits for its slowest member
    latency_overrides: RwLock<HashMap<Identifier, Duration>>,

    /// Call tracking for assertions
    calls: RwLock<Vec<Vec<Identifier>>>,

    current: AtomicUsize,
    peak: AtomicUsize,
}

struct ConcurrencyGuard<'a>(&'a AtomicUsize);

impl Drop for ConcurrencyGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap in an `Arc` for handing to a scheduler while keeping access to the mock.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn with_outcome(self, id: impl Into<Identifier>, outcome: CheckOutcome) -> Self {
        self.outcomes.write().unwrap().insert(id.into(), outcome);
        self
    }

    pub fn with_live(self, id: impl Into<Identifier>, resource_url: impl Into<String>) -> Self {
        self.with_outcome(
            id,
            CheckOutcome::Live {
                resource_url: resource_url.into(),
            },
        )
    }

    /// Fail every group that contains `id`.
    pub fn with_failure(self, id: impl Into<Identifier>) -> Self {
        self.failing.write().unwrap().insert(id.into());
        self
    }

    /// Panic inside every group check that contains `id`.
    pub fn with_panic(self, id: impl Into<Identifier>) -> Self {
        self.panicking.write().unwrap().insert(id.into());
        self
    }

    /// Never answer for a group that contains `id`.
    pub fn with_hang(self, id: impl Into<Identifier>) -> Self {
        self.hanging.write().unwrap().insert(id.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_latency_for(self, id: impl Into<Identifier>, latency: Duration) -> Self {
        self.latency_overrides
            .write()
            .unwrap()
            .insert(id.into(), latency);
        self
    }

    /// Groups received, in call order.
    pub fn calls(&self) -> Vec<Vec<Identifier>> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Calls currently in progress.
    pub fn in_flight(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Highest number of calls ever in progress at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn group_latency(&self, group: &Group) -> Duration {
        let overrides = self.latency_overrides.read().unwrap();
        group
            .identifiers()
            .iter()
            .filter_map(|id| overrides.get(id).copied())
            .max()
            .unwrap_or(self.latency)
    }

    fn any_in(set: &RwLock<HashSet<Identifier>>, group: &Group) -> bool {
        let set = set.read().unwrap();
        group.identifiers().iter().any(|id| set.contains(id))
    }
}

#[async_trait]
impl GroupChecker for MockChecker {
    async fn check_group(&self, group: &Group) -> Vec<CheckResult> {
        self.calls
            .write()
            .unwrap()
            .push(group.identifiers().to_vec());

        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = ConcurrencyGuard(&self.current);

        let latency = self.group_latency(group);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if Self::any_in(&self.hanging, group) {
            std::future::pending::<()>().await;
        }

        if Self::any_in(&self.panicking, group) {
            panic!("mock checker panicked on group {}", group.index());
        }

        if Self::any_in(&self.failing, group) {
            return group
                .identifiers()
                .iter()
                .map(|id| CheckResult::unknown(id.clone(), SIMULATED_FAILURE))
                .collect();
        }

        let outcomes = self.outcomes.read().unwrap();
        group
            .identifiers()
            .iter()
            .map(|id| {
                let outcome = outcomes.get(id).cloned().unwrap_or(CheckOutcome::Dead);
                CheckResult::from_outcome(id.clone(), outcome)
            })
            .collect()
    }
}
