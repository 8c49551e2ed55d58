//! Integration tests for complete scheduler runs against the mock checker.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use batch_checker::{
    testing::{MockChecker, SIMULATED_FAILURE},
    CancellationToken, CheckResult, CheckStatus, CheckerConfig, Group, GroupChecker, RunEvent,
    RunHandle, Scheduler,
};
use tokio::sync::mpsc;

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("id{i}")).collect()
}

fn fast_config() -> CheckerConfig {
    CheckerConfig::new().with_progress_interval(Duration::from_millis(5))
}

/// Drain a run, asserting it ends with exactly one `Completed` event.
async fn drain(mut run: RunHandle) -> Vec<RunEvent> {
    let mut events = Vec::new();
    while let Some(event) = run.next_event().await {
        events.push(event);
    }
    let completed = events.iter().filter(|e| e.is_completed()).count();
    assert_eq!(completed, 1, "expected exactly one Completed event");
    assert!(events.last().unwrap().is_completed(), "Completed must be last");
    events
}

fn progress_counts(events: &[RunEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Progress(p) => Some(p.completed_count),
            RunEvent::Completed(_) => None,
        })
        .collect()
}

fn terminal_snapshot(events: &[RunEvent]) -> &batch_checker::ProgressSnapshot {
    match &events[events.len() - 2] {
        RunEvent::Progress(p) => p,
        other => panic!("expected terminal snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn test_all_succeed_scenario() {
    let mock = MockChecker::new()
        .with_live("A", "x")
        .with_live("C", "y")
        .shared();
    let scheduler = Scheduler::new(mock.clone(), fast_config().with_batch_size(2)).unwrap();

    let events = drain(scheduler.start(vec!["A".into(), "B".into(), "C".into()])).await;
    let terminal = terminal_snapshot(&events);

    assert_eq!(terminal.completed_count, 3);
    assert_eq!(terminal.items_per_second, 0.0);

    let got: HashSet<_> = terminal.results.iter().cloned().map(|r| (r.id, r.status, r.resource_url)).collect();
    let expected: HashSet<_> = [
        ("A".to_string(), CheckStatus::Live, "x".to_string()),
        ("B".to_string(), CheckStatus::Die, String::new()),
        ("C".to_string(), CheckStatus::Live, "y".to_string()),
    ]
    .into_iter()
    .collect();
    assert_eq!(got, expected);
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_batch_failure_degrades_whole_group() {
    let mock = MockChecker::new().with_live("id1", "x").with_failure("id0").shared();
    let scheduler = Scheduler::new(mock, fast_config().with_batch_size(5)).unwrap();

    let report = scheduler.start(ids(5)).collect().await.unwrap();

    assert_eq!(report.results.len(), 5);
    assert!(report
        .results
        .iter()
        .all(|r| r.status == CheckStatus::Die && r.resource_url.is_empty()));
    assert_eq!(report.summary.unverified, 5);
    assert_eq!(report.summary.total, 5);
}

#[tokio::test]
async fn test_failed_group_does_not_halt_others() {
    let mock = MockChecker::new()
        .with_failure("id0")
        .with_live("id7", "https://cdn.example/7.jpg")
        .shared();
    let scheduler = Scheduler::new(mock, fast_config().with_batch_size(5)).unwrap();

    let report = scheduler.start(ids(10)).collect().await.unwrap();

    assert_eq!(report.results.len(), 10);
    let live: Vec<_> = report.results.iter().filter(|r| r.is_live()).collect();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, "id7");
    assert_eq!(
        report
            .results
            .iter()
            .filter(|r| r.reason.as_deref() == Some(SIMULATED_FAILURE))
            .count(),
        5
    );
}

#[tokio::test]
async fn test_empty_input_completes_without_calls() {
    let mock = MockChecker::new().shared();
    let scheduler = Scheduler::new(mock.clone(), fast_config()).unwrap();

    let events = drain(scheduler.start(vec![])).await;

    assert_eq!(events.len(), 2);
    let terminal = terminal_snapshot(&events);
    assert_eq!(terminal.completed_count, 0);
    assert!(terminal.results.is_empty());
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_admission_control_caps_in_flight_calls() {
    for limit in [1usize, 3, 7] {
        let mock = MockChecker::new()
            .with_latency(Duration::from_millis(10))
            .shared();
        let config = fast_config()
            .with_batch_size(4)
            .with_concurrency_limit(limit);
        let scheduler = Scheduler::new(mock.clone(), config).unwrap();

        let report = scheduler.start(ids(4 * 25)).collect().await.unwrap();

        assert_eq!(report.results.len(), 100);
        assert_eq!(mock.call_count(), 25);
        assert!(
            mock.peak_concurrency() <= limit,
            "peak {} exceeded limit {}",
            mock.peak_concurrency(),
            limit
        );
        assert!(mock.peak_concurrency() >= 1);
    }
}

#[tokio::test]
async fn test_groups_dispatched_in_partition_order() {
    let mock = MockChecker::new().shared();
    let config = fast_config().with_batch_size(2).with_concurrency_limit(1);
    let scheduler = Scheduler::new(mock.clone(), config).unwrap();

    scheduler.start(ids(5)).collect().await.unwrap();

    let calls = mock.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], vec!["id0".to_string(), "id1".to_string()]);
    assert_eq!(calls[1], vec!["id2".to_string(), "id3".to_string()]);
    assert_eq!(calls[2], vec!["id4".to_string()]);
}

#[tokio::test]
async fn test_progress_is_monotonic_and_reaches_total() {
    let mock = MockChecker::new()
        .with_latency(Duration::from_millis(15))
        .shared();
    let config = fast_config().with_batch_size(3).with_concurrency_limit(2);
    let scheduler = Scheduler::new(mock, config).unwrap();

    let events = drain(scheduler.start(ids(30))).await;
    let counts = progress_counts(&events);

    assert!(counts.len() >= 2, "expected periodic snapshots, got {counts:?}");
    assert!(counts.windows(2).all(|w| w[0] <= w[1]), "not monotonic: {counts:?}");
    assert_eq!(*counts.last().unwrap(), 30);

    for event in &events {
        if let RunEvent::Progress(p) = event {
            assert_eq!(p.results.len(), p.completed_count);
        }
    }
}

#[tokio::test]
async fn test_results_follow_completion_order() {
    let mock = MockChecker::new()
        .with_latency_for("slow", Duration::from_millis(80))
        .shared();
    let config = fast_config().with_batch_size(1).with_concurrency_limit(2);
    let scheduler = Scheduler::new(mock, config).unwrap();

    let report = scheduler
        .start(vec!["slow".into(), "fast".into()])
        .collect()
        .await
        .unwrap();

    assert_eq!(report.results[0].id, "fast");
    assert_eq!(report.results[1].id, "slow");
}

#[tokio::test]
async fn test_duplicates_are_checked_independently() {
    let mock = MockChecker::new().with_live("A", "x").shared();
    let scheduler = Scheduler::new(mock, fast_config().with_batch_size(1)).unwrap();

    let report = scheduler
        .start(vec!["A".into(), "A".into(), "B".into()])
        .collect()
        .await
        .unwrap();

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.results.iter().filter(|r| r.id == "A").count(), 2);
    assert_eq!(report.summary.live, 2);
}

#[tokio::test]
async fn test_hung_call_times_out_and_frees_slot() {
    let mock = MockChecker::new().with_hang("id0").shared();
    let config = fast_config()
        .with_batch_size(2)
        .with_concurrency_limit(1)
        .with_call_timeout(Duration::from_millis(30));
    let scheduler = Scheduler::new(mock.clone(), config).unwrap();

    let report = scheduler.start(ids(5)).collect().await.unwrap();

    assert_eq!(report.results.len(), 6);
    assert_eq!(mock.call_count(), 3);
    let timed_out: Vec<&CheckResult> = report
        .results
        .iter()
        .filter(|r| r.reason.as_deref().is_some_and(|s| s.contains("timed out")))
        .collect();
    assert_eq!(timed_out.len(), 2);
    assert!(timed_out.iter().any(|r| r.id == "id0"));
    assert_eq!(mock.in_flight(), 0);
}

#[tokio::test]
async fn test_panicking_group_degrades_and_run_continues() {
    let mock = MockChecker::new()
        .with_panic("id2")
        .with_live("id0", "x")
        .shared();
    let scheduler = Scheduler::new(mock, fast_config().with_batch_size(2)).unwrap();

    let report = scheduler.start(ids(5)).collect().await.unwrap();

    assert_eq!(report.results.len(), 6);
    assert_eq!(report.summary.live, 1);
    let failed: Vec<_> = report
        .results
        .iter()
        .filter(|r| {
            r.reason
                .as_deref()
                .is_some_and(|s| s.starts_with("check task failed"))
        })
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(failed.len(), 2);
    assert!(failed.contains(&"id2") && failed.contains(&"id3"));
}

#[tokio::test]
async fn test_cancel_stops_dispatch_and_still_completes() {
    let mock = MockChecker::new()
        .with_latency(Duration::from_millis(40))
        .shared();
    let config = fast_config().with_batch_size(1).with_concurrency_limit(1);
    let scheduler = Scheduler::new(mock.clone(), config).unwrap();

    let run = scheduler.start(ids(20));
    let token = run.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        token.cancel();
    });

    let report = run.collect().await.unwrap();

    assert!(report.summary.cancelled);
    assert_eq!(report.results.len(), 20);
    assert!(mock.call_count() < 20);
    let cancelled = report
        .results
        .iter()
        .filter(|r| r.reason.as_deref() == Some("operation cancelled"))
        .count();
    assert!(cancelled >= 20 - mock.call_count());
    assert_eq!(report.summary.unverified, cancelled);
}

#[tokio::test]
async fn test_cancel_before_start_checks_nothing() {
    let mock = MockChecker::new().shared();
    let scheduler = Scheduler::new(mock.clone(), fast_config()).unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = scheduler.run(&ids(120), tx, cancel).await;

    assert!(summary.cancelled);
    assert_eq!(summary.total, 120);
    assert_eq!(summary.unverified, 120);
    assert_eq!(mock.call_count(), 0);

    let mut saw_completed = false;
    while let Some(event) = rx.recv().await {
        saw_completed |= event.is_completed();
    }
    assert!(saw_completed);
}

#[tokio::test]
async fn test_run_finishes_when_receiver_dropped() {
    let mock = MockChecker::new().with_live("id3", "x").shared();
    let scheduler = Scheduler::new(mock, fast_config().with_batch_size(2)).unwrap();

    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let summary = scheduler
        .run(&ids(9), tx, CancellationToken::new())
        .await;

    assert_eq!(summary.total, 9);
    assert_eq!(summary.live, 1);
    assert!(!summary.cancelled);
}

/// Answers with nothing at all, regardless of group size.
struct SilentChecker;

#[async_trait]
impl GroupChecker for SilentChecker {
    async fn check_group(&self, _group: &Group) -> Vec<CheckResult> {
        Vec::new()
    }
}

#[tokio::test]
async fn test_short_answers_are_padded_to_one_result_per_identifier() {
    let scheduler = Scheduler::new(Arc::new(SilentChecker), fast_config().with_batch_size(3)).unwrap();

    let report = scheduler.start(ids(7)).collect().await.unwrap();

    assert_eq!(report.results.len(), 7);
    assert!(report.results.iter().all(|r| r.is_unverified()));
    let seen: HashSet<_> = report.results.iter().map(|r| r.id.clone()).collect();
    assert_eq!(seen, ids(7).into_iter().collect());
}

#[tokio::test]
async fn test_scheduler_accepts_trait_objects() {
    let checker: Arc<dyn GroupChecker> = Arc::new(MockChecker::new().with_live("id0", "x"));
    let scheduler = Scheduler::new(checker, fast_config()).unwrap();

    let report = scheduler.start(ids(2)).collect().await.unwrap();

    assert_eq!(report.summary.live, 1);
    assert_eq!(report.summary.dead, 1);
}
