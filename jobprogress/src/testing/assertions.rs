//! Assertions over recorded progress calls.

use super::{ProgressCall, SpyJobProgress};

/// Asserts the number of item start, completion and failure callbacks.
pub fn assert_item_calls(spy: &SpyJobProgress, started: usize, completed: usize, failed: usize) {
    let actual = (
        spy.count(|c| matches!(c, ProgressCall::StartingWorkItem(_))),
        spy.count(|c| matches!(c, ProgressCall::CompletedWorkItem(_))),
        spy.count(|c| matches!(c, ProgressCall::FailedWorkItem(_))),
    );
    assert_eq!(
        actual,
        (started, completed, failed),
        "Expected (started, completed, failed) item calls {:?}, got {:?}",
        (started, completed, failed),
        actual
    );
}

/// Asserts that the stage completed exactly once with `summary` and never failed.
pub fn assert_stage_completed(spy: &SpyJobProgress, summary: Option<&str>) {
    assert_eq!(
        spy.completed_stages(),
        vec![summary.map(str::to_string)],
        "Expected a single completed_stage call"
    );
    assert!(
        spy.failed_stages().is_empty(),
        "Expected no failed_stage call, got {:?}",
        spy.failed_stages()
    );
}

/// Asserts that the stage failed exactly once and never completed.
pub fn assert_stage_failed(spy: &SpyJobProgress) {
    assert_eq!(
        spy.failed_stages().len(),
        1,
        "Expected a single failed_stage call, got {:?}",
        spy.failed_stages()
    );
    assert!(
        spy.completed_stages().is_empty(),
        "Expected no completed_stage call, got {:?}",
        spy.completed_stages()
    );
}

/// Asserts that the stage failed exactly once, with a cancellation error.
pub fn assert_stage_cancelled(spy: &SpyJobProgress) {
    assert_stage_failed(spy);
    let failed = spy.failed_stages();
    let (error, cancelled) = &failed[0];
    assert!(*cancelled, "Expected a cancellation error, got '{error}'");
}
