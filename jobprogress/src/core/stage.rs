//! Per-call stage state: counters and the status state machine.

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use super::StageStatus;

/// Success, failure and skip counts of one stage.
///
/// All updates are atomic so worker threads of a parallel stage can record
/// outcomes concurrently.
#[derive(Debug, Default)]
pub struct StageCounters {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

impl StageCounters {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful item.
    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
    }

    /// Records a failed item.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Records an item that was never started.
    pub fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of successful items.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.succeeded.load(Ordering::SeqCst)
    }

    /// Number of failed items.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Number of items that were never started.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Number of items that were started.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded() + self.failed()
    }
}

/// One stage run, alive for the duration of a single `run_stage*` call.
#[derive(Debug, Default)]
pub struct Stage {
    status: StageStatus,
    counters: StageCounters,
}

impl Stage {
    /// Creates a stage in the `NotStarted` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        self.status
    }

    /// The stage's item counters.
    #[must_use]
    pub fn counters(&self) -> &StageCounters {
        &self.counters
    }

    /// Moves to `Running`.
    pub fn start(&mut self) {
        self.transition(StageStatus::Running);
    }

    /// Moves to `Completed`.
    pub fn complete(&mut self) {
        self.transition(StageStatus::Completed);
    }

    /// Moves to `Failed`.
    pub fn fail(&mut self) {
        self.transition(StageStatus::Failed);
    }

    /// True if the stage completed and no item failed or was skipped.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.status == StageStatus::Completed
            && self.counters.failed() == 0
            && self.counters.skipped() == 0
    }

    fn transition(&mut self, next: StageStatus) {
        debug_assert!(
            self.status.can_transition_to(next),
            "illegal stage transition {} -> {}",
            self.status,
            next
        );
        debug!(from = %self.status, to = %next, "Stage transition");
        self.status = next;
    }
}
