//! The progress reporter interface and its bundled implementations.
//!
//! A job scheduler hands a [`JobProgress`] to job code; the job drives its
//! work through the [`StageRunner`](crate::runner::StageRunner) methods, which
//! translate execution into the callbacks below. Implementations decide how
//! the callbacks surface: discarded, logged, or recorded.

mod logging;
mod noop;
mod recording;

pub use logging::LoggingJobProgress;
pub use noop::NoopJobProgress;
pub use recording::{
    ItemRecord, ProcessRecord, ProgressSnapshot, RecordingJobProgress, StageRecord,
};

use crate::core::FailurePolicy;
use crate::errors::JobError;

/// Receiver of job lifecycle callbacks.
///
/// Callbacks may arrive from several worker threads during a parallel stage,
/// hence the `Send + Sync` bound. Implementations own any counters they keep
/// and the cancellation signal they report.
pub trait JobProgress: Send + Sync {
    /// Non-blocking poll of the cancellation signal.
    fn is_cancellation_requested(&self) -> bool;

    /// Human-readable reason for a requested cancellation.
    fn cancellation_reason(&self) -> Option<String> {
        None
    }

    /// Whether the remaining items of the current stage should be skipped.
    fn is_skip_current_stage(&self) -> bool {
        false
    }

    /// A job begins.
    fn starting_process(&self, _description: &str) {}

    /// The job finished normally.
    fn completed_process(&self, _summary: Option<&str>) {}

    /// The job aborted.
    fn failed_process(&self, _error: &JobError) {}

    /// The next stage is announced, optionally with its item count.
    fn starting_stage(&self, _description: &str, _work_items: Option<usize>, _policy: FailurePolicy) {
    }

    /// The current stage finished normally.
    fn completed_stage(&self, summary: Option<&str>);

    /// The current stage aborted.
    fn failed_stage(&self, error: &JobError);

    /// Fired immediately before a work item begins.
    fn starting_work_item(&self, description: &str);

    /// Fired after a work item finished without error.
    fn completed_work_item(&self, summary: Option<&str>);

    /// Fired after a work item failed.
    fn failed_work_item(&self, error: &JobError);

    /// Plain-message form of [`JobProgress::failed_work_item`].
    fn failed_work_item_message(&self, message: &str) {
        self.failed_work_item(&JobError::failed(message));
    }

    /// Plain-message form of [`JobProgress::failed_stage`].
    fn failed_stage_message(&self, message: &str) {
        self.failed_stage(&JobError::failed(message));
    }
}

impl<P: JobProgress + ?Sized> JobProgress for std::sync::Arc<P> {
    fn is_cancellation_requested(&self) -> bool {
        (**self).is_cancellation_requested()
    }

    fn cancellation_reason(&self) -> Option<String> {
        (**self).cancellation_reason()
    }

    fn is_skip_current_stage(&self) -> bool {
        (**self).is_skip_current_stage()
    }

    fn starting_process(&self, description: &str) {
        (**self).starting_process(description);
    }

    fn completed_process(&self, summary: Option<&str>) {
        (**self).completed_process(summary);
    }

    fn failed_process(&self, error: &JobError) {
        (**self).failed_process(error);
    }

    fn starting_stage(&self, description: &str, work_items: Option<usize>, policy: FailurePolicy) {
        (**self).starting_stage(description, work_items, policy);
    }

    fn completed_stage(&self, summary: Option<&str>) {
        (**self).completed_stage(summary);
    }

    fn failed_stage(&self, error: &JobError) {
        (**self).failed_stage(error);
    }

    fn starting_work_item(&self, description: &str) {
        (**self).starting_work_item(description);
    }

    fn completed_work_item(&self, summary: Option<&str>) {
        (**self).completed_work_item(summary);
    }

    fn failed_work_item(&self, error: &JobError) {
        (**self).failed_work_item(error);
    }
}
