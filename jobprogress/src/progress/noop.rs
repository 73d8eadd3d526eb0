//! A reporter that discards everything.

use super::JobProgress;
use crate::errors::JobError;

/// A progress reporter that ignores all callbacks.
///
/// Used when job logic runs outside a scheduled job, e.g. from a request
/// handler. Cancellation is never requested.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopJobProgress;

impl JobProgress for NoopJobProgress {
    fn is_cancellation_requested(&self) -> bool {
        false
    }

    fn completed_stage(&self, _summary: Option<&str>) {}

    fn failed_stage(&self, _error: &JobError) {}

    fn starting_work_item(&self, _description: &str) {}

    fn completed_work_item(&self, _summary: Option<&str>) {}

    fn failed_work_item(&self, _error: &JobError) {}
}
