//! A reporter that turns callbacks into tracing events.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, error, info, trace, warn, Level};

use super::JobProgress;
use crate::cancellation::CancellationToken;
use crate::core::FailurePolicy;
use crate::errors::JobError;
use crate::observability::SpanTimer;

/// A progress reporter that logs every callback through `tracing`.
///
/// Normal lifecycle events are logged at the configured level, item failures
/// at `warn` and stage or process failures at `error`.
#[derive(Debug)]
pub struct LoggingJobProgress {
    level: Level,
    token: Arc<CancellationToken>,
    process: Mutex<Option<SpanTimer>>,
    stage: Mutex<Option<SpanTimer>>,
    items: Mutex<HashMap<ThreadId, SpanTimer>>,
}

impl Default for LoggingJobProgress {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}

impl LoggingJobProgress {
    /// Creates a logging reporter with its own cancellation token.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self::with_token(level, Arc::new(CancellationToken::new()))
    }

    /// Creates a logging reporter that polls a shared token.
    #[must_use]
    pub fn with_token(level: Level, token: Arc<CancellationToken>) -> Self {
        Self {
            level,
            token,
            process: Mutex::new(None),
            stage: Mutex::new(None),
            items: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a debug-level logging reporter.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// The token this reporter polls.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Requests cancellation of the running job.
    pub fn request_cancellation(&self, reason: impl Into<String>) {
        self.token.cancel(reason);
    }

    fn log_event(&self, event: &str, subject: Option<&str>, detail: Option<&str>, elapsed_ms: Option<f64>) {
        match self.level {
            Level::TRACE => trace!(event, subject, detail, elapsed_ms, "Job progress: {}", event),
            Level::DEBUG => debug!(event, subject, detail, elapsed_ms, "Job progress: {}", event),
            Level::INFO => info!(event, subject, detail, elapsed_ms, "Job progress: {}", event),
            Level::WARN => warn!(event, subject, detail, elapsed_ms, "Job progress: {}", event),
            _ => error!(event, subject, detail, elapsed_ms, "Job progress: {}", event),
        }
    }

    fn finish_item(&self) -> Option<(String, f64)> {
        self.items
            .lock()
            .remove(&thread::current().id())
            .map(finish)
    }
}

/// Stops a timer, keeping the description it was started with.
fn finish(timer: SpanTimer) -> (String, f64) {
    let name = timer.name().to_string();
    (name, timer.finish())
}

impl JobProgress for LoggingJobProgress {
    fn is_cancellation_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    fn cancellation_reason(&self) -> Option<String> {
        self.token.reason()
    }

    fn starting_process(&self, description: &str) {
        *self.process.lock() = Some(SpanTimer::start(description));
        self.log_event("process.started", Some(description), None, None);
    }

    fn completed_process(&self, summary: Option<&str>) {
        let (process, elapsed_ms) = self.process.lock().take().map(finish).unzip();
        self.log_event("process.completed", process.as_deref(), summary, elapsed_ms);
    }

    fn failed_process(&self, error: &JobError) {
        let (process, elapsed_ms) = self.process.lock().take().map(finish).unzip();
        error!(
            error = %error,
            subject = process.as_deref(),
            elapsed_ms,
            "Job progress: process.failed"
        );
    }

    fn starting_stage(&self, description: &str, work_items: Option<usize>, policy: FailurePolicy) {
        *self.stage.lock() = Some(SpanTimer::start(description));
        self.log_event("stage.started", Some(description), None, None);
        debug!(work_items, policy = %policy, "Stage parameters");
    }

    fn completed_stage(&self, summary: Option<&str>) {
        let (stage, elapsed_ms) = self.stage.lock().take().map(finish).unzip();
        self.log_event("stage.completed", stage.as_deref(), summary, elapsed_ms);
    }

    fn failed_stage(&self, error: &JobError) {
        let (stage, elapsed_ms) = self.stage.lock().take().map(finish).unzip();
        error!(
            error = %error,
            kind = error.kind(),
            subject = stage.as_deref(),
            elapsed_ms,
            "Job progress: stage.failed"
        );
    }

    fn starting_work_item(&self, description: &str) {
        self.items
            .lock()
            .insert(thread::current().id(), SpanTimer::start(description));
        self.log_event("item.started", Some(description), None, None);
    }

    fn completed_work_item(&self, summary: Option<&str>) {
        let (item, elapsed_ms) = self.finish_item().unzip();
        self.log_event("item.completed", item.as_deref(), summary, elapsed_ms);
    }

    fn failed_work_item(&self, error: &JobError) {
        let (item, elapsed_ms) = self.finish_item().unzip();
        warn!(
            error = %error,
            kind = error.kind(),
            subject = item.as_deref(),
            elapsed_ms,
            "Job progress: item.failed"
        );
    }
}
