//! A reporter that records every callback for later inspection.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::core::FailurePolicy;
use crate::errors::JobError;
use crate::progress::JobProgress;

/// One recorded callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressCall {
    /// `starting_process(description)`.
    StartingProcess(String),
    /// `completed_process(summary)`.
    CompletedProcess(Option<String>),
    /// `failed_process(error)`.
    FailedProcess(String),
    /// `starting_stage(description, ..)`.
    StartingStage(String),
    /// `completed_stage(summary)`.
    CompletedStage(Option<String>),
    /// `failed_stage(error)`.
    FailedStage {
        /// Error text.
        error: String,
        /// Whether the error signalled cancellation.
        cancelled: bool,
    },
    /// `starting_work_item(description)`.
    StartingWorkItem(String),
    /// `completed_work_item(summary)`.
    CompletedWorkItem(Option<String>),
    /// `failed_work_item(error)`.
    FailedWorkItem(String),
}

/// A test double for [`JobProgress`] that records calls in order.
///
/// Cancellation can be requested up front, at any time through
/// [`SpyJobProgress::cancel`], or automatically from inside the n-th
/// `failed_work_item` callback.
#[derive(Debug, Default)]
pub struct SpyJobProgress {
    calls: Mutex<Vec<ProgressCall>>,
    cancelled: AtomicBool,
    cancel_after_failures: Option<usize>,
    failures: AtomicUsize,
}

impl SpyJobProgress {
    /// Creates a spy that never cancels on its own.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a spy whose cancellation is already requested.
    #[must_use]
    pub fn cancelled() -> Self {
        let spy = Self::default();
        spy.cancel();
        spy
    }

    /// Creates a spy that requests cancellation inside its `n`-th
    /// `failed_work_item` callback.
    #[must_use]
    pub fn cancel_on_failure(n: usize) -> Self {
        Self {
            cancel_after_failures: Some(n),
            ..Self::default()
        }
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// All calls in the order they were received.
    #[must_use]
    pub fn calls(&self) -> Vec<ProgressCall> {
        self.calls.lock().clone()
    }

    /// Number of calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&ProgressCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    /// Descriptions passed to `starting_work_item`, in call order.
    #[must_use]
    pub fn started_items(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ProgressCall::StartingWorkItem(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    /// Summaries passed to `completed_stage`, in call order.
    #[must_use]
    pub fn completed_stages(&self) -> Vec<Option<String>> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ProgressCall::CompletedStage(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    /// `(error, cancelled)` pairs passed to `failed_stage`, in call order.
    #[must_use]
    pub fn failed_stages(&self) -> Vec<(String, bool)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ProgressCall::FailedStage { error, cancelled } => Some((error.clone(), *cancelled)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ProgressCall) {
        self.calls.lock().push(call);
    }
}

impl JobProgress for SpyJobProgress {
    fn is_cancellation_requested(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn starting_process(&self, description: &str) {
        self.record(ProgressCall::StartingProcess(description.to_string()));
    }

    fn completed_process(&self, summary: Option<&str>) {
        self.record(ProgressCall::CompletedProcess(summary.map(str::to_string)));
    }

    fn failed_process(&self, error: &JobError) {
        self.record(ProgressCall::FailedProcess(error.to_string()));
    }

    fn starting_stage(&self, description: &str, _work_items: Option<usize>, _policy: FailurePolicy) {
        self.record(ProgressCall::StartingStage(description.to_string()));
    }

    fn completed_stage(&self, summary: Option<&str>) {
        self.record(ProgressCall::CompletedStage(summary.map(str::to_string)));
    }

    fn failed_stage(&self, error: &JobError) {
        self.record(ProgressCall::FailedStage {
            error: error.to_string(),
            cancelled: error.is_cancellation(),
        });
    }

    fn starting_work_item(&self, description: &str) {
        self.record(ProgressCall::StartingWorkItem(description.to_string()));
    }

    fn completed_work_item(&self, summary: Option<&str>) {
        self.record(ProgressCall::CompletedWorkItem(summary.map(str::to_string)));
    }

    fn failed_work_item(&self, error: &JobError) {
        self.record(ProgressCall::FailedWorkItem(error.to_string()));
        let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
        if self.cancel_after_failures == Some(failures) {
            self.cancel();
        }
    }
}
