//! A reporter that records a process/stage/item tree in memory.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{JobProgress, LoggingJobProgress};
use crate::cancellation::CancellationToken;
use crate::config::ProgressConfig;
use crate::core::{FailurePolicy, ProgressStatus};
use crate::errors::JobError;

/// A recorded work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Item description.
    pub description: String,
    /// Item status.
    pub status: ProgressStatus,
    /// When the item started.
    pub started_at: DateTime<Utc>,
    /// When the item finished.
    pub completed_at: Option<DateTime<Utc>>,
    /// Summary reported on success.
    pub summary: Option<String>,
    /// Error text reported on failure.
    pub error: Option<String>,
}

/// A recorded stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage description.
    pub description: String,
    /// Announced number of work items, if known.
    pub work_items: Option<usize>,
    /// Failure policy announced for the stage.
    pub policy: FailurePolicy,
    /// Stage status.
    pub status: ProgressStatus,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage finished.
    pub completed_at: Option<DateTime<Utc>>,
    /// Summary reported on completion.
    pub summary: Option<String>,
    /// Error text reported on failure.
    pub error: Option<String>,
    /// Number of items that succeeded.
    pub succeeded: usize,
    /// Number of items that failed.
    pub failed: usize,
    /// Recorded items, capped by `max_recorded_items`.
    pub items: Vec<ItemRecord>,
    /// Items counted but not kept because of the cap.
    pub dropped_items: usize,
}

/// A recorded job run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    /// Unique id of this run.
    pub id: Uuid,
    /// Process description.
    pub description: String,
    /// Process status.
    pub status: ProgressStatus,
    /// When the process started.
    pub started_at: DateTime<Utc>,
    /// When the process finished.
    pub completed_at: Option<DateTime<Utc>>,
    /// Summary reported on completion.
    pub summary: Option<String>,
    /// Error text reported on failure.
    pub error: Option<String>,
    /// Stages in the order they started.
    pub stages: Vec<StageRecord>,
}

/// A point-in-time copy of everything a [`RecordingJobProgress`] has seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    /// Recorded processes.
    pub processes: Vec<ProcessRecord>,
    /// Whether cancellation has been requested.
    pub cancellation_requested: bool,
    /// Reason given for cancellation.
    pub cancellation_reason: Option<String>,
    /// Successful items across all stages.
    pub total_succeeded: usize,
    /// Failed items across all stages.
    pub total_failed: usize,
}

impl StageRecord {
    fn new(description: &str, work_items: Option<usize>, policy: FailurePolicy) -> Self {
        Self {
            description: description.to_string(),
            work_items,
            policy,
            status: ProgressStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            summary: None,
            error: None,
            succeeded: 0,
            failed: 0,
            items: Vec::new(),
            dropped_items: 0,
        }
    }

    fn finish(&mut self, status: ProgressStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }
}

impl ProcessRecord {
    fn new(description: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.to_string(),
            status: ProgressStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            summary: None,
            error: None,
            stages: Vec::new(),
        }
    }

    fn finish(&mut self, status: ProgressStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }
}

impl ItemRecord {
    fn finish(&mut self, status: ProgressStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }
}

fn status_for(error: &JobError) -> ProgressStatus {
    if error.is_cancellation() {
        ProgressStatus::Cancelled
    } else {
        ProgressStatus::Error
    }
}

#[derive(Debug, Default)]
struct State {
    processes: Vec<ProcessRecord>,
    /// Index of the recorded in-flight item per worker thread.
    in_flight: HashMap<ThreadId, usize>,
    total_succeeded: usize,
    total_failed: usize,
}

impl State {
    fn process(&mut self) -> &mut ProcessRecord {
        let open = self
            .processes
            .last()
            .is_some_and(|p| !p.status.is_complete());
        if !open {
            self.processes.push(ProcessRecord::new(""));
        }
        let last = self.processes.len() - 1;
        &mut self.processes[last]
    }

    fn stage(&mut self) -> &mut StageRecord {
        let process = self.process();
        let open = process
            .stages
            .last()
            .is_some_and(|s| !s.status.is_complete());
        if !open {
            process
                .stages
                .push(StageRecord::new("", None, FailurePolicy::Parent));
        }
        let last = process.stages.len() - 1;
        &mut process.stages[last]
    }

    fn take_item(&mut self) -> Option<&mut ItemRecord> {
        let index = self.in_flight.remove(&thread::current().id())?;
        self.stage().items.get_mut(index)
    }
}

/// What a failure callback decided, applied after the state lock is released.
enum FailureAction {
    None,
    SkipStage,
    Abort(String),
}

/// A progress reporter that keeps the full process/stage/item tree.
///
/// Failure policies are interpreted here: an item failure under
/// [`FailurePolicy::Fail`] requests cancellation (when `abort_on_failure` is
/// set), and [`FailurePolicy::SkipStage`] asks the runner to skip the rest of
/// the stage.
#[derive(Debug)]
pub struct RecordingJobProgress {
    config: ProgressConfig,
    token: Arc<CancellationToken>,
    skip_stage: AtomicBool,
    state: Mutex<State>,
    logger: Option<LoggingJobProgress>,
}

impl Default for RecordingJobProgress {
    fn default() -> Self {
        Self::new(ProgressConfig::default())
    }
}

impl RecordingJobProgress {
    /// Creates a recording reporter with its own cancellation token.
    #[must_use]
    pub fn new(config: ProgressConfig) -> Self {
        Self::with_token(config, Arc::new(CancellationToken::new()))
    }

    /// Creates a recording reporter that polls a shared token.
    #[must_use]
    pub fn with_token(config: ProgressConfig, token: Arc<CancellationToken>) -> Self {
        let logger = config
            .log_events
            .then(|| LoggingJobProgress::with_token(config.level(), token.clone()));
        Self {
            config,
            token,
            skip_stage: AtomicBool::new(false),
            state: Mutex::new(State::default()),
            logger,
        }
    }

    /// The token this reporter polls.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Requests cancellation; running items finish, no new ones start.
    pub fn request_cancellation(&self, reason: impl Into<String>) {
        self.token.cancel(reason);
    }

    /// Returns a copy of everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock();
        ProgressSnapshot {
            processes: state.processes.clone(),
            cancellation_requested: self.token.is_cancelled(),
            cancellation_reason: self.token.reason(),
            total_succeeded: state.total_succeeded,
            total_failed: state.total_failed,
        }
    }

    /// Serializes the current snapshot as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }

    /// The most recently started stage, if any.
    #[must_use]
    pub fn last_stage(&self) -> Option<StageRecord> {
        let state = self.state.lock();
        state.processes.last()?.stages.last().cloned()
    }

    /// Successful items across all stages.
    #[must_use]
    pub fn total_succeeded(&self) -> usize {
        self.state.lock().total_succeeded
    }

    /// Failed items across all stages.
    #[must_use]
    pub fn total_failed(&self) -> usize {
        self.state.lock().total_failed
    }

    fn apply(&self, action: FailureAction) {
        match action {
            FailureAction::None => {}
            FailureAction::SkipStage => {
                debug!("Skipping remaining items of the current stage");
                self.skip_stage.store(true, Ordering::SeqCst);
            }
            FailureAction::Abort(reason) => {
                warn!(reason = %reason, "Aborting job after failure");
                self.token.cancel(reason);
            }
        }
    }
}

impl JobProgress for RecordingJobProgress {
    fn is_cancellation_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    fn cancellation_reason(&self) -> Option<String> {
        self.token.reason()
    }

    fn is_skip_current_stage(&self) -> bool {
        self.skip_stage.load(Ordering::SeqCst) || self.token.is_cancelled()
    }

    fn starting_process(&self, description: &str) {
        self.state
            .lock()
            .processes
            .push(ProcessRecord::new(description));
        if let Some(logger) = &self.logger {
            logger.starting_process(description);
        }
    }

    fn completed_process(&self, summary: Option<&str>) {
        {
            let mut state = self.state.lock();
            let process = state.process();
            process.summary = summary.map(str::to_string);
            process.finish(ProgressStatus::Success);
        }
        if let Some(logger) = &self.logger {
            logger.completed_process(summary);
        }
    }

    fn failed_process(&self, error: &JobError) {
        {
            let mut state = self.state.lock();
            let process = state.process();
            process.error = Some(error.to_string());
            process.finish(status_for(error));
        }
        if let Some(logger) = &self.logger {
            logger.failed_process(error);
        }
    }

    fn starting_stage(&self, description: &str, work_items: Option<usize>, policy: FailurePolicy) {
        self.skip_stage.store(false, Ordering::SeqCst);
        {
            let mut state = self.state.lock();
            state.in_flight.clear();
            state
                .process()
                .stages
                .push(StageRecord::new(description, work_items, policy));
        }
        if let Some(logger) = &self.logger {
            logger.starting_stage(description, work_items, policy);
        }
    }

    fn completed_stage(&self, summary: Option<&str>) {
        self.skip_stage.store(false, Ordering::SeqCst);
        {
            let mut state = self.state.lock();
            let stage = state.stage();
            stage.summary = summary.map(str::to_string);
            stage.finish(ProgressStatus::Success);
        }
        if let Some(logger) = &self.logger {
            logger.completed_stage(summary);
        }
    }

    fn failed_stage(&self, error: &JobError) {
        self.skip_stage.store(false, Ordering::SeqCst);
        let action = {
            let mut state = self.state.lock();
            let stage = state.stage();
            stage.error = Some(error.to_string());
            stage.finish(status_for(error));
            let policy = stage.policy.or(self.config.default_policy);
            if policy == FailurePolicy::Fail
                && self.config.abort_on_failure
                && !error.is_cancellation()
            {
                FailureAction::Abort(format!("stage '{}' failed: {error}", stage.description))
            } else {
                FailureAction::None
            }
        };
        if let Some(logger) = &self.logger {
            logger.failed_stage(error);
        }
        self.apply(action);
    }

    fn starting_work_item(&self, description: &str) {
        {
            let mut state = self.state.lock();
            let max = self.config.max_recorded_items;
            let stage = state.stage();
            let recorded = if stage.items.len() < max {
                stage.items.push(ItemRecord {
                    description: description.to_string(),
                    status: ProgressStatus::Running,
                    started_at: Utc::now(),
                    completed_at: None,
                    summary: None,
                    error: None,
                });
                Some(stage.items.len() - 1)
            } else {
                stage.dropped_items += 1;
                None
            };
            if let Some(index) = recorded {
                state.in_flight.insert(thread::current().id(), index);
            }
        }
        if let Some(logger) = &self.logger {
            logger.starting_work_item(description);
        }
    }

    fn completed_work_item(&self, summary: Option<&str>) {
        {
            let mut state = self.state.lock();
            state.total_succeeded += 1;
            if let Some(item) = state.take_item() {
                item.summary = summary.map(str::to_string);
                item.finish(ProgressStatus::Success);
            }
            state.stage().succeeded += 1;
        }
        if let Some(logger) = &self.logger {
            logger.completed_work_item(summary);
        }
    }

    fn failed_work_item(&self, error: &JobError) {
        let action = {
            let mut state = self.state.lock();
            state.total_failed += 1;
            if let Some(item) = state.take_item() {
                item.error = Some(error.to_string());
                item.finish(status_for(error));
            }
            let stage = state.stage();
            stage.failed += 1;
            let policy = stage
                .policy
                .or(self.config.default_policy)
                .for_failed_item(stage.succeeded);
            match policy {
                FailurePolicy::Fail if self.config.abort_on_failure => FailureAction::Abort(
                    format!("item of stage '{}' failed: {error}", stage.description),
                ),
                FailurePolicy::SkipStage => FailureAction::SkipStage,
                _ => FailureAction::None,
            }
        };
        if let Some(logger) = &self.logger {
            logger.failed_work_item(error);
        }
        self.apply(action);
    }
}
