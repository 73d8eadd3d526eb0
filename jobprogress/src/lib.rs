//! # Jobprogress
//!
//! Staged execution and progress reporting for long-running background jobs.
//!
//! A job scheduler supplies a [`JobProgress`](progress::JobProgress) reporter;
//! job code drives its work through the [`StageRunner`](runner::StageRunner)
//! methods available on every reporter:
//!
//! - **Stage-by-stage observability**: every stage ends in exactly one
//!   `completed_stage` or `failed_stage` callback, every item in one
//!   `completed_work_item` or `failed_work_item`
//! - **Item isolation**: a failing (or panicking) item is reported and counted
//!   without aborting the rest of the stage
//! - **Bounded parallelism**: parallel stages run on a fixed-size worker pool
//!   and block the caller until all items were attempted
//! - **Cooperative cancellation**: polled between items, never interrupting
//!   running work
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use jobprogress::prelude::*;
//!
//! let progress = RecordingJobProgress::new(ProgressConfig::default());
//!
//! progress.starting_stage("Fetching scheduled templates", None, FailurePolicy::Fail);
//! let templates = progress.run_stage_or(Vec::new(), || store.scheduled_templates());
//!
//! progress.starting_stage("Processing templates", Some(templates.len()), FailurePolicy::SkipItem);
//! progress.run_stage_with_summary(
//!     templates,
//!     |t| format!("Processing template {}", t.name),
//!     |t| send_all(t),
//!     |ok, failed| format!("Sent {ok} templates, {failed} failed"),
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod observability;
pub mod progress;
pub mod runner;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{LoggingConfig, ProgressConfig};
    pub use crate::core::{FailurePolicy, ProgressStatus, StageStatus};
    pub use crate::errors::{ConfigError, JobError};
    pub use crate::observability::init_tracing;
    pub use crate::progress::{
        JobProgress, LoggingJobProgress, NoopJobProgress, ProgressSnapshot, RecordingJobProgress,
    };
    pub use crate::runner::StageRunner;
}
