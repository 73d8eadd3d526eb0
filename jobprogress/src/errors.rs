//! Error types for staged job execution.
//!
//! Work functions report failure through [`anyhow::Error`]; everything the
//! runner hands to a [`JobProgress`](crate::progress::JobProgress) callback is
//! a [`JobError`].

use std::any::Any;
use thiserror::Error;

/// An error delivered to the failure callbacks of a progress reporter.
#[derive(Debug, Error)]
pub enum JobError {
    /// Cancellation was requested before or during the stage.
    #[error("Job cancelled: {0}")]
    Cancelled(String),

    /// A plain failure message.
    #[error("{0}")]
    Failed(String),

    /// A work function or stage action panicked.
    #[error("Work panicked: {0}")]
    Panicked(String),

    /// The error returned by a work function or stage action.
    #[error(transparent)]
    Work(#[from] anyhow::Error),

    /// The worker pool for a parallel stage could not be created.
    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

impl JobError {
    /// Creates a cancellation error with the given reason.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled(reason.into())
    }

    /// Creates a plain failure from a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Converts a caught panic payload into an error.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self::Panicked(message)
    }

    /// Returns true if this error signals cancellation.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Short name of the error kind, used in recorded progress.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cancelled(_) => "cancelled",
            Self::Failed(_) => "failed",
            Self::Panicked(_) => "panicked",
            Self::Work(_) => "work",
            Self::Pool(_) => "pool",
        }
    }
}

/// Errors raised while loading configuration or installing logging.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured log level is not a tracing level name.
    #[error("Invalid log level '{0}', expected one of trace, debug, info, warn, error")]
    Level(String),

    /// The log filter directive is malformed.
    #[error("Invalid log filter '{filter}': {message}")]
    Filter {
        /// The rejected directive.
        filter: String,
        /// Parser message.
        message: String,
    },

    /// A global tracing subscriber could not be installed.
    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(String),
}
