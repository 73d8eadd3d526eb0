//! Stage and progress status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a single stage run.
///
/// `NotStarted -> Running -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The stage has not begun.
    #[default]
    NotStarted,
    /// Items or the stage action are executing.
    Running,
    /// The stage finished; individual items may still have failed.
    Completed,
    /// The stage aborted.
    Failed,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this state.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

/// Status of a recorded process, stage or item node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Started and not yet finished.
    #[default]
    Running,
    /// Finished normally.
    Success,
    /// Finished with an error.
    Error,
    /// Finished because cancellation was requested.
    Cancelled,
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl ProgressStatus {
    /// Returns true once the node has finished.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status_transitions() {
        assert!(StageStatus::NotStarted.can_transition_to(StageStatus::Running));
        assert!(StageStatus::Running.can_transition_to(StageStatus::Completed));
        assert!(StageStatus::Running.can_transition_to(StageStatus::Failed));
        assert!(!StageStatus::NotStarted.can_transition_to(StageStatus::Completed));
        assert!(!StageStatus::Completed.can_transition_to(StageStatus::Failed));
        assert!(!StageStatus::Failed.can_transition_to(StageStatus::Running));
    }

    #[test]
    fn test_stage_status_is_terminal() {
        assert!(StageStatus::Completed.is_terminal());
        assert!(StageStatus::Failed.is_terminal());
        assert!(!StageStatus::Running.is_terminal());
        assert!(!StageStatus::NotStarted.is_terminal());
    }

    #[test]
    fn test_progress_status_serialize() {
        let json = serde_json::to_string(&ProgressStatus::Cancelled).unwrap();
        assert_eq!(json, r#""cancelled""#);

        let status: ProgressStatus = serde_json::from_str(r#""success""#).unwrap();
        assert_eq!(status, ProgressStatus::Success);
        assert!(status.is_complete());
        assert!(!ProgressStatus::Running.is_complete());
    }

    #[test]
    fn test_display() {
        assert_eq!(StageStatus::NotStarted.to_string(), "not_started");
        assert_eq!(ProgressStatus::Error.to_string(), "error");
    }
}
