//! Failure policies for stages and work items.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What a reporter should do when a work item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Inherit the policy of the enclosing stage or job.
    #[default]
    Parent,
    /// Abort the job.
    Fail,
    /// Skip the remaining items of the current stage.
    SkipStage,
    /// Skip the failed item and continue.
    SkipItem,
    /// Skip the failed item only if an earlier item of the stage succeeded.
    SkipItemOutlier,
}

impl FailurePolicy {
    /// Resolves `Parent` against the enclosing policy.
    #[must_use]
    pub fn or(self, parent: Self) -> Self {
        match self {
            Self::Parent => parent,
            other => other,
        }
    }

    /// Resolves an item failure, given how many items of the stage succeeded.
    ///
    /// `SkipItemOutlier` becomes `Fail` when no item succeeded yet and
    /// `SkipItem` otherwise. `Parent` should be resolved beforehand.
    #[must_use]
    pub fn for_failed_item(self, succeeded: usize) -> Self {
        match self {
            Self::SkipItemOutlier if succeeded == 0 => Self::Fail,
            Self::SkipItemOutlier => Self::SkipItem,
            other => other,
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => write!(f, "parent"),
            Self::Fail => write!(f, "fail"),
            Self::SkipStage => write!(f, "skip_stage"),
            Self::SkipItem => write!(f, "skip_item"),
            Self::SkipItemOutlier => write!(f, "skip_item_outlier"),
        }
    }
}
