//! Core stage types.

mod policy;
mod stage;
mod status;

pub use policy::FailurePolicy;
pub use stage::{Stage, StageCounters};
pub use status::{ProgressStatus, StageStatus};
