//! Testing utilities for code that reports job progress.
//!
//! This module provides:
//! - A spy reporter that records every callback
//! - Assertions over the recorded calls

mod assertions;
mod spy;

pub use assertions::{
    assert_item_calls, assert_stage_cancelled, assert_stage_completed, assert_stage_failed,
};
pub use spy::{ProgressCall, SpyJobProgress};
