//! Stages made of a single action, without item tracking.

use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};

use super::{abort, cancellation_error, guarded};
use crate::core::Stage;
use crate::errors::JobError;
use crate::progress::JobProgress;

/// Runs `action` as a stage; `None` means the stage failed and was reported.
pub(super) fn run_action<P, V, A>(progress: &P, action: A) -> Option<V>
where
    P: JobProgress + ?Sized,
    A: FnOnce() -> anyhow::Result<V>,
{
    let mut stage = Stage::new();
    stage.start();

    if progress.is_cancellation_requested() {
        abort(progress, &mut stage);
        return None;
    }

    match guarded(action) {
        Ok(value) => {
            progress.completed_stage(None);
            stage.complete();
            Some(value)
        }
        Err(error) => {
            progress.failed_stage(&error);
            stage.fail();
            None
        }
    }
}

/// Runs `action` as a stage, returning its own error after reporting it.
///
/// Cancellation and panics have no `E` of their own and are converted
/// through `E: From<JobError>`.
pub(super) fn run_action_and_rethrow<P, V, E, A>(progress: &P, action: A) -> Result<V, E>
where
    P: JobProgress + ?Sized,
    A: FnOnce() -> Result<V, E>,
    E: From<JobError> + Display,
{
    let mut stage = Stage::new();
    stage.start();

    if progress.is_cancellation_requested() {
        let error = cancellation_error(progress);
        progress.failed_stage(&error);
        stage.fail();
        return Err(E::from(error));
    }

    match panic::catch_unwind(AssertUnwindSafe(action)) {
        Ok(Ok(value)) => {
            progress.completed_stage(None);
            stage.complete();
            Ok(value)
        }
        Ok(Err(error)) => {
            progress.failed_stage(&JobError::failed(error.to_string()));
            stage.fail();
            Err(error)
        }
        Err(payload) => {
            let error = JobError::from_panic(payload.as_ref());
            progress.failed_stage(&error);
            stage.fail();
            Err(E::from(error))
        }
    }
}
