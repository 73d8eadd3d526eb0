//! Sequential item stages.

use tracing::debug;

use super::{abort, guarded};
use crate::core::Stage;
use crate::progress::JobProgress;

/// Drives one item stage on the calling thread.
///
/// `item_summary` renders a successful item's result for
/// `completed_work_item`; `summarize` renders the stage summary from the
/// success and failure counts.
pub(super) fn run_items<P, I, R, D, W, S, F>(
    progress: &P,
    items: I,
    mut describe: D,
    mut work: W,
    mut item_summary: S,
    summarize: F,
) -> bool
where
    P: JobProgress + ?Sized,
    I: IntoIterator,
    D: FnMut(&I::Item) -> String,
    W: FnMut(I::Item) -> anyhow::Result<R>,
    S: FnMut(&R) -> Option<String>,
    F: FnOnce(usize, usize) -> Option<String>,
{
    let mut stage = Stage::new();
    stage.start();

    if progress.is_cancellation_requested() {
        return abort(progress, &mut stage);
    }

    for item in items {
        if progress.is_cancellation_requested() {
            return abort(progress, &mut stage);
        }
        if progress.is_skip_current_stage() {
            stage.counters().record_skip();
            debug!(
                succeeded = stage.counters().succeeded(),
                failed = stage.counters().failed(),
                "Skipping rest of stage"
            );
            break;
        }

        progress.starting_work_item(&describe(&item));
        match guarded(|| work(item)) {
            Ok(result) => {
                stage.counters().record_success();
                progress.completed_work_item(item_summary(&result).as_deref());
            }
            Err(error) => {
                stage.counters().record_failure();
                progress.failed_work_item(&error);
            }
        }
    }

    let summary = summarize(stage.counters().succeeded(), stage.counters().failed());
    progress.completed_stage(summary.as_deref());
    stage.complete();
    stage.is_clean()
}
