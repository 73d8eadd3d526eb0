//! Parallel item stages on a bounded worker pool.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use rayon::ThreadPoolBuilder;
use tracing::{debug, error, warn};

use super::{abort, guarded};
use crate::core::Stage;
use crate::errors::JobError;
use crate::progress::JobProgress;

/// Drives one item stage on a dedicated pool of `parallelism` threads.
///
/// The caller blocks in [`rayon::ThreadPool::install`] until all items are
/// attempted; work runs only on pool threads, so at most `parallelism` items
/// execute concurrently.
pub(super) fn run_items<P, I, T, D, W>(
    progress: &P,
    parallelism: usize,
    items: I,
    describe: D,
    work: W,
) -> bool
where
    P: JobProgress + ?Sized,
    I: IntoParallelIterator<Item = T> + Send,
    T: Send,
    D: Fn(&T) -> String + Sync,
    W: Fn(T) -> anyhow::Result<()> + Sync,
{
    let mut stage = Stage::new();
    stage.start();

    if progress.is_cancellation_requested() {
        return abort(progress, &mut stage);
    }

    if parallelism == 0 {
        warn!("Parallelism of 0 requested, using a single worker");
    }
    let workers = parallelism.max(1);
    let pool = match ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("jobprogress-worker-{i}"))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            let error = JobError::from(e);
            error!(error = %error, workers, "Could not start stage workers");
            progress.failed_stage(&error);
            stage.fail();
            return false;
        }
    };

    debug!(workers, "Running stage in parallel");
    let counters = stage.counters();
    pool.install(|| {
        items.into_par_iter().for_each(|item| {
            if progress.is_cancellation_requested() || progress.is_skip_current_stage() {
                counters.record_skip();
                return;
            }
            progress.starting_work_item(&describe(&item));
            match guarded(|| work(item)) {
                Ok(()) => {
                    counters.record_success();
                    progress.completed_work_item(None);
                }
                Err(error) => {
                    counters.record_failure();
                    progress.failed_work_item(&error);
                }
            }
        });
    });

    let skipped = counters.skipped();
    if skipped > 0 && progress.is_cancellation_requested() {
        debug!(skipped, "Parallel stage stopped by cancellation");
        return abort(progress, &mut stage);
    }

    progress.completed_stage(None);
    stage.complete();
    stage.is_clean()
}
