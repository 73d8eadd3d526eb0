//! Stage execution on top of a [`JobProgress`] reporter.
//!
//! [`StageRunner`] is implemented for every reporter. Job code calls its
//! methods to run one stage at a time; the runner fires the reporter's item
//! and stage callbacks, isolates item failures and polls cancellation.
//!
//! ```rust,ignore
//! use jobprogress::prelude::*;
//!
//! progress.starting_stage("Sending message batches", Some(batches.len()), FailurePolicy::SkipItemOutlier);
//! progress.run_stage_with_summary(
//!     batches,
//!     |batch| format!("Sending batch with {} messages", batch.len()),
//!     |batch| send_all(batch),
//!     |ok, failed| format!("Sent {ok} batches, {failed} failed"),
//! );
//! ```

mod action;
mod parallel;
mod sequential;

#[cfg(test)]
mod scenario_tests;

use rayon::iter::IntoParallelIterator;
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

use crate::core::Stage;
use crate::errors::JobError;
use crate::progress::JobProgress;

/// Stage-running operations available on every [`JobProgress`].
///
/// Every method finalizes exactly one stage through either
/// `completed_stage` or `failed_stage`.
pub trait StageRunner: JobProgress {
    /// Runs `work` for each item, in order, on the calling thread.
    ///
    /// A failing item is reported and counted, and the stage moves on.
    /// Cancellation is polled before the first and before every further
    /// item; once requested the stage fails without starting more items.
    ///
    /// Returns true if the stage completed and every item succeeded.
    fn run_stage<I, D, W>(&self, items: I, describe: D, work: W) -> bool
    where
        I: IntoIterator,
        D: FnMut(&I::Item) -> String,
        W: FnMut(I::Item) -> anyhow::Result<()>,
    {
        sequential::run_items(self, items, describe, work, |_: &()| None, |_, _| None)
    }

    /// Like [`StageRunner::run_stage`], completing the stage with
    /// `summarize(succeeded, failed)`.
    fn run_stage_with_summary<I, D, W, F>(&self, items: I, describe: D, work: W, summarize: F) -> bool
    where
        I: IntoIterator,
        D: FnMut(&I::Item) -> String,
        W: FnMut(I::Item) -> anyhow::Result<()>,
        F: FnOnce(usize, usize) -> String,
    {
        sequential::run_items(self, items, describe, work, |_: &()| None, |ok, failed| {
            Some(summarize(ok, failed))
        })
    }

    /// Like [`StageRunner::run_stage_with_summary`], reporting each item's
    /// result through `item_summary` when it completes.
    fn run_stage_with_results<I, R, D, S, W, F>(
        &self,
        items: I,
        describe: D,
        mut item_summary: S,
        work: W,
        summarize: F,
    ) -> bool
    where
        I: IntoIterator,
        D: FnMut(&I::Item) -> String,
        S: FnMut(&R) -> String,
        W: FnMut(I::Item) -> anyhow::Result<R>,
        F: FnOnce(usize, usize) -> String,
    {
        sequential::run_items(
            self,
            items,
            describe,
            work,
            |result: &R| Some(item_summary(result)),
            |ok, failed| Some(summarize(ok, failed)),
        )
    }

    /// Runs `work` for each key/value entry, in iteration order.
    fn run_stage_entries<K, V, E, D, W>(&self, entries: E, mut describe: D, mut work: W) -> bool
    where
        E: IntoIterator<Item = (K, V)>,
        D: FnMut(&K, &V) -> String,
        W: FnMut(K, V) -> anyhow::Result<()>,
    {
        sequential::run_items(
            self,
            entries,
            |(key, value): &(K, V)| describe(key, value),
            |(key, value)| work(key, value),
            |_: &()| None,
            |_, _| None,
        )
    }

    /// Runs a single action as a stage without item tracking.
    ///
    /// Returns true if the action succeeded.
    fn run_stage_action<A>(&self, action: A) -> bool
    where
        A: FnOnce() -> anyhow::Result<()>,
    {
        action::run_action(self, action).is_some()
    }

    /// Runs a value-producing stage; on failure the error is reported through
    /// `failed_stage` and `fallback` is returned instead.
    fn run_stage_or<V, A>(&self, fallback: V, action: A) -> V
    where
        A: FnOnce() -> anyhow::Result<V>,
    {
        action::run_action(self, action).unwrap_or(fallback)
    }

    /// Runs a value-producing stage; `None` if it failed.
    fn run_stage_optional<V, A>(&self, action: A) -> Option<V>
    where
        A: FnOnce() -> anyhow::Result<V>,
    {
        action::run_action(self, action)
    }

    /// Runs a value-producing stage and hands any failure back to the caller
    /// after reporting it.
    fn run_stage_and_rethrow<V, E, A>(&self, action: A) -> Result<V, E>
    where
        A: FnOnce() -> Result<V, E>,
        E: From<JobError> + Display,
    {
        action::run_action_and_rethrow(self, action)
    }

    /// Runs `work` for all items on a pool of `parallelism` worker threads,
    /// blocking until every item has been attempted.
    ///
    /// No more than `parallelism` items execute at once. Items not yet
    /// started when cancellation is requested are skipped and the stage
    /// fails; items already running finish.
    ///
    /// Returns true if every item succeeded.
    fn run_stage_in_parallel<I, T, D, W>(&self, parallelism: usize, items: I, describe: D, work: W) -> bool
    where
        I: IntoParallelIterator<Item = T> + Send,
        T: Send,
        D: Fn(&T) -> String + Sync,
        W: Fn(T) -> anyhow::Result<()> + Sync,
    {
        parallel::run_items(self, parallelism, items, describe, work)
    }
}

impl<P: JobProgress + ?Sized> StageRunner for P {}

/// Runs `f`, converting a panic into [`JobError::Panicked`].
fn guarded<R>(f: impl FnOnce() -> anyhow::Result<R>) -> Result<R, JobError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(JobError::Work(error)),
        Err(payload) => {
            let error = JobError::from_panic(payload.as_ref());
            warn!(error = %error, "Caught panic in stage work");
            Err(error)
        }
    }
}

fn cancellation_error<P: JobProgress + ?Sized>(progress: &P) -> JobError {
    JobError::cancelled(
        progress
            .cancellation_reason()
            .unwrap_or_else(|| "cancellation requested".to_string()),
    )
}

/// Fails `stage` because cancellation was requested.
fn abort<P: JobProgress + ?Sized>(progress: &P, stage: &mut Stage) -> bool {
    let error = cancellation_error(progress);
    tracing::info!(
        succeeded = stage.counters().succeeded(),
        failed = stage.counters().failed(),
        "Stage cancelled"
    );
    progress.failed_stage(&error);
    stage.fail();
    false
}
