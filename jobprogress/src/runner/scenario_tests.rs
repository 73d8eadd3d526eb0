//! Scenario tests for the stage runner against a spy reporter.

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::StageRunner;
use crate::errors::JobError;
use crate::progress::JobProgress;
use crate::testing::{
    assert_item_calls, assert_stage_cancelled, assert_stage_completed, assert_stage_failed,
    ProgressCall, SpyJobProgress,
};

fn ratio(ok: usize, failed: usize) -> String {
    format!("({ok}/{failed})")
}

/// Item 1 succeeds and is appended to `done`; every other item fails.
fn first_succeeds(done: &mut Vec<u32>) -> impl FnMut(u32) -> anyhow::Result<()> + '_ {
    move |i| {
        if i == 1 {
            done.push(i);
            Ok(())
        } else {
            anyhow::bail!("item {i} rejected")
        }
    }
}

#[test]
fn test_all_items_succeed() {
    let spy = SpyJobProgress::new();
    let mut done = Vec::new();

    let clean = spy.run_stage_with_summary(
        vec![1, 2, 3],
        |i| format!("item {i}"),
        |i| {
            done.push(i);
            Ok(())
        },
        ratio,
    );

    assert!(clean);
    assert_eq!(done, vec![1, 2, 3]);
    assert_item_calls(&spy, 3, 3, 0);
    assert_stage_completed(&spy, Some("(3/0)"));
}

#[test]
fn test_all_items_succeed_without_summary() {
    let spy = SpyJobProgress::new();

    assert!(spy.run_stage(vec!["a", "b", "c"], |s| (*s).to_string(), |_| Ok(())));

    assert_item_calls(&spy, 3, 3, 0);
    assert_stage_completed(&spy, None);
}

#[test]
fn test_cancelled_before_start() {
    let spy = SpyJobProgress::cancelled();
    let mut done = Vec::new();

    let clean = spy.run_stage_with_summary(
        vec![1, 2, 3],
        |i| format!("item {i}"),
        |i| {
            done.push(i);
            Ok(())
        },
        ratio,
    );

    assert!(!clean);
    assert!(done.is_empty());
    assert_item_calls(&spy, 0, 0, 0);
    assert_stage_cancelled(&spy);
}

#[test]
fn test_cancelled_before_start_does_not_pull_items() {
    let spy = SpyJobProgress::cancelled();
    let pulled = AtomicUsize::new(0);
    let items = (1..=3).inspect(|_| {
        pulled.fetch_add(1, Ordering::SeqCst);
    });

    spy.run_stage(items, |i| i.to_string(), |_| Ok(()));

    assert_eq!(pulled.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failed_items_do_not_stop_stage() {
    let spy = SpyJobProgress::new();
    let mut done = Vec::new();

    let clean = spy.run_stage_with_summary(
        vec![1, 2, 3],
        |i| format!("item {i}"),
        first_succeeds(&mut done),
        ratio,
    );

    assert!(!clean);
    assert_eq!(done, vec![1]);
    assert_item_calls(&spy, 3, 1, 2);
    assert_stage_completed(&spy, Some("(1/2)"));
}

#[test]
fn test_cancellation_from_failure_callback() {
    let spy = SpyJobProgress::cancel_on_failure(1);
    let mut done = Vec::new();

    let clean = spy.run_stage_with_summary(
        vec![1, 2, 3],
        |i| format!("item {i}"),
        first_succeeds(&mut done),
        ratio,
    );

    assert!(!clean);
    assert_eq!(done, vec![1]);
    assert_item_calls(&spy, 2, 1, 1);
    assert_stage_cancelled(&spy);
}

#[test]
fn test_sequential_call_order() {
    let spy = SpyJobProgress::new();
    let mut done = Vec::new();

    spy.run_stage_with_summary(
        vec![1, 2, 3],
        |i| format!("item {i}"),
        first_succeeds(&mut done),
        ratio,
    );

    assert_eq!(
        spy.calls(),
        vec![
            ProgressCall::StartingWorkItem("item 1".to_string()),
            ProgressCall::CompletedWorkItem(None),
            ProgressCall::StartingWorkItem("item 2".to_string()),
            ProgressCall::FailedWorkItem("item 2 rejected".to_string()),
            ProgressCall::StartingWorkItem("item 3".to_string()),
            ProgressCall::FailedWorkItem("item 3 rejected".to_string()),
            ProgressCall::CompletedStage(Some("(1/2)".to_string())),
        ]
    );
}

#[test]
fn test_lazy_items_stop_being_pulled_after_cancellation() {
    let spy = SpyJobProgress::cancel_on_failure(1);
    let pulled = AtomicUsize::new(0);
    let items = (1..=100_u32).inspect(|_| {
        pulled.fetch_add(1, Ordering::SeqCst);
    });

    spy.run_stage(items, |i| i.to_string(), |_| anyhow::bail!("always"));

    // The second item is pulled before the cancellation check rejects it.
    assert_eq!(pulled.load(Ordering::SeqCst), 2);
    assert_item_calls(&spy, 1, 0, 1);
    assert_stage_cancelled(&spy);
}

#[test]
fn test_panicking_item_is_isolated() {
    let spy = SpyJobProgress::new();

    let clean = spy.run_stage(
        vec![1, 2, 3],
        |i| i.to_string(),
        |i| {
            assert!(i != 2, "bad item");
            Ok(())
        },
    );

    assert!(!clean);
    assert_item_calls(&spy, 3, 2, 1);
    assert_stage_completed(&spy, None);
    assert!(spy
        .calls()
        .contains(&ProgressCall::FailedWorkItem("Work panicked: bad item".to_string())));
}

#[test]
fn test_entries_stage() {
    let spy = SpyJobProgress::new();
    let mut totals = BTreeMap::new();
    totals.insert("district-a", 3);
    totals.insert("district-b", 0);

    let clean = spy.run_stage_entries(
        totals,
        |name, count| format!("{name}: {count}"),
        |_, count| {
            if count == 0 {
                anyhow::bail!("nothing to aggregate");
            }
            Ok(())
        },
    );

    assert!(!clean);
    assert_eq!(spy.started_items(), vec!["district-a: 3", "district-b: 0"]);
    assert_item_calls(&spy, 2, 1, 1);
    assert_stage_completed(&spy, None);
}

#[test]
fn test_results_stage_reports_item_summaries() {
    let spy = SpyJobProgress::new();

    spy.run_stage_with_results(
        vec![2, 3],
        |i| format!("request {i}"),
        |imported: &usize| format!("imported {imported}"),
        |i| Ok(i * 10),
        ratio,
    );

    assert_eq!(
        spy.calls(),
        vec![
            ProgressCall::StartingWorkItem("request 2".to_string()),
            ProgressCall::CompletedWorkItem(Some("imported 20".to_string())),
            ProgressCall::StartingWorkItem("request 3".to_string()),
            ProgressCall::CompletedWorkItem(Some("imported 30".to_string())),
            ProgressCall::CompletedStage(Some("(2/0)".to_string())),
        ]
    );
}

#[test]
fn test_action_stage_success() {
    let spy = SpyJobProgress::new();
    let ran = AtomicUsize::new(0);

    let ok = spy.run_stage_action(|| {
        ran.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    assert!(ok);
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    assert_item_calls(&spy, 0, 0, 0);
    assert_stage_completed(&spy, None);
}

#[test]
fn test_action_stage_failure() {
    let spy = SpyJobProgress::new();

    let ok = spy.run_stage_action(|| anyhow::bail!("table rebuild failed"));

    assert!(!ok);
    assert_item_calls(&spy, 0, 0, 0);
    assert_stage_failed(&spy);
    assert_eq!(
        spy.failed_stages(),
        vec![("table rebuild failed".to_string(), false)]
    );
}

#[test]
fn test_action_stage_cancelled_before_start() {
    let spy = SpyJobProgress::cancelled();
    let ran = AtomicUsize::new(0);

    let ok = spy.run_stage_action(|| {
        ran.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    assert!(!ok);
    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_stage_cancelled(&spy);
}

#[test]
fn test_fallback_stage_success() {
    let spy = SpyJobProgress::new();

    let value = spy.run_stage_or(0, || Ok(42));

    assert_eq!(value, 42);
    assert_stage_completed(&spy, None);
}

#[test]
fn test_fallback_stage_failure() {
    let spy = SpyJobProgress::new();

    let value: Vec<&str> = spy.run_stage_or(Vec::new(), || anyhow::bail!("no templates"));

    assert!(value.is_empty());
    assert_stage_failed(&spy);
    assert_eq!(spy.failed_stages(), vec![("no templates".to_string(), false)]);
}

#[test]
fn test_fallback_stage_panic() {
    let spy = SpyJobProgress::new();

    let value = spy.run_stage_or(-1, || -> anyhow::Result<i32> { panic!("corrupt state") });

    assert_eq!(value, -1);
    assert_stage_failed(&spy);
}

#[test]
fn test_optional_stage() {
    let spy = SpyJobProgress::new();

    assert_eq!(spy.run_stage_optional(|| Ok("value")), Some("value"));
    assert_eq!(
        spy.run_stage_optional(|| -> anyhow::Result<&str> { anyhow::bail!("missing") }),
        None
    );
    assert_eq!(spy.completed_stages().len(), 1);
    assert_eq!(spy.failed_stages().len(), 1);
}

#[derive(Debug, thiserror::Error)]
enum ImportError {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Job(#[from] JobError),
}

#[test]
fn test_rethrow_stage_returns_original_error() {
    let spy = SpyJobProgress::new();

    let result: Result<u32, ImportError> =
        spy.run_stage_and_rethrow(|| Err(ImportError::Conflict("duplicate value".to_string())));

    assert!(matches!(result, Err(ImportError::Conflict(ref m)) if m == "duplicate value"));
    assert_eq!(
        spy.failed_stages(),
        vec![("conflict: duplicate value".to_string(), false)]
    );
}

#[test]
fn test_rethrow_stage_success() {
    let spy = SpyJobProgress::new();

    let result: Result<u32, ImportError> = spy.run_stage_and_rethrow(|| Ok(9));

    assert_eq!(result.unwrap(), 9);
    assert_stage_completed(&spy, None);
}

#[test]
fn test_rethrow_stage_cancelled() {
    let spy = SpyJobProgress::cancelled();

    let result: Result<u32, ImportError> = spy.run_stage_and_rethrow(|| Ok(9));

    assert!(matches!(result, Err(ImportError::Job(JobError::Cancelled(_)))));
    assert_stage_cancelled(&spy);
}

#[test]
fn test_parallel_all_items_succeed() {
    const PARALLELISM: usize = 4;
    let spy = SpyJobProgress::new();
    let items: Vec<usize> = (0..2 * PARALLELISM - 1).collect();
    let processed = Mutex::new(Vec::new());
    let active = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    let clean = spy.run_stage_in_parallel(
        PARALLELISM,
        items.clone(),
        |i| format!("item {i}"),
        |i| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            processed.lock().push(i);
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        },
    );

    assert!(clean);
    let processed = processed.into_inner();
    assert_eq!(processed.len(), items.len());
    assert_eq!(
        processed.into_iter().collect::<HashSet<_>>(),
        items.iter().copied().collect::<HashSet<_>>()
    );
    assert!(peak.load(Ordering::SeqCst) <= PARALLELISM);
    assert_item_calls(&spy, items.len(), items.len(), 0);
    assert_stage_completed(&spy, None);
}

#[test]
fn test_parallel_partial_failure() {
    let spy = SpyJobProgress::new();

    let clean = spy.run_stage_in_parallel(
        3,
        (0..10_u32).collect::<Vec<_>>(),
        |i| i.to_string(),
        |i| {
            if i % 2 == 0 {
                anyhow::bail!("even item");
            }
            Ok(())
        },
    );

    assert!(!clean);
    assert_item_calls(&spy, 10, 5, 5);
    assert_stage_completed(&spy, None);
}

#[test]
fn test_parallel_cancelled_before_start() {
    let spy = SpyJobProgress::cancelled();

    let clean = spy.run_stage_in_parallel(2, vec![1, 2, 3], |i| i.to_string(), |_| Ok(()));

    assert!(!clean);
    assert_item_calls(&spy, 0, 0, 0);
    assert_stage_cancelled(&spy);
}

#[test]
fn test_parallel_cancelled_mid_flight_skips_remaining() {
    let spy = Arc::new(SpyJobProgress::new());
    let worker_spy = spy.clone();

    let clean = spy.run_stage_in_parallel(
        1,
        (0..10_u32).collect::<Vec<_>>(),
        |i| i.to_string(),
        move |_| {
            worker_spy.cancel();
            Ok(())
        },
    );

    assert!(!clean);
    assert_item_calls(&spy, 1, 1, 0);
    assert_stage_cancelled(&spy);
}

#[test]
fn test_parallel_panic_is_isolated() {
    let spy = SpyJobProgress::new();

    let clean = spy.run_stage_in_parallel(
        2,
        vec![1, 2, 3, 4],
        |i| i.to_string(),
        |i| {
            assert!(i != 3, "worker blew up");
            Ok(())
        },
    );

    assert!(!clean);
    assert_item_calls(&spy, 4, 3, 1);
    assert_stage_completed(&spy, None);
}

#[test]
fn test_parallel_zero_parallelism_uses_one_worker() {
    let spy = SpyJobProgress::new();

    assert!(spy.run_stage_in_parallel(0, vec![1, 2], |i| i.to_string(), |_| Ok(())));
    assert_item_calls(&spy, 2, 2, 0);
}

#[test]
fn test_runs_through_trait_object() {
    let spy = SpyJobProgress::new();
    let progress: &dyn JobProgress = &spy;

    assert!(progress.run_stage(vec![1], |i| i.to_string(), |_| Ok(())));
    assert!(progress.run_stage_in_parallel(2, vec![1, 2], |i| i.to_string(), |_| Ok(())));

    assert_item_calls(&spy, 3, 3, 0);
    assert_eq!(spy.completed_stages(), vec![None, None]);
}

#[test]
fn test_plain_message_overloads() {
    let spy = SpyJobProgress::new();

    spy.failed_work_item_message("bad row");
    spy.failed_stage_message("bad table");

    assert_eq!(
        spy.calls(),
        vec![
            ProgressCall::FailedWorkItem("bad row".to_string()),
            ProgressCall::FailedStage {
                error: "bad table".to_string(),
                cancelled: false,
            },
        ]
    );
}
