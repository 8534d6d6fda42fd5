//! Bounded fan-out over a batch of inputs.
//!
//! [`run_bounded`] drives one async task per input with at most `capacity`
//! of them in flight; the rest wait in the stream until a slot frees. A
//! failing or panicking task is recorded in the batch's `failed` list and
//! never cancels its siblings.
//!
//! All tasks are polled cooperatively on the calling task through
//! `buffer_unordered`, so results are accumulated only after the stream has
//! been drained and need no locking. Spawning the tasks onto worker threads
//! instead would require a lock or channel around the accumulation.

use crate::error::Result;
use crate::models::{BatchResult, Failure};
use futures::FutureExt;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

/// Run `task` over every input with at most `capacity` tasks in flight.
///
/// A `capacity` of zero is treated as one. `total_attempted` always equals
/// `inputs.len()` and `succeeded.len() + failed.len() == total_attempted`.
pub async fn run_bounded<I, T, F, Fut>(inputs: Vec<I>, capacity: usize, task: F) -> BatchResult<T, I>
where
    I: Clone,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total_attempted = inputs.len();
    debug!(total_attempted, capacity, "Starting bounded batch");

    let outcomes: Vec<_> = stream::iter(inputs)
        .map(|input| {
            let task = &task;
            async move {
                let outcome = AssertUnwindSafe(task(input.clone())).catch_unwind().await;
                (input, outcome)
            }
        })
        .buffer_unordered(capacity.max(1))
        .collect()
        .await;

    let mut batch = BatchResult {
        total_attempted,
        ..Default::default()
    };
    for (input, outcome) in outcomes {
        match outcome {
            Ok(Ok(value)) => batch.succeeded.push(value),
            Ok(Err(e)) => batch.failed.push(Failure {
                input,
                kind: e.kind(),
                reason: e.to_string(),
            }),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "task panicked".to_string());
                warn!(%reason, "Task panicked; recorded as failure");
                batch.failed.push(Failure {
                    input,
                    kind: "task",
                    reason,
                });
            }
        }
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvestError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_never_exceeds_capacity() {
        let active = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let batch = run_bounded((0..20).collect(), 3, |n: u32| {
            let active = &active;
            let peak = &peak;
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok(n * 2)
            }
        })
        .await;

        assert_eq!(batch.total_attempted, 20);
        assert_eq!(batch.succeeded.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_cancel_siblings() {
        let batch = run_bounded(vec!["a", "b", "c", "d"], 2, |s| async move {
            if s == "c" {
                Err(HarvestError::ExtractionEmpty(s.to_string()))
            } else {
                Ok(s.to_uppercase())
            }
        })
        .await;

        assert_eq!(batch.succeeded.len(), 3);
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].input, "c");
        assert_eq!(batch.failed[0].kind, "extraction_empty");
    }

    #[tokio::test]
    async fn test_panic_is_a_task_failure() {
        let batch = run_bounded(vec![1, 2], 0, |n: i32| async move {
            if n == 2 {
                panic!("boom");
            }
            Ok(n)
        })
        .await;

        assert_eq!(batch.succeeded, vec![1]);
        assert_eq!(batch.failed.len(), 1);
        assert_eq!(batch.failed[0].kind, "task");
        assert_eq!(batch.failed[0].reason, "boom");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let batch = run_bounded(Vec::<u8>::new(), 4, |n| async move { Ok(n) }).await;
        assert_eq!(batch, BatchResult::default());
    }
}
