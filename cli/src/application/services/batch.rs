//! Bounded per-service pipeline shared by the snapshot and restore engines.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use futures_util::{StreamExt, stream};

use crate::domain::{MigraError, ServiceFailure};

/// Run `work` over `items` with at most `limit` in flight, keeping results in
/// item order.
///
/// After the first failure no further item is started; items already running
/// are allowed to finish. A single failure is returned unchanged, several are
/// combined into `MigraError::Services`.
///
/// # Errors
///
/// Returns the failure(s) of the items that ran.
pub async fn run_bounded<T, R, F, Fut>(items: Vec<(String, T)>, limit: usize, work: F) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let abort = AtomicBool::new(false);
    let abort = &abort;
    let work = &work;

    let outcomes: Vec<(String, Option<Result<R>>)> = stream::iter(items)
        .map(|(name, item)| async move {
            if abort.load(Ordering::SeqCst) {
                tracing::debug!(service = %name, "skipped after an earlier failure");
                return (name, None);
            }
            let outcome = work(item).await;
            if outcome.is_err() {
                abort.store(true, Ordering::SeqCst);
            }
            (name, Some(outcome))
        })
        .buffered(limit.max(1))
        .collect()
        .await;

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for (service, outcome) in outcomes {
        match outcome {
            Some(Ok(value)) => results.push(value),
            Some(Err(error)) => failures.push(ServiceFailure { service, error }),
            None => {}
        }
    }

    if failures.len() > 1 {
        return Err(MigraError::Services { failures }.into());
    }
    if let Some(failure) = failures.pop() {
        return Err(failure.error);
    }
    Ok(results)
}
