//! Bounded-concurrency fan-out/fan-in over a list of items: a single
//! `Semaphore`-gated combinator reused by every caller instead of one
//! semaphore per call site.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::ScannerConfig;
use shared::EngineError;

/// Runs `handler` over every item in `items` with at most
/// `config.concurrency` handlers in flight at once. Remaining items wait
/// FIFO for a permit. If any handler fails, the first failure (in input
/// order) is returned once all handlers that had already started have
/// finished; no new handler starts once a prior one has failed.
///
/// `cancel`, when triggered, aborts outstanding work and yields
/// `EngineError::Cancelled` instead of partial results.
pub async fn scan<T, R, F, Fut>(
    items: Vec<T>,
    config: &ScannerConfig,
    cancel: CancellationToken,
    handler: F,
) -> Result<Vec<R>, EngineError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, EngineError>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let handler = Arc::new(handler);
    let failed = Arc::new(AtomicBool::new(false));

    let tasks = items.into_iter().map(|item| {
        let semaphore = semaphore.clone();
        let handler = handler.clone();
        let cancel = cancel.clone();
        let failed = failed.clone();
        async move {
            if cancel.is_cancelled() || failed.load(Ordering::SeqCst) {
                return Err(EngineError::cancelled("scan"));
            }
            let _permit = tokio::select! {
                permit = semaphore.acquire_owned() => permit.map_err(|_| EngineError::cancelled("scan"))?,
                _ = cancel.cancelled() => return Err(EngineError::cancelled("scan")),
            };
            if cancel.is_cancelled() || failed.load(Ordering::SeqCst) {
                return Err(EngineError::cancelled("scan"));
            }
            let result = handler(item).await;
            if result.is_err() {
                failed.store(true, Ordering::SeqCst);
            }
            result
        }
    });

    let results = join_all(tasks).await;

    // Preserve input order; surface the first failure once every handler
    // that had already been scheduled has completed. Items queued behind the
    // semaphore always sit at a higher input index than whichever handler
    // set `failed`, so the first `Err` encountered front-to-back is always
    // the real failure, not one of its short-circuited `Cancelled` followers.
    let mut out = Vec::with_capacity(results.len());
    let mut first_err = None;
    for result in results {
        match result {
            Ok(value) => out.push(value),
            Err(e) if first_err.is_none() => first_err = Some(e),
            Err(_) => {}
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(out),
    }
}

/// Like [`scan`], but flattens a per-item `Vec<R>` result into a single
/// vector in input order.
pub async fn scan_and_flatten<T, R, F, Fut>(
    items: Vec<T>,
    config: &ScannerConfig,
    cancel: CancellationToken,
    handler: F,
) -> Result<Vec<R>, EngineError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<R>, EngineError>> + Send + 'static,
{
    let nested = scan(items, config, cancel, handler).await?;
    Ok(nested.into_iter().flatten().collect())
}
