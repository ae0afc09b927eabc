//! Best-effort compensating deletes for a failed write transaction: undo
//! previously-committed side effects in reverse order, log (never
//! propagate) any failure to undo, and let the caller's original error
//! remain the one returned to its caller.

use shared::EngineError;
use tracing::{error, info};

use crate::store::Store;

/// Deletes `keys` in reverse order, tolerating an already-absent key as
/// success (the store layer's `delete` already does this) and logging —
/// never raising — any other failure. Rollback is inherently idempotent:
/// a second rollback attempt over the same keys after a prior partial
/// failure is safe to retry.
pub async fn rollback(store: &Store, keys: &[String]) {
    for key in keys.iter().rev() {
        match store.delete(key).await {
            Ok(()) => info!(operation = "rollback", key, "rolled back"),
            Err(e) => error!(operation = "rollback", key, error = %e, "rollback delete failed, continuing"),
        }
    }
}

/// Runs `rollback` over `keys` and then returns `original_error`
/// unconditionally — the caller's transaction failure is always what gets
/// surfaced, regardless of how rollback itself fared.
pub async fn rollback_and_return(
    store: &Store,
    keys: &[String],
    original_error: EngineError,
) -> EngineError {
    rollback(store, keys).await;
    original_error
}
