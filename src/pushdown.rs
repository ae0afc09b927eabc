//! Optional server-side SQL-over-objects execution (the object store's
//! S3-Select-shaped query facility). Not every backend exposes it; a
//! [`Store`](crate::store::Store) carries an optional executor, and its
//! absence — or any execution failure — is the signal for the query
//! engine to fall back to reading the part and applying
//! [`crate::filter::matches`] client-side. A pushdown failure is caught
//! and logged once per shard; it is never surfaced to the caller.

use async_trait::async_trait;
use shared::EngineError;

/// Executes a conjunctive-equality-and-bounds `SELECT` (built by
/// [`crate::filter::to_sql_predicate`]) against the gzip-compressed NDJSON
/// object at `key`, returning only the matching records. Implementations
/// that cannot evaluate the predicate, or hit a transient I/O failure,
/// return `Err(EngineError::Pushdown)` rather than a partial/incorrect
/// result set.
#[async_trait]
pub trait PushdownExecutor: Send + Sync {
    async fn scan(&self, key: &str, sql: &str) -> Result<Vec<crate::model::ReceiptMetadata>, EngineError>;
}
