//! Read/append of the date-partitioned NDJSON index. Every write produces
//! a fresh `part-{uuid}.ndjson.gz` object; readers union across every part
//! file in the partition. There is no read-modify-write on a shared index
//! object, which is what lets concurrent writers on the same date avoid
//! colliding.

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use shared::EngineError;
use tracing::{debug, warn};

use crate::filter;
use crate::keys;
use crate::model::{ReceiptMetadata, ReceiptQuery};
use crate::store::Store;

pub fn build_prefix(payment_date: &str) -> String {
    keys::index_prefix(payment_date)
}

/// Lists only keys that match the part-file shape under `prefix`;
/// anything else under the prefix (a stray manifest, say) is ignored
/// rather than tripping up the scan.
pub async fn list_parts(store: &Store, prefix: &str) -> Result<Vec<String>, EngineError> {
    let keys = store.list(prefix).await?;
    Ok(keys.into_iter().filter(|k| keys::is_index_part_key(k)).collect())
}

/// Reads and gzip-decodes a part file's NDJSON content. A `NotFound` on
/// the underlying store returns empty content rather than propagating;
/// every other store error is surfaced as-is.
pub async fn read_part(store: &Store, key: &str) -> Result<String, EngineError> {
    let compressed = match store.get(key).await {
        Ok(bytes) => bytes,
        Err(EngineError::NotFound { .. }) => {
            debug!(operation = "index_read", key, "part not found, treating as empty");
            return Ok(String::new());
        }
        Err(e) => return Err(e),
    };
    decompress(&compressed).map_err(|e| EngineError::storage("index_read_decompress", key, e))
}

/// Serializes exactly one record as an NDJSON line, gzip-compresses it,
/// and PUTs it at a fresh part key under `prefix`.
pub async fn write_part(
    store: &Store,
    record: &ReceiptMetadata,
    prefix: &str,
) -> Result<String, EngineError> {
    let line = serde_json::to_string(record)
        .map_err(|e| EngineError::validation("metadata", format!("failed to serialize record: {e}")))?;
    let mut ndjson = line;
    ndjson.push('\n');

    let compressed = compress(ndjson.as_bytes())
        .map_err(|e| EngineError::storage("index_write_compress", prefix, e))?;

    let key = keys::index_part_key(&prefix_to_date(prefix));
    store.put(&key, Bytes::from(compressed), "application/x-ndjson").await?;
    Ok(key)
}

/// Scans one part file for records matching `query`: attempts a pushdown
/// scan when the store carries an executor, and on any pushdown error
/// (logged once here) falls back to reading and decompressing the part
/// and applying the client-side predicate. Per spec, the two paths must
/// agree record-for-record (`filter::to_sql_predicate`/`filter::matches`).
pub async fn scan_part(store: &Store, part_key: &str, query: &ReceiptQuery) -> Result<Vec<ReceiptMetadata>, EngineError> {
    if let Some(executor) = store.pushdown_executor() {
        let sql = filter::to_sql_predicate(query);
        match executor.scan(part_key, &sql).await {
            Ok(records) => return Ok(records),
            Err(e) => {
                warn!(operation = "pushdown_scan", key = part_key, error = %e, "pushdown failed, falling back to client-side filter");
            }
        }
    }
    let content = read_part(store, part_key).await?;
    let records = parse_ndjson(&content, part_key);
    Ok(records.into_iter().filter(|r| filter::matches(query, r)).collect())
}

fn prefix_to_date(prefix: &str) -> String {
    prefix
        .strip_prefix("index/dt=")
        .and_then(|rest| rest.strip_suffix('/'))
        .unwrap_or(prefix)
        .to_string()
}

fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn decompress(data: &[u8]) -> std::io::Result<String> {
    let mut decoder = GzDecoder::new(data);
    let mut out = String::new();
    decoder.read_to_string(&mut out)?;
    Ok(out)
}

/// Parses the NDJSON content of one part file into its records, skipping
/// and logging any line that fails to deserialize rather than failing the
/// whole shard.
pub fn parse_ndjson(content: &str, part_key: &str) -> Vec<ReceiptMetadata> {
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<ReceiptMetadata>(line) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(operation = "index_parse", key = part_key, error = %e, "skipping malformed index line");
                None
            }
        })
        .collect()
}

/// A record whose serialized NDJSON line would exceed the store's
/// documented max object-record size is a caller error, not a storage
/// failure: the write is refused before anything is PUT (§B.3).
pub fn oversized_line_error(key: &str, max_len: usize, actual_len: usize) -> EngineError {
    EngineError::validation(key, format!("record line {actual_len} bytes exceeds max {max_len}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use object_store::memory::InMemory;

    fn sample(session_id: &str) -> ReceiptMetadata {
        ReceiptMetadata {
            session_id: session_id.to_string(),
            consumer_id: "c-alice".to_string(),
            receipt_number: "EVC-2025-00001".to_string(),
            payment_date: "2025-12-24".to_string(),
            card_last_four: "5555".to_string(),
            amount: "£25.50".to_string(),
            amount_pence: Some(2550),
            pdf_key: keys::pdf_key(session_id),
            metadata_key: keys::metadata_key(session_id),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trips_one_record() {
        let store = Store::new(Arc::new(InMemory::new()));
        let prefix = build_prefix("2025-12-24");
        let key = write_part(&store, &sample("sess-001"), &prefix).await.unwrap();
        assert!(keys::is_index_part_key(&key));

        let content = read_part(&store, &key).await.unwrap();
        let records = parse_ndjson(&content, &key);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session_id, "sess-001");
    }

    #[tokio::test]
    async fn concurrent_writers_on_same_date_produce_distinct_parts() {
        let store = Store::new(Arc::new(InMemory::new()));
        let prefix = build_prefix("2025-12-24");
        let k1 = write_part(&store, &sample("sess-001"), &prefix).await.unwrap();
        let k2 = write_part(&store, &sample("sess-002"), &prefix).await.unwrap();
        assert_ne!(k1, k2);

        let parts = list_parts(&store, &prefix).await.unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[tokio::test]
    async fn read_missing_part_returns_empty_not_error() {
        let store = Store::new(Arc::new(InMemory::new()));
        let content = read_part(&store, "index/dt=2025-12-24/part-ghost.ndjson.gz").await.unwrap();
        assert!(content.is_empty());
    }

    #[tokio::test]
    async fn list_parts_ignores_non_part_keys() {
        let store = Store::new(Arc::new(InMemory::new()));
        let prefix = build_prefix("2025-12-24");
        write_part(&store, &sample("sess-001"), &prefix).await.unwrap();
        store.put(&format!("{prefix}manifest.json"), Bytes::from_static(b"{}"), "application/json").await.unwrap();

        let parts = list_parts(&store, &prefix).await.unwrap();
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let content = "not json\n{\"session_id\":\"sess-001\"}\n";
        // second line also fails (missing required fields) — both skipped gracefully.
        let records = parse_ndjson(content, "part-test");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn scan_part_without_executor_falls_back_to_client_side_filter() {
        let store = Store::new(Arc::new(InMemory::new()));
        let prefix = build_prefix("2025-12-24");
        let key = write_part(&store, &sample("sess-001"), &prefix).await.unwrap();

        let mut query = ReceiptQuery::default();
        query.session_id = Some("sess-001".to_string());
        let records = scan_part(&store, &key, &query).await.unwrap();
        assert_eq!(records.len(), 1);

        query.session_id = Some("sess-002".to_string());
        let records = scan_part(&store, &key, &query).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn scan_part_uses_pushdown_executor_when_present() {
        use crate::pushdown::test_support::EquivalentPushdown;

        let inner = Store::new(Arc::new(InMemory::new()));
        let prefix = build_prefix("2025-12-24");
        let key = write_part(&inner, &sample("sess-001"), &prefix).await.unwrap();

        let mut query = ReceiptQuery::default();
        query.session_id = Some("sess-001".to_string());

        let store = inner.clone().with_pushdown(Arc::new(EquivalentPushdown {
            store: inner.clone(),
            query: query.clone(),
        }));
        let records = scan_part(&store, &key, &query).await.unwrap();
        assert_eq!(records.len(), 1, "pushdown executor should have matched the record");
    }

    #[tokio::test]
    async fn scan_part_falls_back_when_pushdown_fails() {
        use crate::pushdown::test_support::FailingPushdown;

        let inner = Store::new(Arc::new(InMemory::new()));
        let prefix = build_prefix("2025-12-24");
        let key = write_part(&inner, &sample("sess-001"), &prefix).await.unwrap();

        let mut query = ReceiptQuery::default();
        query.session_id = Some("sess-001".to_string());

        let store = inner.with_pushdown(Arc::new(FailingPushdown));
        let records = scan_part(&store, &key, &query).await.unwrap();
        assert_eq!(records.len(), 1, "a pushdown failure must fall back to the client-side predicate, not propagate");
    }
}
