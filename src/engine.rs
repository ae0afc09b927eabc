//! The query engine: ties the date range, scanner, index reader, pushdown
//! filter, and cache together into a single paginated query.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::instrument;

use shared::EngineError;

use crate::config::EngineConfig;
use crate::daterange::{Cursor, DateRange};
use crate::index;
use crate::metrics;
use crate::model::{QueryResult, ReceiptMetadata, ReceiptQuery};
use crate::query_cache::QueryCache;
use crate::scanner;
use crate::store::Store;

/// Sort order for the merged result set: `payment_date` descending, then
/// `session_id` descending as a tiebreak.
fn sort_key(record: &ReceiptMetadata) -> (std::cmp::Reverse<String>, std::cmp::Reverse<String>) {
    (
        std::cmp::Reverse(record.payment_date.clone()),
        std::cmp::Reverse(record.session_id.clone()),
    )
}

pub struct Engine {
    store: Store,
    config: EngineConfig,
    cache: Arc<QueryCache>,
    cache_hits: AtomicU64,
    cache_lookups: AtomicU64,
}

impl Engine {
    pub fn new(store: Store, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let cache = Arc::new(QueryCache::new(&config.query_cache)?);
        Ok(Self {
            store,
            config,
            cache,
            cache_hits: AtomicU64::new(0),
            cache_lookups: AtomicU64::new(0),
        })
    }

    /// Runs the nine-step query algorithm:
    /// 1. queries with none of the five required fields return an empty
    ///    page rather than scanning anything;
    /// 2. resolve and clamp the date range;
    /// 3. scan every date's partition concurrently — each shard consults
    ///    the query cache before re-scanning, pushdown-filtering where
    ///    supported and falling back to the client-side predicate;
    /// 4. merge every shard's records;
    /// 5. sort descending by `(payment_date, session_id)`;
    /// 6. binary-search the cursor's position, if present;
    /// 7. clamp the limit and slice the page;
    /// 8. return the page (scanned_dates, total_count, has_more,
    ///    next_cursor alongside it).
    #[instrument(skip(self, cancel), fields(has_cursor = query.cursor.is_some()))]
    pub async fn query(
        &self,
        query: ReceiptQuery,
        cancel: CancellationToken,
    ) -> Result<QueryResult, EngineError> {
        let started = Instant::now();
        let result = self.query_inner(query, cancel).await;
        metrics::record_query_latency(started.elapsed().as_secs_f64(), if result.is_ok() { "ok" } else { "error" });
        metrics::set_cache_hit_rate(self.cache_hits.load(Ordering::Relaxed), self.cache_lookups.load(Ordering::Relaxed));
        result
    }

    async fn query_inner(
        &self,
        query: ReceiptQuery,
        cancel: CancellationToken,
    ) -> Result<QueryResult, EngineError> {
        if !query.has_required_field() {
            return Ok(QueryResult {
                records: Vec::new(),
                scanned_dates: Vec::new(),
                total_count: 0,
                next_cursor: None,
                has_more: false,
                page_size: self.config.clamp_limit(query.limit),
            });
        }

        let range = DateRange::new(query.date_from.as_deref(), query.date_to.as_deref())
            .map_err(|e| EngineError::validation("date_from/date_to", e.to_string()))?;
        let dates = range.to_array();

        let store = self.store.clone();
        let cache = self.cache.clone();
        let query_for_scan = query.clone();
        let scanner_config = self.config.scanner.clone();
        let part_cancel = cancel.clone();
        let all_records = scanner::scan_and_flatten(dates.clone(), &self.config.scanner, cancel, move |date| {
            let store = store.clone();
            let cache = cache.clone();
            let query = query_for_scan.clone();
            let scanner_config = scanner_config.clone();
            let part_cancel = part_cancel.clone();
            async move {
                let (hit, records) = scan_one_date_cached(&store, &scanner_config, part_cancel, &cache, &date, &query).await?;
                Ok(records.into_iter().map(|r| (hit, r)).collect::<Vec<_>>())
            }
        })
        .await?;

        for (hit, _) in &all_records {
            self.cache_lookups.fetch_add(1, Ordering::Relaxed);
            if *hit {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
            }
        }
        let mut records: Vec<ReceiptMetadata> = all_records.into_iter().map(|(_, r)| r).collect();
        records.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));

        let start_index = match Cursor::decode(query.cursor.as_deref()) {
            Some(cursor) => records
                .iter()
                .position(|r| r.payment_date == cursor.payment_date && r.session_id == cursor.session_id)
                .map(|i| i + 1)
                .unwrap_or(0),
            None => 0,
        };

        let limit = self.config.clamp_limit(query.limit);
        let total_count = records.len();
        let page_end = (start_index + limit as usize).min(records.len());
        let page: Vec<ReceiptMetadata> = records[start_index.min(records.len())..page_end].to_vec();
        let has_more = page_end < records.len();
        let next_cursor = if has_more {
            page.last().map(|r| Cursor::encode(&r.payment_date, &r.session_id))
        } else {
            None
        };

        Ok(QueryResult {
            records: page,
            scanned_dates: dates,
            total_count,
            next_cursor,
            has_more,
            page_size: limit,
        })
    }
}

/// Scans one date's partition, consulting the shard cache first. Returns
/// whether the shard was served from cache
/// alongside the records, so the caller can maintain a hit-rate metric
/// without threading a second round trip through the scanner.
async fn scan_one_date_cached(
    store: &Store,
    config: &crate::config::ScannerConfig,
    cancel: CancellationToken,
    cache: &QueryCache,
    date: &str,
    query: &ReceiptQuery,
) -> Result<(bool, Vec<ReceiptMetadata>), EngineError> {
    if let Some(cached) = cache.get(date, query) {
        return Ok((true, cached));
    }
    let records = scan_one_date(store, config, cancel, date, query).await?;
    cache.set(date, query, records.clone());
    Ok((false, records))
}

/// Scans every part file for one date's partition. A `NotFound` shard (no
/// writes yet for that date) contributes no records rather than failing
/// the whole query. Parts are scanned with the same bounded concurrency
/// the scanner applies across dates; each part attempts a pushdown scan
/// first (see [`index::scan_part`]), falling back to the client-side
/// predicate on any pushdown error.
async fn scan_one_date(
    store: &Store,
    config: &crate::config::ScannerConfig,
    cancel: CancellationToken,
    date: &str,
    query: &ReceiptQuery,
) -> Result<Vec<ReceiptMetadata>, EngineError> {
    let prefix = index::build_prefix(date);
    let parts = match index::list_parts(store, &prefix).await {
        Ok(parts) => parts,
        Err(EngineError::NotFound { .. }) => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let store = store.clone();
    let query = query.clone();
    scanner::scan_and_flatten(parts, config, cancel, move |part| {
        let store = store.clone();
        let query = query.clone();
        async move { index::scan_part(&store, &part, &query).await }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use bytes::Bytes;
    use object_store::memory::InMemory;

    use crate::keys;
    use crate::model::PartialReceiptMetadata;
    use crate::pipeline;

    async fn engine_with(records: &[(&str, &str, &str, &str, &str)]) -> Engine {
        let store = Store::new(StdArc::new(InMemory::new()));
        for (session_id, consumer_id, receipt_number, payment_date, card_last_four) in records {
            pipeline::store(
                &store,
                Bytes::from_static(b"%PDF-1.4"),
                PartialReceiptMetadata {
                    session_id: session_id.to_string(),
                    consumer_id: consumer_id.to_string(),
                    receipt_number: receipt_number.to_string(),
                    payment_date: payment_date.to_string(),
                    card_last_four: card_last_four.to_string(),
                    amount: "£10.00".to_string(),
                },
            )
            .await
            .unwrap();
        }
        Engine::new(store, EngineConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn query_without_required_field_returns_empty_page() {
        let engine = engine_with(&[]).await;
        let result = engine.query(ReceiptQuery::default(), CancellationToken::new()).await.unwrap();
        assert!(result.records.is_empty());
        assert!(result.scanned_dates.is_empty());
        assert_eq!(result.total_count, 0);
        assert!(result.next_cursor.is_none());
        assert!(!result.has_more);
        assert_eq!(result.page_size, 50);
    }

    #[tokio::test]
    async fn card_filter_returns_matching_sessions_sorted_descending() {
        let engine = engine_with(&[
            ("sess-001", "c-alice", "EVC-1", "2025-12-20", "5555"),
            ("sess-002", "c-alice", "EVC-2", "2025-12-24", "5555"),
            ("sess-003", "c-bob", "EVC-3", "2025-12-24", "1234"),
        ])
        .await;

        let mut query = ReceiptQuery::default();
        query.card_last_four = Some("5555".to_string());
        query.date_from = Some("2025-12-01".to_string());
        query.date_to = Some("2025-12-31".to_string());

        let result = engine.query(query, CancellationToken::new()).await.unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].session_id, "sess-002");
        assert_eq!(result.records[1].session_id, "sess-001");
        assert!(!result.has_more);
    }

    #[tokio::test]
    async fn pagination_respects_limit_and_exposes_next_cursor() {
        let engine = engine_with(&[
            ("sess-001", "c-alice", "EVC-1", "2025-12-20", "5555"),
            ("sess-002", "c-alice", "EVC-2", "2025-12-21", "5555"),
            ("sess-003", "c-alice", "EVC-3", "2025-12-22", "5555"),
        ])
        .await;

        let mut query = ReceiptQuery::default();
        query.consumer_id = Some("c-alice".to_string());
        query.date_from = Some("2025-12-01".to_string());
        query.date_to = Some("2025-12-31".to_string());
        query.limit = Some(2);

        let result = engine.query(query.clone(), CancellationToken::new()).await.unwrap();
        assert_eq!(result.records.len(), 2);
        assert!(result.has_more);
        assert_eq!(result.records[0].session_id, "sess-003");

        query.cursor = result.next_cursor.clone();
        let page2 = engine.query(query, CancellationToken::new()).await.unwrap();
        assert_eq!(page2.records.len(), 1);
        assert_eq!(page2.records[0].session_id, "sess-001");
        assert!(!page2.has_more);
    }

    #[tokio::test]
    async fn missing_date_shard_contributes_no_records() {
        let engine = engine_with(&[]).await;
        let mut query = ReceiptQuery::default();
        query.session_id = Some("ghost".to_string());
        query.date_from = Some("2025-12-24".to_string());
        query.date_to = Some("2025-12-24".to_string());
        let result = engine.query(query, CancellationToken::new()).await.unwrap();
        assert!(result.records.is_empty());
    }

    #[tokio::test]
    async fn repeat_query_within_ttl_hits_cache() {
        let engine = engine_with(&[("sess-001", "c-alice", "EVC-1", "2025-12-24", "5555")]).await;
        let mut query = ReceiptQuery::default();
        query.session_id = Some("sess-001".to_string());

        let first = engine.query(query.clone(), CancellationToken::new()).await.unwrap();
        let second = engine.query(query, CancellationToken::new()).await.unwrap();
        assert_eq!(first.total_count, second.total_count);
        assert!(engine.cache_hits.load(Ordering::Relaxed) >= 1, "the second query should have hit the shard cache");
    }

    #[tokio::test]
    async fn caching_enabled_or_disabled_yields_identical_records() {
        let enabled = engine_with(&[
            ("sess-001", "c-alice", "EVC-1", "2025-12-24", "5555"),
            ("sess-002", "c-alice", "EVC-2", "2025-12-25", "5555"),
        ])
        .await;

        let store = enabled.store.clone();
        let mut disabled_config = EngineConfig::default();
        disabled_config.query_cache.max_size = 0;
        let disabled = Engine::new(store, disabled_config).unwrap();

        let mut query = ReceiptQuery::default();
        query.consumer_id = Some("c-alice".to_string());
        query.date_from = Some("2025-12-01".to_string());
        query.date_to = Some("2025-12-31".to_string());

        let a = enabled.query(query.clone(), CancellationToken::new()).await.unwrap();
        let b = disabled.query(query, CancellationToken::new()).await.unwrap();
        assert_eq!(a.records, b.records, "cache enabled vs disabled must return identical records");
    }

    #[tokio::test]
    async fn pushdown_and_client_side_paths_agree_on_the_same_query() {
        use crate::pushdown::test_support::{EquivalentPushdown, FailingPushdown};

        let store = Store::new(StdArc::new(InMemory::new()));
        pipeline::store(
            &store,
            Bytes::from_static(b"a"),
            PartialReceiptMetadata {
                session_id: "sess-001".to_string(),
                consumer_id: "c-alice".to_string(),
                receipt_number: "EVC-1".to_string(),
                payment_date: "2025-12-24".to_string(),
                card_last_four: "5555".to_string(),
                amount: "£25.00".to_string(),
            },
        )
        .await
        .unwrap();

        let mut query = ReceiptQuery::default();
        query.consumer_id = Some("c-alice".to_string());
        query.date_from = Some("2025-12-24".to_string());
        query.date_to = Some("2025-12-24".to_string());

        let client_side = Engine::new(store.clone(), EngineConfig::default()).unwrap();
        let via_client = client_side.query(query.clone(), CancellationToken::new()).await.unwrap();

        let pushdown_store = store.clone().with_pushdown(StdArc::new(EquivalentPushdown {
            store: store.clone(),
            query: query.clone(),
        }));
        let pushed = Engine::new(pushdown_store, EngineConfig::default()).unwrap();
        let via_pushdown = pushed.query(query.clone(), CancellationToken::new()).await.unwrap();

        assert_eq!(via_client.records, via_pushdown.records, "pushdown and client-side filtering must agree");

        let failing_store = store.with_pushdown(StdArc::new(FailingPushdown));
        let falls_back = Engine::new(failing_store, EngineConfig::default()).unwrap();
        let via_fallback = falls_back.query(query, CancellationToken::new()).await.unwrap();
        assert_eq!(via_client.records, via_fallback.records, "a failing pushdown executor must fall back, not error");
    }
}
