//! Query cache layered over [`crate::cache::TtlLruCache`]: caches the
//! filtered record set for one `(date, filters)` shard, not a whole
//! paginated query, so that two queries differing only in `limit`/`cursor`
//! still share the underlying scan.

use crate::cache::TtlLruCache;
use crate::config::CacheConfig;
use crate::model::{ReceiptMetadata, ReceiptQuery};
use shared::EngineError;

/// Builds the cache key from `date` plus every filter field that
/// determines a shard's filtered record set — `limit` and `cursor` don't
/// participate, since they only slice a result the shard scan already
/// produced.
fn cache_key(date: &str, query: &ReceiptQuery) -> String {
    format!(
        "{date}|{}|{}|{}|{}|{}|{}",
        query.session_id.as_deref().unwrap_or(""),
        query.consumer_id.as_deref().unwrap_or(""),
        query.card_last_four.as_deref().unwrap_or(""),
        query.receipt_number.as_deref().unwrap_or(""),
        query.amount_min.map(|v| v.to_string()).unwrap_or_default(),
        query.amount_max.map(|v| v.to_string()).unwrap_or_default(),
    )
}

/// Per-shard query cache. A `max_size` of `0` disables caching entirely —
/// every `get` misses and `set` is a no-op, rather than erroring, since
/// [`TtlLruCache::new`] itself rejects a zero capacity.
pub enum QueryCache {
    Enabled(TtlLruCache<String, Vec<ReceiptMetadata>>),
    Disabled,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Result<Self, EngineError> {
        if config.max_size == 0 {
            return Ok(Self::Disabled);
        }
        Ok(Self::Enabled(TtlLruCache::new(config)?))
    }

    pub fn get(&self, date: &str, query: &ReceiptQuery) -> Option<Vec<ReceiptMetadata>> {
        match self {
            Self::Enabled(cache) => cache.get(&cache_key(date, query)),
            Self::Disabled => None,
        }
    }

    pub fn set(&self, date: &str, query: &ReceiptQuery, records: Vec<ReceiptMetadata>) {
        if let Self::Enabled(cache) = self {
            cache.set(cache_key(date, query), records);
        }
    }

    pub fn clear(&self) {
        if let Self::Enabled(cache) = self {
            cache.clear();
        }
    }
}
