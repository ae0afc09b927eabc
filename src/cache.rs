//! Bounded, recency-ordered cache with per-entry expiry.
//!
//! A single process-local `lru::LruCache` guarded by a `parking_lot::Mutex`,
//! parameterized over key/value so every cache in the crate shares one
//! eviction and expiry policy instead of each rolling its own.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use shared::EngineError;
use std::hash::Hash;

use crate::config::CacheConfig;

struct Entry<V> {
    value: V,
    expiry: Instant,
}

/// A bounded LRU cache where each entry additionally expires after a fixed
/// TTL from the time it was last set.
pub struct TtlLruCache<K, V> {
    inner: Mutex<LruCache<K, Entry<V>>>,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlLruCache<K, V> {
    pub fn new(config: &CacheConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let cap = NonZeroUsize::new(config.max_size)
            .ok_or_else(|| EngineError::config("cache max_size must be greater than 0"))?;
        Ok(Self {
            inner: Mutex::new(LruCache::new(cap)),
            ttl: config.ttl,
        })
    }

    /// Returns the value for `key` if present and not expired. An expired
    /// entry is removed as a side effect; a present, live entry has its
    /// recency refreshed by the underlying LRU.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock();
        let hit = inner.get(key).map(|entry| (entry.value.clone(), entry.expiry));
        match hit {
            Some((value, expiry)) if expiry > Instant::now() => Some(value),
            Some(_) => {
                inner.pop(key);
                None
            }
            None => None,
        }
    }

    /// Inserts or overwrites `key`, refreshing its expiry. At capacity the
    /// least-recently-used entry is evicted first.
    pub fn set(&self, key: K, value: V) {
        let expiry = Instant::now() + self.ttl;
        self.inner.lock().put(key, Entry { value, expiry });
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn size(&self) -> usize {
        self.inner.lock().len()
    }
}
