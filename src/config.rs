//! Tunable configuration for the engine's components, constructible in
//! code with sane defaults and overridable from the environment.

use std::env;
use std::time::Duration;

use shared::EngineError;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Configuration for the query-shard LRU+TTL cache. Defaults to
/// `maxSize=100`, `ttl=300s`.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_size: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    pub fn from_env(prefix: &str) -> Self {
        Self {
            max_size: env_parse(&format!("{prefix}_CACHE_MAX_SIZE"), 100),
            ttl: Duration::from_secs(env_parse(&format!("{prefix}_CACHE_TTL_SECONDS"), 300)),
        }
    }

    /// Raises `ConfigError` if `maxSize <= 0`.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_size == 0 {
            return Err(EngineError::config("cache max_size must be greater than 0"));
        }
        Ok(())
    }
}

/// Configuration for the parallel date-partition scanner. Defaults to a
/// concurrency of 5.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub concurrency: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self { concurrency: 5 }
    }
}

impl ScannerConfig {
    pub fn from_env() -> Self {
        Self {
            concurrency: env_parse("RECEIPT_SCAN_CONCURRENCY", 5),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.concurrency == 0 {
            return Err(EngineError::config("scanner concurrency must be greater than 0"));
        }
        Ok(())
    }
}

/// Object-store-backed settings: which bucket/container to talk to, an
/// optional endpoint override for S3-compatible test/self-hosted
/// endpoints (MinIO, LocalStack), and the default presigned-URL TTL.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub presign_ttl: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            bucket: "ev-receipts".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            presign_ttl: Duration::from_secs(3600),
        }
    }
}

impl ScanConfig {
    pub fn from_env() -> Self {
        Self {
            bucket: env::var("RECEIPT_STORE_BUCKET").unwrap_or_else(|_| "ev-receipts".to_string()),
            region: env::var("RECEIPT_STORE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint: env::var("RECEIPT_STORE_ENDPOINT").ok(),
            presign_ttl: Duration::from_secs(env_parse("RECEIPT_PRESIGN_TTL_SECONDS", 3600)),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.bucket.trim().is_empty() {
            return Err(EngineError::config("bucket must not be empty"));
        }
        Ok(())
    }
}

/// Top-level engine configuration, constructed once at startup and shared
/// with every component that needs it.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub query_cache: CacheConfig,
    pub scanner: ScannerConfig,
    pub default_page_size: i64,
    pub max_page_size: i64,
    pub presign_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            query_cache: CacheConfig::default(),
            scanner: ScannerConfig::default(),
            default_page_size: 50,
            max_page_size: 100,
            presign_ttl: Duration::from_secs(3600),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            query_cache: CacheConfig::from_env("RECEIPT_QUERY"),
            scanner: ScannerConfig::from_env(),
            default_page_size: env_parse("RECEIPT_DEFAULT_PAGE_SIZE", 50),
            max_page_size: env_parse("RECEIPT_MAX_PAGE_SIZE", 100),
            presign_ttl: Duration::from_secs(env_parse("RECEIPT_PRESIGN_TTL_SECONDS", 3600)),
        }
    }

    /// Validates the scanner concurrency only. `query_cache.max_size == 0`
    /// is not an error here: at the engine level it is the documented
    /// signal to run with query caching disabled (§4.10); it is
    /// [`CacheConfig::validate`] — invoked by the bare [`crate::cache::TtlLruCache`]
    /// primitive — that treats a zero capacity as a `ConfigError`.
    pub fn validate(&self) -> Result<(), EngineError> {
        self.scanner.validate()?;
        Ok(())
    }

    /// Clamps a caller-supplied `limit`: `limit <= 0` becomes the default;
    /// `limit > max` is clamped down.
    pub fn clamp_limit(&self, limit: Option<i64>) -> i64 {
        match limit {
            None => self.default_page_size,
            Some(l) if l <= 0 => self.default_page_size,
            Some(l) if l > self.max_page_size => self.max_page_size,
            Some(l) => l,
        }
    }
}
