//! Typed object-store client wrapper.
//!
//! The engine never depends on a concrete backend; every component holds
//! an `Arc<dyn ObjectStore>` (the `object_store` crate's trait, which
//! backs S3/GCS/Azure/local/in-memory stores interchangeably). Live
//! deployments wire an S3-compatible backend via [`build_s3`]; tests wire
//! `object_store::memory::InMemory` directly, or the failure-injecting
//! double in `tests/support`.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use object_store::path::Path;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use shared::{from_store_error, EngineError};

use crate::pushdown::PushdownExecutor;

/// Thin typed wrapper over `Arc<dyn ObjectStore>` — every method maps the
/// underlying `object_store::Error` into the engine's taxonomy at the
/// boundary, so nothing above this module deals in store-crate errors.
/// Optionally carries a [`PushdownExecutor`] for backends that expose a
/// server-side SQL-over-objects facility; its absence means every scan
/// takes the client-side fallback path.
#[derive(Clone)]
pub struct Store {
    inner: Arc<dyn ObjectStore>,
    pushdown: Option<Arc<dyn PushdownExecutor>>,
}

impl Store {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self { inner, pushdown: None }
    }

    /// Attaches a pushdown executor, enabling server-side predicate
    /// evaluation for this store's scans.
    pub fn with_pushdown(mut self, executor: Arc<dyn PushdownExecutor>) -> Self {
        self.pushdown = Some(executor);
        self
    }

    pub fn pushdown_executor(&self) -> Option<&Arc<dyn PushdownExecutor>> {
        self.pushdown.as_ref()
    }

    pub async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<(), EngineError> {
        let path = Path::from(key);
        let attributes = Attributes::from_iter([(Attribute::ContentType, content_type.into())]);
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };
        self.inner
            .put_opts(&path, PutPayload::from_bytes(bytes), opts)
            .await
            .map_err(|e| from_store_error("put", key, e))?;
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<Bytes, EngineError> {
        let path = Path::from(key);
        let result = self
            .inner
            .get(&path)
            .await
            .map_err(|e| from_store_error("get", key, e))?;
        result
            .bytes()
            .await
            .map_err(|e| from_store_error("get", key, e))
    }

    pub async fn delete(&self, key: &str) -> Result<(), EngineError> {
        let path = Path::from(key);
        match self.inner.delete(&path).await {
            Ok(()) => Ok(()),
            // Deleting an already-absent key is not a failure — rollback
            // must tolerate at-least-once invocation.
            Err(e) if EngineError::is_not_found(&e) => Ok(()),
            Err(e) => Err(from_store_error("delete", key, e)),
        }
    }

    /// Lists every key under `prefix`, non-recursively constrained only by
    /// the prefix itself (object stores have no directories).
    pub async fn list(&self, prefix: &str) -> Result<Vec<String>, EngineError> {
        use futures::StreamExt;
        let path = Path::from(prefix);
        let mut stream = self.inner.list(Some(&path));
        let mut keys = Vec::new();
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(|e| from_store_error("list", prefix, e))?;
            keys.push(meta.location.to_string());
        }
        Ok(keys)
    }
}

/// Builds an S3-compatible store from a [`crate::config::ScanConfig`],
/// optionally against a non-AWS endpoint (MinIO, LocalStack, or any
/// S3-compatible object store's SQL-over-objects facility).
pub fn build_s3(config: &crate::config::ScanConfig) -> Result<Arc<dyn ObjectStore>, EngineError> {
    use object_store::aws::AmazonS3Builder;

    config.validate()?;
    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(&config.bucket)
        .with_region(&config.region);
    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint).with_allow_http(true);
    }
    let store = builder
        .build()
        .map_err(|e| EngineError::config(format!("failed to build S3 store: {e}")))?;
    Ok(Arc::new(store))
}

/// Presigns a GET URL for `key`, valid for `ttl`. Only backends
/// implementing `object_store::Signer` (S3) support this; callers pass
/// the same concrete handle they built via [`build_s3`] rather than the
/// type-erased `Store`.
pub async fn presign_get<S>(signer: &S, key: &str, ttl: Duration) -> Result<url::Url, EngineError>
where
    S: object_store::signer::Signer,
{
    let path = Path::from(key);
    signer
        .signed_url(http::Method::GET, &path, ttl)
        .await
        .map_err(|e| from_store_error("presign", key, e))
}
