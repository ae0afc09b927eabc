//! A configurable `ObjectStore` wrapper for exercising rollback: delegates
//! every operation to an inner store except `put`/`put_opts`, which can be
//! configured to fail on the Nth call or on calls whose path matches a
//! prefix.

use std::ops::Range;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore, PutMultipartOpts,
    PutOptions, PutPayload, PutResult, Result,
};

#[derive(Debug, Clone, Default)]
pub struct FailConfig {
    /// Fail on the Nth put (1-indexed). `None` never fails.
    pub fail_on_put: Option<usize>,
    pub put_count: usize,
    /// Only count/fail puts whose path starts with this prefix.
    pub fail_path_prefix: Option<String>,
    pub put_order: Vec<String>,
}

#[derive(Debug)]
pub struct FailingStore {
    inner: Arc<dyn ObjectStore>,
    config: Arc<RwLock<FailConfig>>,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            config: Arc::new(RwLock::new(FailConfig::default())),
        }
    }

    pub fn config(&self) -> &Arc<RwLock<FailConfig>> {
        &self.config
    }

    fn should_fail_put(&self, path: &Path) -> bool {
        let mut config = self.config.write().unwrap();
        if let Some(prefix) = config.fail_path_prefix.clone() {
            if !path.as_ref().starts_with(&prefix) {
                return false;
            }
        }
        config.put_count += 1;
        matches!(config.fail_on_put, Some(n) if config.put_count == n)
    }

    fn make_error(&self, path: &Path) -> object_store::Error {
        object_store::Error::Generic {
            store: "FailingStore",
            source: format!("injected failure for path: {path}").into(),
        }
    }

    fn record_put(&self, path: &Path) {
        self.config.write().unwrap().put_order.push(path.to_string());
    }
}

impl std::fmt::Display for FailingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FailingStore({})", self.inner)
    }
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put(&self, location: &Path, payload: PutPayload) -> Result<PutResult> {
        if self.should_fail_put(location) {
            return Err(self.make_error(location));
        }
        let result = self.inner.put(location, payload).await?;
        self.record_put(location);
        Ok(result)
    }

    async fn put_opts(&self, location: &Path, payload: PutPayload, opts: PutOptions) -> Result<PutResult> {
        if self.should_fail_put(location) {
            return Err(self.make_error(location));
        }
        let result = self.inner.put_opts(location, payload, opts).await?;
        self.record_put(location);
        Ok(result)
    }

    async fn put_multipart(&self, location: &Path) -> Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart(location).await
    }

    async fn put_multipart_opts(&self, location: &Path, opts: PutMultipartOpts) -> Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get(&self, location: &Path) -> Result<GetResult> {
        self.inner.get(location).await
    }

    async fn get_opts(&self, location: &Path, options: GetOptions) -> Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn get_range(&self, location: &Path, range: Range<usize>) -> Result<Bytes> {
        self.inner.get_range(location, range).await
    }

    async fn get_ranges(&self, location: &Path, ranges: &[Range<usize>]) -> Result<Vec<Bytes>> {
        self.inner.get_ranges(location, ranges).await
    }

    async fn head(&self, location: &Path) -> Result<ObjectMeta> {
        self.inner.head(location).await
    }

    async fn delete(&self, location: &Path) -> Result<()> {
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    fn list_with_offset(&self, prefix: Option<&Path>, offset: &Path) -> BoxStream<'_, Result<ObjectMeta>> {
        self.inner.list_with_offset(prefix, offset)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        self.inner.copy(from, to).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.inner.rename(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }

    async fn rename_if_not_exists(&self, from: &Path, to: &Path) -> Result<()> {
        self.inner.rename_if_not_exists(from, to).await
    }
}
