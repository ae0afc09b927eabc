//! Storage query façade: the thin, stable surface external callers use to
//! fetch a receipt's PDF, independent of whether they want the raw bytes,
//! a base64 payload, or a time-limited signed URL.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use object_store::signer::Signer;

use shared::EngineError;

use crate::keys;
use crate::store::Store;

pub struct Facade {
    store: Store,
}

impl Facade {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Raw PDF bytes for `session_id`.
    pub async fn get_pdf(&self, session_id: &str) -> Result<bytes::Bytes, EngineError> {
        self.store.get(&keys::pdf_key(session_id)).await
    }

    /// Base64-encoded PDF for callers without binary transport.
    pub async fn get_pdf_base64(&self, session_id: &str) -> Result<String, EngineError> {
        let bytes = self.get_pdf(session_id).await?;
        Ok(BASE64.encode(bytes))
    }
}

/// Presigns a time-limited GET URL for a session's PDF. Separate from
/// [`Facade`] because presigning needs
/// the concrete signer-capable backend handle, not the type-erased
/// `Store` every other façade method uses.
pub async fn get_signed_pdf_url<S: Signer>(
    signer: &S,
    session_id: &str,
    ttl: Duration,
) -> Result<url::Url, EngineError> {
    crate::store::presign_get(signer, &keys::pdf_key(session_id), ttl).await
}
