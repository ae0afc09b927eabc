//! The transactional write pipeline: validate everything up front, PUT
//! in a fixed order, and roll back whatever already landed if a later
//! PUT fails.

use bytes::Bytes;

use shared::EngineError;
use tracing::{info, instrument};

use crate::index;
use crate::keys;
use crate::metrics;
use crate::model::{PartialReceiptMetadata, ReceiptMetadata, WriteResult};
use crate::rollback;
use crate::store::Store;

/// Largest NDJSON line the index will accept for a single record: a
/// pathologically long `receipt_number` or `consumer_id` should fail
/// validation rather than silently bloat a part file.
const MAX_RECORD_LINE_BYTES: usize = 16 * 1024;

fn validate(partial: &PartialReceiptMetadata) -> Result<(), EngineError> {
    if partial.session_id.trim().is_empty() {
        return Err(EngineError::validation("session_id", "must not be empty"));
    }
    if partial.consumer_id.trim().is_empty() {
        return Err(EngineError::validation("consumer_id", "must not be empty"));
    }
    if partial.receipt_number.trim().is_empty() {
        return Err(EngineError::validation("receipt_number", "must not be empty"));
    }
    if chrono::NaiveDate::parse_from_str(&partial.payment_date, "%Y-%m-%d").is_err() {
        return Err(EngineError::validation("payment_date", "must be YYYY-MM-DD"));
    }
    if partial.card_last_four.len() != 4 || !partial.card_last_four.chars().all(|c| c.is_ascii_digit()) {
        return Err(EngineError::validation("card_last_four", "must be 4 digits"));
    }
    crate::money::Money::parse(&partial.amount)
        .map_err(|_| EngineError::validation("amount", "must be a parseable currency amount"))?;
    Ok(())
}

/// Runs the five-step write transaction:
/// 1. validate `partial` in full before any side effect;
/// 2. PUT the PDF bytes at the deterministic key;
/// 3. PUT the metadata JSON at the deterministic key, rolling back step 2
///    on failure;
/// 4. write one new index part file under the payment date's partition,
///    rolling back steps 2–3 on failure;
/// 5. return the three keys produced.
#[instrument(skip(store, pdf_bytes), fields(session_id = %partial.session_id))]
pub async fn store(
    store: &Store,
    pdf_bytes: Bytes,
    partial: PartialReceiptMetadata,
) -> Result<WriteResult, EngineError> {
    validate(&partial)?;

    let amount_pence = crate::money::Money::parse(&partial.amount)?.to_minor();

    let record = ReceiptMetadata {
        session_id: partial.session_id.clone(),
        consumer_id: partial.consumer_id.clone(),
        receipt_number: partial.receipt_number.clone(),
        payment_date: partial.payment_date.clone(),
        card_last_four: partial.card_last_four.clone(),
        amount: partial.amount.clone(),
        amount_pence: Some(amount_pence),
        pdf_key: keys::pdf_key(&partial.session_id),
        metadata_key: keys::metadata_key(&partial.session_id),
        created_at: chrono::Utc::now(),
    };

    let metadata_json = serde_json::to_vec(&record)
        .map_err(|e| EngineError::validation("metadata", format!("failed to serialize record: {e}")))?;
    if metadata_json.len() > MAX_RECORD_LINE_BYTES {
        return Err(index::oversized_line_error(&record.metadata_key, MAX_RECORD_LINE_BYTES, metadata_json.len()));
    }

    // Step 2: PDF.
    store.put(&record.pdf_key, pdf_bytes, "application/pdf").await?;

    // Step 3: metadata, rolling back the PDF on failure.
    if let Err(e) = store.put(&record.metadata_key, Bytes::from(metadata_json), "application/json").await {
        metrics::record_write_rolled_back();
        return Err(rollback::rollback_and_return(store, &[record.pdf_key.clone()], e).await);
    }

    // Step 4: one new index part file, rolling back the PDF and metadata
    // on failure.
    let prefix = index::build_prefix(&record.payment_date);
    let index_key = match index::write_part(store, &record, &prefix).await {
        Ok(key) => key,
        Err(e) => {
            metrics::record_write_rolled_back();
            let written = vec![record.pdf_key.clone(), record.metadata_key.clone()];
            return Err(rollback::rollback_and_return(store, &written, e).await);
        }
    };

    metrics::record_write_committed();
    info!(
        operation = "write_transaction",
        session_id = %record.session_id,
        pdf_key = %record.pdf_key,
        metadata_key = %record.metadata_key,
        index_key = %index_key,
        "receipt written"
    );

    Ok(WriteResult {
        pdf_key: record.pdf_key,
        metadata_key: record.metadata_key,
        index_key,
    })
}
