//! Canonical data model: the receipt record and the query/response shapes
//! built around it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The canonical, immutable index record for a single receipt.
///
/// `amount_pence` and the three derived keys are absent on the metadata a
/// caller submits to the write pipeline and present on everything the
/// engine persists or returns; `PartialReceiptMetadata` below models the
/// former, this type the latter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptMetadata {
    pub session_id: String,
    pub consumer_id: String,
    pub receipt_number: String,
    /// ISO calendar date, `YYYY-MM-DD`. Determines the index shard.
    pub payment_date: String,
    /// 4-character numeric suffix, leading zeros preserved.
    pub card_last_four: String,
    /// Display string with currency symbol, e.g. `£14.06`.
    pub amount: String,
    /// Integer minor units, authoritative for numeric filters. Optional on
    /// read to accommodate legacy records written before this field
    /// existed; always populated on write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_pence: Option<i64>,
    pub pdf_key: String,
    pub metadata_key: String,
    pub created_at: DateTime<Utc>,
}

/// The metadata a caller submits to [`crate::pipeline::store`], lacking the
/// fields the pipeline itself derives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialReceiptMetadata {
    pub session_id: String,
    pub consumer_id: String,
    pub receipt_number: String,
    pub payment_date: String,
    pub card_last_four: String,
    pub amount: String,
}

/// Result of a successful write: the three keys the transaction produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub pdf_key: String,
    pub metadata_key: String,
    pub index_key: String,
}

/// A filtered, paginated query against the receipt index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last_four: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,
    /// Major units (e.g. `20.00`), inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl ReceiptQuery {
    /// The required-field gate: at least one of these five fields must be
    /// present or the engine refuses to scan.
    pub fn has_required_field(&self) -> bool {
        self.session_id.is_some()
            || self.consumer_id.is_some()
            || self.receipt_number.is_some()
            || self.date_from.is_some()
            || self.card_last_four.is_some()
    }
}

/// A page of query results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub records: Vec<ReceiptMetadata>,
    pub scanned_dates: Vec<String>,
    pub total_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub page_size: i64,
}
