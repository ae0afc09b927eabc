//! Deterministic index key scheme. Keys are computed, not stored.

use uuid::Uuid;

pub fn pdf_key(session_id: &str) -> String {
    format!("pdfs/{session_id}.pdf")
}

pub fn metadata_key(session_id: &str) -> String {
    format!("metadata/{session_id}.json")
}

/// `index/dt={YYYY-MM-DD}/`
pub fn index_prefix(payment_date: &str) -> String {
    format!("index/dt={payment_date}/")
}

/// `{prefix}part-{uuid}.ndjson.gz` — one part per write.
pub fn index_part_key(payment_date: &str) -> String {
    format!("{}part-{}.ndjson.gz", index_prefix(payment_date), Uuid::new_v4())
}

/// True iff `key` matches `index/dt=*/part-*.ndjson.gz`.
pub fn is_index_part_key(key: &str) -> bool {
    let Some(rest) = key.strip_prefix("index/dt=") else {
        return false;
    };
    let Some((date, tail)) = rest.split_once('/') else {
        return false;
    };
    if date.is_empty() {
        return false;
    }
    let Some(name) = tail.strip_prefix("part-") else {
        return false;
    };
    name.ends_with(".ndjson.gz") && name.len() > ".ndjson.gz".len()
}

/// Bounded directory fan-in hint, derived as `hash(card_last_four) mod
/// 100`. Not used to route storage — the date partition remains
/// authoritative — but exposed for implementations that want to
/// sub-shard within a date.
pub fn card_shard(card_last_four: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    let mut hasher = DefaultHasher::new();
    card_last_four.hash(&mut hasher);
    hasher.finish() % 100
}
