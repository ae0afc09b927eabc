//! Query predicate: the SQL-over-objects pushdown expression sent to a
//! backend's Select facility, and the client-side closure that must agree
//! with it record-for-record.

use crate::model::ReceiptQuery;

/// Builds an `s3object s...` WHERE clause equivalent to [`matches`] for the
/// subset of `query` that can be pushed down. Every field on `ReceiptQuery`
/// participates; there is nothing left for the client-side fallback to
/// cover beyond what this clause already expresses, so [`matches`] exists
/// purely as the client-side equivalent for backends without Select
/// support.
pub fn to_sql_predicate(query: &ReceiptQuery) -> String {
    let mut clauses = Vec::new();
    if let Some(session_id) = &query.session_id {
        clauses.push(format!("s.session_id = '{}'", escape(session_id)));
    }
    if let Some(consumer_id) = &query.consumer_id {
        clauses.push(format!("s.consumer_id = '{}'", escape(consumer_id)));
    }
    if let Some(card_last_four) = &query.card_last_four {
        clauses.push(format!("s.card_last_four = '{}'", escape(card_last_four)));
    }
    if let Some(receipt_number) = &query.receipt_number {
        clauses.push(format!("s.receipt_number = '{}'", escape(receipt_number)));
    }
    if let Some(min) = query.amount_min {
        clauses.push(format!("CAST(s.amount_pence AS FLOAT) >= {:.0}", min * 100.0));
    }
    if let Some(max) = query.amount_max {
        clauses.push(format!("CAST(s.amount_pence AS FLOAT) <= {:.0}", max * 100.0));
    }
    if clauses.is_empty() {
        return "SELECT * FROM s3object s".to_string();
    }
    format!("SELECT * FROM s3object s WHERE {}", clauses.join(" AND "))
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

/// The client-side predicate equivalent to [`to_sql_predicate`], used as a
/// fallback by backends without a Select facility and, in tests, to prove
/// the two stay in lockstep.
pub fn matches(query: &ReceiptQuery, record: &crate::model::ReceiptMetadata) -> bool {
    if let Some(session_id) = &query.session_id {
        if &record.session_id != session_id {
            return false;
        }
    }
    if let Some(consumer_id) = &query.consumer_id {
        if &record.consumer_id != consumer_id {
            return false;
        }
    }
    if let Some(card_last_four) = &query.card_last_four {
        if &record.card_last_four != card_last_four {
            return false;
        }
    }
    if let Some(receipt_number) = &query.receipt_number {
        if &record.receipt_number != receipt_number {
            return false;
        }
    }
    if query.amount_min.is_some() || query.amount_max.is_some() {
        let amount_pence = record_amount_pence(record);
        if let Some(min) = query.amount_min {
            let min_pence = (min * 100.0).round() as i64;
            if amount_pence < min_pence {
                return false;
            }
        }
        if let Some(max) = query.amount_max {
            let max_pence = (max * 100.0).round() as i64;
            if amount_pence > max_pence {
                return false;
            }
        }
    }
    true
}

/// The record's own `amount_pence` if present; otherwise derived from
/// `amount` for legacy records written before that field existed.
fn record_amount_pence(record: &crate::model::ReceiptMetadata) -> i64 {
    record
        .amount_pence
        .unwrap_or_else(|| crate::money::Money::parse(&record.amount).map(|m| m.to_minor()).unwrap_or(0))
}
