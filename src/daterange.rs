//! Clamped day enumeration over a query's date range, and the opaque
//! pagination cursor used to resume a paged query.

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};

const MAX_SPAN_DAYS: i64 = 365;

/// `DateRange(from?, to?)`: `end` defaults to today, `start`
/// defaults to `end - 365 days`, and any wider span is clamped down to
/// 365 days ending at `end`.
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(from: Option<&str>, to: Option<&str>) -> Result<Self, chrono::ParseError> {
        let end = match to {
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")?,
            None => Utc::now().date_naive(),
        };
        let mut start = match from {
            Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")?,
            None => end - ChronoDuration::days(MAX_SPAN_DAYS),
        };
        if (end - start).num_days() > MAX_SPAN_DAYS {
            start = end - ChronoDuration::days(MAX_SPAN_DAYS);
        }
        Ok(Self { start, end })
    }

    /// Every calendar date from `start` to `end` inclusive, ascending,
    /// formatted `YYYY-MM-DD`.
    pub fn to_array(&self) -> Vec<String> {
        let mut dates = Vec::new();
        let mut cursor = self.start;
        while cursor <= self.end {
            dates.push(cursor.format("%Y-%m-%d").to_string());
            cursor += ChronoDuration::days(1);
        }
        dates
    }
}

/// Opaque `{payment_date}:{session_id}` pagination cursor. `session_id`
/// may itself contain colons, so decoding splits on the first colon only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub payment_date: String,
    pub session_id: String,
}

impl Cursor {
    pub fn encode(payment_date: &str, session_id: &str) -> String {
        format!("{payment_date}:{session_id}")
    }

    /// Invalid or absent input decodes to `None`, which callers treat as
    /// "start from index 0".
    pub fn decode(raw: Option<&str>) -> Option<Cursor> {
        let raw = raw?;
        let (date, session_id) = raw.split_once(':')?;
        if date.is_empty() || session_id.is_empty() {
            return None;
        }
        Some(Cursor {
            payment_date: date.to_string(),
            session_id: session_id.to_string(),
        })
    }
}
