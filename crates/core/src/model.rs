//! Shared data model for the history search pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One visit from a browser history database.
///
/// Immutable once produced by the history source. `visited_at` is in
/// microseconds since the Unix epoch, which is what the browsers store
/// (Chrome's 1601-based clock is converted at the source).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub url: String,
    /// Page title as recorded by the browser; may be empty.
    pub title: String,
    pub visited_at: i64,
}

/// A document that satisfied the keyword query, joined with its history
/// metadata. Created once per query execution and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub url: String,
    pub title: String,
    /// Visit time in microseconds since the Unix epoch.
    pub timestamp: i64,
    /// Human-readable rendering of `timestamp`.
    pub date: String,
    pub match_count: usize,
    /// One snippet per keyword that occurred, in query order.
    pub contexts: Vec<String>,
}

impl MatchRecord {
    /// Render a visit timestamp for report output.
    pub fn format_date(micros: i64) -> String {
        DateTime::<Utc>::from_timestamp_micros(micros)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
