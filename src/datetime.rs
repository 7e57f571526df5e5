//! Timestamp storage helpers.
//!
//! Timestamps are stored as fixed-width RFC 3339 text in UTC
//! (`2025-01-15T10:30:00.000000Z`) so that SQL string comparison and
//! `ORDER BY` agree with chronological order.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Format a timestamp for storage.
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 and SQLite's `datetime('now')` format
/// (`YYYY-MM-DD HH:MM:SS`, assumed UTC).
pub fn from_db_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
