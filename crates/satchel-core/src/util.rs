//! Shared time and text helpers used across multiple modules.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;

/// Current UTC time as an RFC 3339 string with millisecond precision.
#[must_use]
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current Unix timestamp in milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse a timestamp string into Unix milliseconds.
///
/// Accepts RFC 3339 values and bare `YYYY-MM-DD` dates (read as UTC
/// midnight). Returns `None` for anything else.
#[must_use]
pub fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Freshness value of a JSON field.
///
/// Strings parse as timestamps, numbers are taken as Unix milliseconds
/// directly. Anything else has no freshness.
#[must_use]
pub fn value_millis(value: &Value) -> Option<i64> {
    match value {
        Value::String(raw) => parse_timestamp_millis(raw),
        Value::Number(number) => number.as_i64(),
        _ => None,
    }
}

/// Normalize optional text by trimming whitespace and removing empties.
#[must_use]
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Check if a string starts with `http://` or `https://`.
#[must_use]
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
#[must_use]
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}
