/// Utility functions for timestamps and formatting
use time::{format_description, OffsetDateTime};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    match format_description::parse("[day].[month].[year] - [hour]:[minute]:[second]") {
        Ok(format) => dt.format(&format).unwrap_or_else(|_| dt.to_string()),
        Err(_) => dt.to_string(),
    }
}

/// Current Unix time in whole seconds, as carried in gateway messages
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Shorten a hex string for log lines
pub fn preview(data: &str, max_chars: usize) -> &str {
    match data.char_indices().nth(max_chars) {
        Some((end, _)) => &data[..end],
        None => data,
    }
}
