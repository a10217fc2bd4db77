//! Date formatters for [`JsonParser::date_attribute`](crate::JsonParser::date_attribute).
//!
//! Each formatter turns an intermediate JSON value into a UTC timestamp, or
//! returns `None` when the value cannot be interpreted.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Parses an RFC 3339 / ISO 8601 timestamp (`2024-01-15T10:30:00Z`).
pub fn rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Interprets an integer as seconds since the Unix epoch.
pub fn unix_seconds(value: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(value, 0).single()
}

/// Interprets an integer as milliseconds since the Unix epoch.
pub fn unix_millis(value: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value).single()
}

/// Returns a formatter for a `chrono` format string, interpreted as UTC.
///
/// ```ignore
/// let at = parser.date_attribute("at", formatters::pattern("%Y-%m-%d %H:%M:%S"))?;
/// ```
pub fn pattern(format: &str) -> impl Fn(String) -> Option<DateTime<Utc>> + '_ {
    move |value| {
        NaiveDateTime::parse_from_str(&value, format)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_rfc3339() {
        let dt = rfc3339("2024-01-15T10:30:00+02:00").unwrap();
        assert_eq!(dt.hour(), 8);
        assert!(rfc3339("15/01/2024").is_none());
    }

    #[test]
    fn test_unix() {
        assert_eq!(unix_seconds(0).unwrap().year(), 1970);
        assert_eq!(unix_millis(1_700_000_000_000).unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_pattern() {
        let format = pattern("%Y-%m-%d %H:%M:%S");
        let dt = format("2024-03-01 12:00:00".to_string()).unwrap();
        assert_eq!(dt.month(), 3);
        assert!(format("not a date".to_string()).is_none());
    }
}
