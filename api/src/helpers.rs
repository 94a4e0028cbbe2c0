//! Shared helpers for turning log cells into absolute instants.
//!
//! Boat logs come from different exporters, so the timestamp column may be
//! RFC 3339 (with an explicit offset) or a naive date-time. Naive values are
//! taken as UTC so every sample lands on one total order.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Naive formats tried in order after RFC 3339.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S%.f",
];

/// Parse a timestamp cell into a UTC instant.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let dt = parse_timestamp("2025-01-19T04:13:55+01:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 19, 3, 13, 55).unwrap());
    }

    #[test]
    fn test_parse_naive_space_separated() {
        let dt = parse_timestamp("2025-01-19 03:13:55").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 19, 3, 13, 55).unwrap());
    }

    #[test]
    fn test_parse_naive_fractional_seconds() {
        let dt = parse_timestamp("2025-01-19 03:13:55.250").unwrap();
        assert_eq!(dt.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_naive_t_separated() {
        assert!(parse_timestamp("2025-01-19T03:13:55").is_some());
    }

    #[test]
    fn test_parse_day_first() {
        let dt = parse_timestamp("19/01/2025 03:13:55").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 1, 19, 3, 13, 55).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp("not a time"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("2025-13-40 99:00:00"), None);
    }
}
