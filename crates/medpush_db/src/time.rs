//! Timestamp storage helpers.
//!
//! Timestamps are stored as Unix milliseconds in INTEGER columns so range
//! filters and ordering compare plain integers.

use crate::error::DbError;
use chrono::{DateTime, Utc};

pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub fn from_millis(millis: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| DbError::DecodeError(format!("timestamp out of range: {}", millis)))
}

/// Builds `$start, $start+1, ...` placeholders for an `IN (...)` list.
pub(crate) fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn millis_round_trip_keeps_millisecond_precision() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        assert_eq!(from_millis(to_millis(at)).unwrap(), at);
    }

    #[test]
    fn placeholders_are_numbered_from_start() {
        assert_eq!(placeholders(2, 3), "$2, $3, $4");
        assert_eq!(placeholders(1, 0), "");
    }
}
