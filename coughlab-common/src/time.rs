//! Timestamp utilities

use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;

/// Format used in saved recording names (`recording_<stamp>.<ext>`)
pub const RECORDING_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Format of the `timestamp` field in prediction records
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get current local timestamp
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// `YYYYMMDD_HHMMSS` stamp for recording file names
pub fn recording_stamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format(RECORDING_STAMP_FORMAT).to_string()
}

/// `YYYY-MM-DD HH:MM:SS` timestamp for prediction records
pub fn display_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    at.format(DISPLAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }

    #[test]
    fn test_recording_stamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(recording_stamp(&at), "20240307_090502");
    }

    #[test]
    fn test_display_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 58).unwrap();
        assert_eq!(display_timestamp(&at), "2024-12-31 23:59:58");
    }
}
