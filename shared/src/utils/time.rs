//! Time-related utilities

use chrono::{TimeZone, Utc};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current system time in nanoseconds since UNIX epoch
pub fn system_time_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX epoch")
        .as_nanos() as u64
}

/// Get the current system time in milliseconds since UNIX epoch
pub fn system_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX epoch")
        .as_millis() as u64
}

/// Render an epoch-nanosecond timestamp as RFC 3339 (UTC).
pub fn rfc3339(nanos: u64) -> String {
    let secs = (nanos / 1_000_000_000) as i64;
    let subsec = (nanos % 1_000_000_000) as u32;
    match Utc.timestamp_opt(secs, subsec) {
        chrono::LocalResult::Single(dt) => dt.to_rfc3339(),
        _ => format!("{}ns", nanos),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time() {
        let nanos = system_time_nanos();
        let millis = system_time_millis();

        // Basic sanity check
        assert!(nanos > 0);
        assert!(millis > 1_600_000_000_000); // After 2020
    }

    #[test]
    fn test_rfc3339_rendering() {
        let rendered = rfc3339(1_000_000_000);
        assert!(rendered.starts_with("1970-01-01T00:00:01"));
    }
}
