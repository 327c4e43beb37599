//! Clock access.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local, TimeZone};

/// Current Unix timestamp in seconds, respecting `SOURCE_DATE_EPOCH`.
///
/// When `SOURCE_DATE_EPOCH` is set, its value is returned instead of the real
/// clock so ages and relative times are reproducible in tests.
pub fn get_now() -> i64 {
    std::env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|val| val.parse::<i64>().ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0)
        })
}

/// [`get_now`] as a local date-time, for calendar computations.
pub fn local_now() -> DateTime<Local> {
    Local
        .timestamp_opt(get_now(), 0)
        .single()
        .unwrap_or_else(Local::now)
}
