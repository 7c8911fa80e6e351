//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current wall-clock time as fractional seconds since the Unix epoch
///
/// This is the time base used for fusion cycles and staleness checks.
pub fn now_seconds() -> f64 {
    to_seconds(now())
}

/// Convert a UTC timestamp to fractional seconds since the Unix epoch
pub fn to_seconds(timestamp: DateTime<Utc>) -> f64 {
    timestamp.timestamp_micros() as f64 / 1_000_000.0
}
