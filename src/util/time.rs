//! Timing and rate helpers for the report layer

use std::time::Duration;

/// Calculate a rate (operations or blocks per second) from a count and span.
pub fn calculate_rate(operations: u64, span: Duration) -> f64 {
    let seconds = span.as_secs_f64();
    if seconds > 0.0 {
        operations as f64 / seconds
    } else {
        0.0
    }
}

/// Calculate throughput in bytes per second.
pub fn calculate_throughput(bytes: u64, span: Duration) -> f64 {
    let seconds = span.as_secs_f64();
    if seconds > 0.0 {
        bytes as f64 / seconds
    } else {
        0.0
    }
}

/// Convert a duration to milliseconds as a floating point number.
///
/// The report prints response times in ms/block like the original tool.
pub fn as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1_000.0
}
