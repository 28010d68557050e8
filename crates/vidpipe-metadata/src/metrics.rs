//! Metadata store metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "vidpipe_metadata_requests_total";
    pub const REQUEST_DURATION_SECONDS: &str = "vidpipe_metadata_request_duration_seconds";
    pub const RETRIES_TOTAL: &str = "vidpipe_metadata_retries_total";
}

/// Record a metadata store request.
pub fn record_request(operation: &str, outcome: &str, duration_secs: f64) {
    let labels = [
        ("operation", operation.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a retry attempt.
pub fn record_retry(operation: &str) {
    let labels = [("operation", operation.to_string())];
    counter!(names::RETRIES_TOTAL, &labels).increment(1);
}
