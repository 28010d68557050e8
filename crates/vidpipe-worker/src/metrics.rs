//! Worker metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const POLL_DURATION_SECONDS: &str = "vidpipe_worker_poll_duration_seconds";
    pub const POLL_ERRORS_TOTAL: &str = "vidpipe_worker_poll_errors_total";
    pub const MESSAGES_PROCESSED_TOTAL: &str = "vidpipe_worker_messages_processed_total";
    pub const PIPELINE_FAILURES_TOTAL: &str = "vidpipe_worker_pipeline_failures_total";
}

/// Record one poll-loop iteration.
pub fn record_poll(duration_secs: f64) {
    histogram!(names::POLL_DURATION_SECONDS).record(duration_secs);
}

/// Record a failed poll-loop iteration.
pub fn record_poll_error() {
    counter!(names::POLL_ERRORS_TOTAL).increment(1);
}

/// Record a handled message by outcome (`ok`, `error`, `invalid`).
pub fn record_message(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::MESSAGES_PROCESSED_TOTAL, &labels).increment(1);
}

/// Record a pipeline failure by stage.
pub fn record_pipeline_failure(stage: &str) {
    let labels = [("stage", stage.to_string())];
    counter!(names::PIPELINE_FAILURES_TOTAL, &labels).increment(1);
}
