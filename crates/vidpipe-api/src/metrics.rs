//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "vidpipe_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vidpipe_http_request_duration_seconds";
    pub const VIDEOS_UPLOADED_TOTAL: &str = "vidpipe_videos_uploaded_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a successful video upload.
pub fn record_video_uploaded() {
    counter!(names::VIDEOS_UPLOADED_TOTAL).increment(1);
}

/// Collapse per-video path segments so labels stay low-cardinality.
fn sanitize_path(path: &str) -> String {
    match path.strip_prefix("/api/videos/") {
        Some(rest) if !rest.is_empty() => "/api/videos/:video_id".to_string(),
        _ => path.to_string(),
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    record_http_request(&method, &path, status, start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/api/videos/550e8400-e29b-41d4-a716-446655440000"),
            "/api/videos/:video_id"
        );
        assert_eq!(sanitize_path("/api/videos"), "/api/videos");
        assert_eq!(sanitize_path("/healthz"), "/healthz");
    }
}
