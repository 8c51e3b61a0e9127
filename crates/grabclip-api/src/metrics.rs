//! Prometheus metrics for the server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "grabclip_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "grabclip_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "grabclip_http_requests_in_flight";

    // Download metrics
    pub const DOWNLOADS_TOTAL: &str = "grabclip_downloads_total";
    pub const DOWNLOAD_DURATION_SECONDS: &str = "grabclip_download_duration_seconds";
    pub const SWEEP_REMOVED_TOTAL: &str = "grabclip_sweep_removed_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", route_label(path).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record one submission outcome (`success`, `invalid`, `failed`).
///
/// Duration covers fetching and response setup, not body streaming.
pub fn record_download(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];
    counter!(names::DOWNLOADS_TOTAL, &labels).increment(1);
    histogram!(names::DOWNLOAD_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record files removed by a sweep.
pub fn record_sweep(removed: u32) {
    if removed > 0 {
        counter!(names::SWEEP_REMOVED_TOTAL).increment(u64::from(removed));
    }
}

/// Collapse unknown paths so scanners cannot blow up label cardinality.
fn route_label(path: &str) -> &str {
    match path {
        "/" | "/download" | "/health" | "/healthz" | "/metrics" => path,
        _ => "other",
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
