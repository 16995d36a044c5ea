//! Prometheus metrics: HTTP traffic plus scheduling business counters.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

/// Route label for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Records `http_requests_total` and `http_request_duration_seconds`.
///
/// Labels use the route template (`/api/v1/events/:instance_id/...`) so event
/// ids and meeting codes never become label values.
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = method_to_str(req.method());
    let route = route_label(req.extensions().get::<MatchedPath>());

    let response = next.run(req).await;

    let status = response.status();
    counter!(
        "http_requests_total",
        "method" => method,
        "path" => route.clone(),
        "status" => status.as_u16().to_string(),
        "class" => status_class(status.as_u16())
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => route
    )
    .record(start.elapsed().as_secs_f64());

    response
}

fn route_label(matched: Option<&MatchedPath>) -> String {
    matched
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// Convert HTTP method to string for metric labels.
fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::PATCH => "PATCH",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        _ => "OTHER",
    }
}

/// Count a meeting lifecycle transition (`requested`, `confirmed`, ...).
pub fn record_meeting_transition(status: domain::models::MeetingStatus) {
    counter!("meeting_transitions_total", "status" => status.to_string()).increment(1);
}

/// Count one outcome of a draft batch.
pub fn record_draft_items(action: &'static str, succeeded: usize, failed: usize) {
    counter!("draft_items_total", "action" => action, "outcome" => "success")
        .increment(succeeded as u64);
    counter!("draft_items_total", "action" => action, "outcome" => "failure")
        .increment(failed as u64);
}

/// Count a rejected operation by error class.
pub fn record_scheduling_error(kind: &'static str) {
    counter!("scheduling_errors_total", "kind" => kind).increment(1);
}

/// `GET /metrics`: Prometheus text exposition.
///
/// Answers 503 until [`init_metrics`] has installed the recorder.
pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS_HANDLE.get() {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        ),
    }
}

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Errors raised while installing the Prometheus recorder.
#[derive(Debug, thiserror::Error)]
pub enum MetricsInitError {
    #[error(transparent)]
    Build(#[from] metrics_exporter_prometheus::BuildError),

    #[error("Prometheus handle already initialized")]
    AlreadyInitialized,
}

/// Installs the global Prometheus recorder; call once at startup.
pub fn init_metrics() -> Result<(), MetricsInitError> {
    // Buckets cover both request and store-call latencies.
    let handle = PrometheusBuilder::new()
        .set_buckets(&[0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0])?
        .install_recorder()?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsInitError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_labels() {
        assert_eq!(method_to_str(&Method::GET), "GET");
        assert_eq!(method_to_str(&Method::DELETE), "DELETE");
        assert_eq!(method_to_str(&Method::TRACE), "OTHER");
    }

    #[test]
    fn test_status_class() {
        assert_eq!(status_class(200), "2xx");
        assert_eq!(status_class(409), "4xx");
        assert_eq!(status_class(503), "5xx");
    }

    #[test]
    fn test_unmatched_route_label() {
        assert_eq!(route_label(None), UNMATCHED_ROUTE);
    }

    #[test]
    fn test_business_counters_without_recorder() {
        // No recorder installed: recording is a no-op and must not panic
        record_meeting_transition(domain::models::MeetingStatus::Confirmed);
        record_draft_items("save", 2, 1);
        record_scheduling_error("Occupied");
    }
}
