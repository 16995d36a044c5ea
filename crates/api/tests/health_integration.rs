//! Integration tests for health, request id and metrics endpoints.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use common::{create_test_app, event_uri, Call};
use meeting_scheduler_api::middleware::init_metrics;
use tower::ServiceExt;

#[tokio::test]
async fn test_health_check_on_memory_backend() {
    let app = create_test_app().await;

    let (status, body) = Call::get("/api/health").send(&app).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["database"]["connected"], true);
    assert_eq!(body["directory_cache"]["entries"], 0);
}

#[tokio::test]
async fn test_health_reports_cached_listings() {
    let app = create_test_app().await;
    let (status, _) = Call::get(event_uri("/speakers"))
        .as_user("att-alice")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = Call::get("/api/health").send(&app).await;
    assert_eq!(body["directory_cache"]["entries"], 1);
    assert_eq!(app.cache.len(), 1);
}

#[tokio::test]
async fn test_live_and_ready() {
    let app = create_test_app().await;

    let (status, body) = Call::get("/api/health/live").send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");

    let (status, body) = Call::get("/api/health/ready").send(&app).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/health/live")
                .header("X-Request-ID", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let app = create_test_app().await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/health/live")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let request_id = response.headers()["x-request-id"].to_str().unwrap();
    assert!(!request_id.is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    // Another test binary may already own the global recorder.
    let _ = init_metrics();
    let app = create_test_app().await;
    let (status, _) = Call::get(event_uri("/meetings"))
        .as_user("att-alice")
        .send(&app)
        .await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("http_requests_total"));
}
