//! Health Check API Tests

use axum::http::StatusCode;

use crate::common::{body_json, body_text, TestApp};

/// Test basic health check endpoint returns 200 OK
#[tokio::test]
async fn test_health_check_returns_ok() {
    let app = TestApp::new();

    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

/// Test liveness probe endpoint
#[tokio::test]
async fn test_liveness_probe() {
    let app = TestApp::new();

    let response = app.get("/health/live").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "alive");
}

/// Readiness reports the registry counts
#[tokio::test]
async fn test_readiness_probe() {
    let app = TestApp::new();

    let response = app.get("/health/ready").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["notifications"]["totalConnections"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new();
    app.get("/health").await;

    let response = app.get("/metrics").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("blog_notifier_http_requests_total"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new();
    assert_eq!(app.get("/nope").await.status(), StatusCode::NOT_FOUND);
}
