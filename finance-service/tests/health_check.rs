mod common;

use axum::http::StatusCode;
use common::TestApp;

#[tokio::test]
async fn test_health_check_works() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "finance-service");

    app.cleanup().await;
}

#[tokio::test]
async fn test_readiness_check_works() {
    let app = TestApp::spawn().await;

    let (status, _) = app.get("/ready", None).await;
    assert_eq!(status, StatusCode::OK);

    app.cleanup().await;
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() {
    let app = TestApp::spawn().await;

    // Body is Prometheus text, not JSON
    let (status, body) = app.get("/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());

    app.cleanup().await;
}
