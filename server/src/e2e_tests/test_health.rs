//! End-to-end tests for the health endpoints.

use axum::http::StatusCode;
use serde_json::json;

use crate::e2e_tests::helpers::TestApp;

#[tokio::test]
async fn test_root_health() {
    let app = TestApp::new();

    let response = app.get("/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "status": "ok", "message": "Healthy" }));
}

#[tokio::test]
async fn test_health_v1() {
    let app = TestApp::new();

    let response = app.get("/v1.0/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_health_ok_when_store_unavailable() {
    let app = TestApp::new();
    app.store.set_unavailable(true);

    assert_eq!(app.get("/").await.status, StatusCode::OK);

    let response = app.get("/v1.0/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();
    assert_eq!(app.get("/v2.0/me").await.status, StatusCode::NOT_FOUND);
}
