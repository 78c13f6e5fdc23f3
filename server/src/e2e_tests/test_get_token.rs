//! End-to-end tests for `POST /v1.0/get_token`.

use axum::http::{StatusCode, header};
use serde_json::json;

use crate::e2e_tests::helpers::TestApp;

#[tokio::test]
async fn test_get_token_success() {
    let app = TestApp::new();

    let response = app
        .get_token(&json!({ "username": "testuser", "password": "testpass" }))
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    let token = response.body["access_token"].as_str().expect("access_token");
    assert!(!token.is_empty());
    assert_eq!(token.split('.').count(), 3);
    assert_eq!(response.body["token_type"], "bearer");
}

#[tokio::test]
async fn test_get_token_invalid_credentials() {
    let app = TestApp::new();

    let response = app
        .get_token(&json!({ "username": "testuser", "password": "wrongpass" }))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({ "detail": "Invalid credentials" }));
}

#[tokio::test]
async fn test_get_token_unknown_user_indistinguishable() {
    let app = TestApp::new();

    let wrong_password = app
        .get_token(&json!({ "username": "testuser", "password": "wrongpass" }))
        .await;
    let unknown_user = app
        .get_token(&json!({ "username": "nobody", "password": "testpass" }))
        .await;

    assert_eq!(wrong_password.status, unknown_user.status);
    assert_eq!(wrong_password.body, unknown_user.body);
    assert_eq!(
        wrong_password.headers.get(header::WWW_AUTHENTICATE),
        unknown_user.headers.get(header::WWW_AUTHENTICATE)
    );
}

#[tokio::test]
async fn test_get_token_without_secret() {
    let app = TestApp::without_secret();

    let response = app
        .get_token(&json!({ "username": "testuser", "password": "testpass" }))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body, json!({ "detail": "JWT secret is not configured" }));
}

#[tokio::test]
async fn test_get_token_missing_field() {
    let app = TestApp::new();

    let response = app.get_token(&json!({ "username": "testuser" })).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    // Rejected before any store access.
    assert_eq!(app.store.stats().begun(), 0);
}

#[tokio::test]
async fn test_get_token_store_unavailable() {
    let app = TestApp::new();
    app.store.set_unavailable(true);

    let response = app
        .get_token(&json!({ "username": "testuser", "password": "testpass" }))
        .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body, json!({ "detail": "Internal server error" }));
}

#[tokio::test]
async fn test_get_token_sessions_closed() {
    let app = TestApp::new();

    app.get_token(&json!({ "username": "testuser", "password": "testpass" }))
        .await;
    app.get_token(&json!({ "username": "testuser", "password": "nope" }))
        .await;

    let stats = app.store.stats();
    assert_eq!(stats.begun(), 2);
    assert_eq!(stats.committed(), 1);
    assert_eq!(stats.rolled_back(), 1);
    assert_eq!(stats.open(), 0);
}
