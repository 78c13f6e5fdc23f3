//! End-to-end tests for `GET /v1.0/me`.

use axum::http::{StatusCode, header};
use serde_json::json;

use crate::e2e_tests::helpers::TestApp;
use crate::testing::{TEST_TTL, test_codec};

#[tokio::test]
async fn test_me_with_valid_token() {
    let app = TestApp::new();
    let token = app.login_token().await;

    let response = app.me(Some(&format!("Bearer {token}"))).await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(
        response.body,
        json!({ "username": "testuser", "created_at": "2024-01-15T12:30:00Z" })
    );
    assert!(response.body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_me_missing_token() {
    let app = TestApp::new();

    let response = app.me(None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({ "detail": "Not authenticated" }));
    assert_eq!(
        response
            .headers
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok()),
        Some("Bearer")
    );
}

#[tokio::test]
async fn test_me_invalid_token() {
    let app = TestApp::new();

    let response = app.me(Some("Bearer invalid.token.value")).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({ "detail": "Not authenticated" }));
}

#[tokio::test]
async fn test_me_wrong_scheme() {
    let app = TestApp::new();
    let token = app.login_token().await;

    let response = app.me(Some(&format!("Token {token}"))).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_expired_token() {
    let app = TestApp::new();
    let token = app.login_token().await;
    let header = format!("Bearer {token}");

    app.time.advance(TEST_TTL.as_secs() - 1);
    assert_eq!(app.me(Some(&header)).await.status, StatusCode::OK);

    app.time.advance(1);
    let response = app.me(Some(&header)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({ "detail": "Not authenticated" }));
}

#[tokio::test]
async fn test_me_token_from_other_secret() {
    let app = TestApp::new();
    let foreign = test_codec(b"some-other-secret", &app.time)
        .issue("testuser", TEST_TTL)
        .expect("issue token");

    let response = app.me(Some(&format!("Bearer {foreign}"))).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_deleted_user() {
    let app = TestApp::new();
    let token = app.login_token().await;
    app.store.remove_user("testuser").expect("remove user");

    let response = app.me(Some(&format!("Bearer {token}"))).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body, json!({ "detail": "Not authenticated" }));
}

#[tokio::test]
async fn test_me_repeated_requests_identical() {
    let app = TestApp::new();
    let token = app.login_token().await;
    let header = format!("Bearer {token}");

    let first = app.me(Some(&header)).await;
    let second = app.me(Some(&header)).await;

    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn test_me_without_secret() {
    let app = TestApp::without_secret();

    let response = app.me(Some("Bearer some.jwt.token")).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_store_failure_is_server_error() {
    let app = TestApp::new();
    let token = app.login_token().await;
    app.store.set_fail_lookups(true);

    let response = app.me(Some(&format!("Bearer {token}"))).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body, json!({ "detail": "Internal server error" }));
    assert!(response.headers.get(header::WWW_AUTHENTICATE).is_none());
    assert_eq!(app.store.stats().rolled_back(), 1);
    assert_eq!(app.store.stats().open(), 0);
}
