//! Common helpers for end-to-end tests.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use tower::ServiceExt;

use crate::auth::AuthService;
use crate::server::{AppState, router};
use crate::store::MemoryUserStore;
use crate::testing::{TEST_TTL, seeded_store, test_service};
use crate::time::SimulatedTimeSource;

/// A decoded HTTP response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: serde_json::Value,
}

/// Router plus handles on its store and clock.
pub struct TestApp {
    pub router: Router,
    pub store: MemoryUserStore,
    pub time: Arc<SimulatedTimeSource>,
}

impl TestApp {
    /// App with the seeded `testuser` / `testpass` account and a signing secret.
    #[must_use]
    pub fn new() -> Self {
        let store = seeded_store();
        let time = Arc::new(SimulatedTimeSource::default_start());
        let service = test_service(store.clone(), &time);
        Self::from_service(service, store, time)
    }

    /// App with the seeded account but no signing secret.
    #[must_use]
    pub fn without_secret() -> Self {
        let store = seeded_store();
        let time = Arc::new(SimulatedTimeSource::default_start());
        let service = AuthService::new(store.clone(), None, TEST_TTL);
        Self::from_service(service, store, time)
    }

    fn from_service(
        service: AuthService<MemoryUserStore>,
        store: MemoryUserStore,
        time: Arc<SimulatedTimeSource>,
    ) -> Self {
        let router = router(AppState::new(Arc::new(service)), &["*".to_string()]);
        Self {
            router,
            store,
            time,
        }
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// `GET` without headers.
    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("build request");
        self.send(request).await
    }

    /// `POST /v1.0/get_token` with a JSON body.
    pub async fn get_token(&self, body: &serde_json::Value) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/v1.0/get_token")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request");
        self.send(request).await
    }

    /// `GET /v1.0/me` with an optional `Authorization` header.
    pub async fn me(&self, authorization: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(Method::GET).uri("/v1.0/me");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        self.send(builder.body(Body::empty()).expect("build request"))
            .await
    }

    /// Log in as the seeded user and return the access token.
    pub async fn login_token(&self) -> String {
        let response = self
            .get_token(&serde_json::json!({ "username": "testuser", "password": "testpass" }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        response.body["access_token"]
            .as_str()
            .expect("access_token is a string")
            .to_string()
    }
}
