//! HTTP surface of the gateway.
//!
//! Routes:
//! - `GET /` liveness check, always ok
//! - `GET /v1.0/health` health check; logs store connectivity, always ok
//! - `POST /v1.0/get_token` exchange a username/password for an access token
//! - `GET /v1.0/me` profile of the caller named by the bearer token
//!
//! Error bodies are `{"detail": "..."}` with a fixed message per status;
//! the underlying reason is only logged.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{AuthError, AuthService, TokenGrant};
use crate::store::{UserProfile, UserStore};

/// Shared state of every request handler.
pub struct AppState<S> {
    auth: Arc<AuthService<S>>,
}

impl<S> AppState<S> {
    #[must_use]
    pub const fn new(auth: Arc<AuthService<S>>) -> Self {
        Self { auth }
    }
}

// Manual impl: cloning the state must not require `S: Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
        }
    }
}

/// Body of `POST /v1.0/get_token`.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct RootHealth {
    status: &'static str,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: &'static str,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::ServerMisconfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "JWT secret is not configured",
            ),
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, "Not authenticated"),
            Self::Store(e) => {
                tracing::warn!("request failed, store error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            Self::TokenIssue(e) => {
                tracing::error!("request failed, token issue error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(ErrorBody { detail });
        if status == StatusCode::UNAUTHORIZED {
            (
                status,
                [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
                body,
            )
                .into_response()
        } else {
            (status, body).into_response()
        }
    }
}

/// Build the application router.
pub fn router<S: UserStore>(state: AppState<S>, cors_allow_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root_health))
        .route("/v1.0/health", get(health::<S>))
        .route("/v1.0/get_token", post(get_token::<S>))
        .route("/v1.0/me", get(me::<S>))
        .layer(cors_layer(cors_allow_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the CORS layer.
///
/// `*` allows any origin without credentials; an explicit list allows
/// credentials for exactly those origins.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

async fn root_health() -> Json<RootHealth> {
    Json(RootHealth {
        status: "ok",
        message: "Healthy",
    })
}

async fn health<S: UserStore>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    // Liveness does not depend on the store; connectivity is only reported.
    if !state.auth.store().ping().await {
        tracing::warn!("health check: credential store unreachable");
    }
    Json(HealthResponse { status: "ok" })
}

async fn get_token<S: UserStore>(
    State(state): State<AppState<S>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenGrant>, AuthError> {
    tracing::debug!("token requested: {request:?}");
    let grant = state.auth.login(&request.username, &request.password).await?;
    Ok(Json(grant))
}

async fn me<S: UserStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, AuthError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let profile = state.auth.profile(authorization).await?;
    Ok(Json(profile))
}
