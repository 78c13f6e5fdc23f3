//! Login and profile flows.
//!
//! `AuthService` ties the credential store, the password verifier and the
//! token codec together. Both flows are stateless: every call opens its own
//! store session and closes it before returning.
//!
//! # Invariants
//! - An unknown username and a wrong password produce the same error.
//! - Every rejected token produces the same error, whatever the reason.
//! - Store sessions are committed on success and rolled back on failure.

use std::time::Duration;

use serde::Serialize;

use super::{JwtError, ResolveError, TokenCodec, identity, password};
use crate::config::ServerConfig;
use crate::store::{CredentialRecord, StoreError, StoreSession, UserProfile, UserStore};

/// Token type reported alongside every issued token.
pub const TOKEN_TYPE: &str = "bearer";

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: &'static str,
}

/// Caller-visible authentication failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No signing secret is configured.
    ServerMisconfigured,
    /// Wrong username or password.
    InvalidCredentials,
    /// Missing, invalid or expired token, or a token for an unknown user.
    Unauthenticated,
    /// The credential store failed.
    Store(StoreError),
    /// The token could not be signed.
    TokenIssue(JwtError),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServerMisconfigured => write!(f, "JWT secret is not configured"),
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::Unauthenticated => write!(f, "not authenticated"),
            Self::Store(e) => write!(f, "{e}"),
            Self::TokenIssue(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(e) => Some(e),
            Self::TokenIssue(e) => Some(e),
            Self::ServerMisconfigured | Self::InvalidCredentials | Self::Unauthenticated => None,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<ResolveError> for AuthError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::Store(e) => Self::Store(e),
            ResolveError::Token(_) | ResolveError::UnknownSubject => Self::Unauthenticated,
        }
    }
}

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively; an empty token is treated as absent.
#[must_use]
pub fn bearer_token(authorization: &str) -> Option<&str> {
    let (scheme, token) = authorization.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Authentication flow controller.
pub struct AuthService<S> {
    store: S,
    codec: Option<TokenCodec>,
    token_ttl: Duration,
}

impl<S: UserStore> AuthService<S> {
    /// Create a service. A `None` codec means no signing secret is configured.
    #[must_use]
    pub const fn new(store: S, codec: Option<TokenCodec>, token_ttl: Duration) -> Self {
        Self {
            store,
            codec,
            token_ttl,
        }
    }

    /// Create a service from the server configuration, reading the system clock.
    ///
    /// Computes the unknown-user dummy hash up front.
    #[must_use]
    pub fn from_config(store: S, config: &ServerConfig) -> Self {
        password::warm_dummy_hash();
        let codec = config.jwt_config.clone().map(TokenCodec::new);
        Self::new(store, codec, config.access_token_ttl)
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Authenticate a username/password pair and issue an access token.
    ///
    /// # Errors
    /// - `ServerMisconfigured` if no signing secret is configured.
    /// - `InvalidCredentials` if the user does not exist or the password is wrong.
    /// - `Store` if the credential store fails.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenGrant, AuthError> {
        let Some(codec) = &self.codec else {
            tracing::error!("login refused: JWT secret is not configured");
            return Err(AuthError::ServerMisconfigured);
        };

        let mut session = self.store.begin().await?;
        let result = self
            .authenticate(&mut session, codec, username, password)
            .await;
        session.close(result).await
    }

    async fn authenticate(
        &self,
        session: &mut S::Session,
        codec: &TokenCodec,
        username: &str,
        password: &str,
    ) -> Result<TokenGrant, AuthError> {
        let record = session.find_by_username(username).await?;

        if !check_password(record.as_ref(), password).await {
            tracing::debug!("login rejected for '{username}'");
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = codec
            .issue(username, self.token_ttl)
            .map_err(AuthError::TokenIssue)?;
        tracing::debug!("issued access token for '{username}'");

        Ok(TokenGrant {
            access_token,
            token_type: TOKEN_TYPE,
        })
    }

    /// Resolve the profile of the caller named by an `Authorization` header.
    ///
    /// # Errors
    /// - `Unauthenticated` if the header is missing or malformed, the token is
    ///   rejected, or its subject no longer exists.
    /// - `Store` if the credential store fails.
    pub async fn profile(&self, authorization: Option<&str>) -> Result<UserProfile, AuthError> {
        let Some(token) = authorization.and_then(bearer_token) else {
            tracing::debug!("profile request without bearer token");
            return Err(AuthError::Unauthenticated);
        };
        // Without a secret no token can verify.
        let Some(codec) = &self.codec else {
            tracing::debug!("profile request rejected: JWT secret is not configured");
            return Err(AuthError::Unauthenticated);
        };

        let mut session = self.store.begin().await?;
        let result = identity::resolve(token, codec, &mut session)
            .await
            .map_err(|e| {
                tracing::debug!("profile request rejected: {e}");
                AuthError::from(e)
            });
        session.close(result).await
    }
}

/// Verify `password` against the record's hash on the blocking pool.
///
/// A missing record still costs one bcrypt verification.
async fn check_password(record: Option<&CredentialRecord>, plaintext: &str) -> bool {
    let plaintext = plaintext.to_string();
    let hash = record.map(|r| r.password_hash.clone());

    let verified = tokio::task::spawn_blocking(move || match hash {
        Some(hash) => password::verify_password(&plaintext, &hash),
        None => {
            password::verify_against_dummy(&plaintext);
            false
        }
    })
    .await;

    verified.unwrap_or_else(|e| {
        tracing::warn!("password verification task failed: {e}");
        false
    })
}
