//! Access token codec.
//!
//! Issues and parses HMAC-signed JSON Web Tokens carrying the subject
//! (username) and an absolute expiry.
//!
//! # Pre-conditions
//! - The codec is built from a validated `JwtConfig` (non-empty secret).
//!
//! # Post-conditions
//! - `parse` succeeds only for tokens whose signature verifies with the
//!   configured secret and algorithm and whose `exp` is strictly after the
//!   codec's current time.
//!
//! # Invariants
//! - The codec holds no mutable state; issuing and parsing are safe from
//!   any number of concurrent requests.
//! - The signature is checked before any claim is trusted.

use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::JwtConfig;
use crate::time::{SystemTimeSource, TimeSource};

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject claim containing the username. Absent or null is `MissingSubClaim`.
    #[serde(default)]
    sub: Option<String>,
    /// Issue time, seconds since Unix epoch. Tokens minted elsewhere may omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iat: Option<u64>,
    /// Expiry, seconds since Unix epoch.
    exp: u64,
}

/// Error returned when issuing or parsing a token fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// The JWT signature is invalid.
    InvalidSignature,
    /// The JWT has expired.
    TokenExpired,
    /// The JWT is malformed or cannot be parsed.
    MalformedToken,
    /// The 'sub' claim is missing from the JWT.
    MissingSubClaim,
    /// Signing the token failed.
    Encoding(String),
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "invalid JWT signature"),
            Self::TokenExpired => write!(f, "JWT has expired"),
            Self::MalformedToken => write!(f, "malformed JWT"),
            Self::MissingSubClaim => write!(f, "missing 'sub' claim in JWT"),
            Self::Encoding(reason) => write!(f, "failed to sign JWT: {reason}"),
        }
    }
}

impl std::error::Error for JwtError {}

/// Issues and verifies access tokens with a fixed secret and algorithm.
#[derive(Clone)]
pub struct TokenCodec {
    config: JwtConfig,
    time: Arc<dyn TimeSource>,
}

impl TokenCodec {
    /// Create a codec that reads the system clock.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        Self::with_time_source(config, Arc::new(SystemTimeSource))
    }

    /// Create a codec with an explicit time source.
    #[must_use]
    pub fn with_time_source(config: JwtConfig, time: Arc<dyn TimeSource>) -> Self {
        Self { config, time }
    }

    /// Issue a token for `subject` that expires `ttl` from now.
    ///
    /// Sub-second parts of `ttl` are dropped; a zero `ttl` yields a token that
    /// is already expired.
    ///
    /// # Errors
    /// Returns `JwtError::Encoding` if signing fails.
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, JwtError> {
        let now = self.time.now_secs();
        let claims = Claims {
            sub: Some(subject.to_string()),
            iat: Some(now),
            exp: now.saturating_add(ttl.as_secs()),
        };
        let header = Header::new(self.config.algorithm().as_jsonwebtoken());

        encode(&header, &claims, &self.config.encoding_key())
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Verify a token and return its subject.
    ///
    /// # Errors
    /// - `InvalidSignature` if the signature does not match the configured secret.
    /// - `TokenExpired` if `exp` is not strictly in the future.
    /// - `MalformedToken` if the token cannot be decoded or uses another algorithm.
    /// - `MissingSubClaim` if the subject is absent or empty.
    pub fn parse(&self, token: &str) -> Result<String, JwtError> {
        let mut validation = Validation::new(self.config.algorithm().as_jsonwebtoken());
        // Expiry is checked below against the codec's own clock, with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let token_data = decode::<Claims>(token, &self.config.decoding_key(), &validation)
            .map_err(map_jwt_error)?;
        let claims = token_data.claims;

        if claims.exp <= self.time.now_secs() {
            return Err(JwtError::TokenExpired);
        }
        match claims.sub {
            Some(sub) if !sub.is_empty() => Ok(sub),
            _ => Err(JwtError::MissingSubClaim),
        }
    }
}

/// Maps jsonwebtoken errors to our `JwtError` type.
fn map_jwt_error(error: jsonwebtoken::errors::Error) -> JwtError {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        ErrorKind::ExpiredSignature => JwtError::TokenExpired,
        ErrorKind::InvalidToken
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::Base64(_)
        | ErrorKind::Json(_)
        | ErrorKind::Utf8(_) => JwtError::MalformedToken,
        ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => JwtError::MissingSubClaim,
        _ => JwtError::MalformedToken,
    }
}
