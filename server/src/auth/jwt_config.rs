//! Token signing configuration.
//!
//! # Pre-conditions
//! - The signing secret must be non-empty.
//!
//! # Post-conditions
//! - `JwtConfig` instances are immutable once created.
//!
//! # Invariants
//! - Only symmetric HMAC algorithms are accepted; the same secret signs and verifies.

use std::str::FromStr;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

/// Error returned when JWT configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwtConfigError {
    /// The HMAC secret is empty.
    EmptySecret,
    /// The algorithm name is not one of the supported HMAC algorithms.
    UnsupportedAlgorithm(String),
}

impl std::fmt::Display for JwtConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySecret => write!(f, "JWT secret must not be empty"),
            Self::UnsupportedAlgorithm(name) => {
                write!(f, "unsupported JWT algorithm '{name}' (expected HS256, HS384 or HS512)")
            }
        }
    }
}

impl std::error::Error for JwtConfigError {}

/// HMAC signing algorithm for access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JwtAlgorithm {
    /// HMAC-SHA256.
    #[default]
    Hs256,
    /// HMAC-SHA384.
    Hs384,
    /// HMAC-SHA512.
    Hs512,
}

impl JwtAlgorithm {
    /// The matching `jsonwebtoken` algorithm.
    #[must_use]
    pub const fn as_jsonwebtoken(self) -> Algorithm {
        match self {
            Self::Hs256 => Algorithm::HS256,
            Self::Hs384 => Algorithm::HS384,
            Self::Hs512 => Algorithm::HS512,
        }
    }

    /// The name used in the token header and in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }
}

impl FromStr for JwtAlgorithm {
    type Err = JwtConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            _ => Err(JwtConfigError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl std::fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT signing/verification configuration.
///
/// Holds the process-wide secret and algorithm. Changing either invalidates
/// every token issued before the change.
#[derive(Clone)]
pub struct JwtConfig {
    algorithm: JwtAlgorithm,
    secret: Vec<u8>,
}

impl JwtConfig {
    /// Create a new JWT configuration.
    ///
    /// # Pre-conditions
    /// - `secret` must not be empty.
    ///
    /// # Errors
    /// Returns `JwtConfigError::EmptySecret` if the secret is empty.
    pub fn new(algorithm: JwtAlgorithm, secret: Vec<u8>) -> Result<Self, JwtConfigError> {
        if secret.is_empty() {
            return Err(JwtConfigError::EmptySecret);
        }
        Ok(Self { algorithm, secret })
    }

    /// Create an HS256 configuration, the default algorithm.
    pub fn new_hs256(secret: Vec<u8>) -> Result<Self, JwtConfigError> {
        Self::new(JwtAlgorithm::Hs256, secret)
    }

    #[must_use]
    pub const fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }

    pub(crate) fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.secret)
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.secret)
    }
}

// The secret never appears in logs.
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("secret", &"<redacted>")
            .finish()
    }
}
