//! Identity resolution.
//!
//! Turns a bearer token into the profile of the user it names.
//!
//! # Post-conditions
//! - On success the returned profile belongs to a user that exists in the
//!   store at resolution time.
//!
//! # Invariants
//! - Resolution has no side effects on the token or the store; resolving the
//!   same valid token twice yields the same profile.

use super::{JwtError, TokenCodec};
use crate::store::{StoreError, StoreSession, UserProfile};

/// Error returned when a token cannot be resolved to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The token failed to parse or verify.
    Token(JwtError),
    /// The token is valid but names a user that no longer exists.
    UnknownSubject,
    /// The store lookup failed.
    Store(StoreError),
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(e) => write!(f, "token rejected: {e}"),
            Self::UnknownSubject => write!(f, "token subject does not exist"),
            Self::Store(e) => write!(f, "identity lookup failed: {e}"),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Token(e) => Some(e),
            Self::Store(e) => Some(e),
            Self::UnknownSubject => None,
        }
    }
}

impl From<JwtError> for ResolveError {
    fn from(e: JwtError) -> Self {
        Self::Token(e)
    }
}

impl From<StoreError> for ResolveError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Resolve `token` to the profile of its subject.
///
/// # Errors
/// - `Token` if the codec rejects the token.
/// - `UnknownSubject` if no record exists for the subject.
/// - `Store` if the lookup itself fails.
pub async fn resolve<S: StoreSession>(
    token: &str,
    codec: &TokenCodec,
    session: &mut S,
) -> Result<UserProfile, ResolveError> {
    let subject = codec.parse(token)?;

    match session.find_by_username(&subject).await? {
        Some(record) => Ok(record.into_profile()),
        None => Err(ResolveError::UnknownSubject),
    }
}
