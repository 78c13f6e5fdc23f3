//! Password hashing and verification.
//!
//! Stored hashes are bcrypt strings (`$2a$`, `$2b$`, `$2y$`), so records
//! written by other bcrypt implementations verify unchanged.
//!
//! # Invariants
//! - Verification never returns an error to the caller: a malformed hash, an
//!   internal hashing failure and a wrong password all yield `false`.
//! - The reason for a failed verification is only ever logged.

use std::sync::OnceLock;

pub use bcrypt::DEFAULT_COST;

/// Hash used when the submitted username does not exist, so that the
/// unknown-user path performs the same bcrypt work as a wrong password.
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH
        .get_or_init(|| bcrypt::hash("gateway-dummy-password", DEFAULT_COST).ok())
        .as_deref()
}

/// Hash a plaintext password with the given bcrypt cost.
///
/// # Errors
/// Returns the bcrypt error if the cost is out of range (4-31).
pub fn hash_password(plaintext: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plaintext, cost)
}

/// Check a plaintext password against a stored bcrypt hash.
///
/// The comparison of the derived digest is constant-time inside `bcrypt`.
#[must_use]
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    match bcrypt::verify(plaintext, stored_hash) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::debug!("password verification failed: {e}");
            false
        }
    }
}

/// Compute the dummy hash now so the first unknown-username login does not
/// pay for hashing it.
pub fn warm_dummy_hash() {
    if dummy_hash().is_none() {
        tracing::warn!("failed to compute dummy password hash");
    }
}

/// Whether the dummy hash has already been computed.
#[must_use]
pub fn dummy_hash_ready() -> bool {
    DUMMY_HASH.get().is_some()
}

/// Burn one bcrypt verification against a fixed hash.
pub fn verify_against_dummy(plaintext: &str) {
    if let Some(hash) = dummy_hash() {
        let _ = verify_password(plaintext, hash);
    }
}
