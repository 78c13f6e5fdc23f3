//! Authentication module.
//!
//! Password verification, access token issuance and validation, identity
//! resolution, and the login/profile flows built from them.
//!
//! # Pre-conditions
//! - Tokens can only be issued once a signing secret is configured.
//!
//! # Post-conditions
//! - Signing configuration is immutable once loaded.
//!
//! # Invariants
//! - Internal failure reasons never leave this module except through logs;
//!   callers only see `AuthError`.

pub mod identity;
pub mod jwt;
pub mod jwt_config;
pub mod password;
pub mod service;

pub use identity::ResolveError;
pub use jwt::{JwtError, TokenCodec};
pub use jwt_config::{JwtAlgorithm, JwtConfig, JwtConfigError};
pub use service::{AuthError, AuthService, TOKEN_TYPE, TokenGrant, bearer_token};
