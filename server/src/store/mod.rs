//! Credential store.
//!
//! The gateway only ever reads credential records. Every read happens inside
//! a `StoreSession`, which is opened at the start of a request and closed on
//! every exit path: committed when the request succeeds, rolled back when it
//! fails. A session dropped without being closed rolls back.
//!
//! # Invariants
//! - `UserProfile` carries no password material; it can only be produced by
//!   projecting a `CredentialRecord`.
//! - Sessions are never shared between requests.

mod memory;
mod postgres;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use memory::{MemorySession, MemoryUserStore, SessionStats};
pub use postgres::{PgSession, PgUserStore};

use crate::config::ServerConfig;

/// A stored user credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Unique username.
    pub username: String,
    /// bcrypt hash of the user's password.
    pub password_hash: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// Project the record onto its public profile.
    #[must_use]
    pub fn into_profile(self) -> UserProfile {
        UserProfile {
            username: self.username,
            created_at: self.created_at,
        }
    }
}

/// Public view of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Error returned by credential store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or a connection could not be acquired.
    Connection(String),
    /// A query or transaction statement failed.
    Query(String),
    /// The store location is not supported.
    UnsupportedUrl(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(reason) => write!(f, "store connection failed: {reason}"),
            Self::Query(reason) => write!(f, "store query failed: {reason}"),
            Self::UnsupportedUrl(url) => write!(f, "unsupported store URL: {url}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// A source of credential records.
pub trait UserStore: Send + Sync + 'static {
    /// The per-request session type.
    type Session: StoreSession;

    /// Open a new session (transaction) for one request.
    fn begin(&self) -> impl Future<Output = Result<Self::Session, StoreError>> + Send;

    /// Check that the store is reachable. Failures are logged, never raised.
    fn ping(&self) -> impl Future<Output = bool> + Send;
}

/// A scoped unit of store access belonging to one request.
pub trait StoreSession: Send + Sized {
    /// Fetch a record by username.
    fn find_by_username(
        &mut self,
        username: &str,
    ) -> impl Future<Output = Result<Option<CredentialRecord>, StoreError>> + Send;

    /// Commit the session.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Roll the session back. Rollback failures are logged.
    fn rollback(self) -> impl Future<Output = ()> + Send;

    /// Close the session according to the outcome of the work done in it.
    ///
    /// `Ok` commits, `Err` rolls back. A failed commit turns the outcome into
    /// an error.
    fn close<T, E>(self, result: Result<T, E>) -> impl Future<Output = Result<T, E>> + Send
    where
        T: Send,
        E: From<StoreError> + Send,
    {
        async move {
            match result {
                Ok(value) => {
                    self.commit().await?;
                    Ok(value)
                }
                Err(e) => {
                    self.rollback().await;
                    Err(e)
                }
            }
        }
    }
}

/// The store selected by `DATABASE_URL`.
#[derive(Clone)]
pub enum AnyUserStore {
    Memory(MemoryUserStore),
    Postgres(PgUserStore),
}

impl AnyUserStore {
    /// Build the store named by the configuration.
    ///
    /// Postgres connections are opened lazily, so an unreachable database
    /// does not prevent startup.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StoreError> {
        let url = config.database_url.as_str();
        if url == "memory:" {
            return Ok(Self::Memory(MemoryUserStore::new()));
        }
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            return PgUserStore::connect_lazy(url, config.database_port_override)
                .map(Self::Postgres);
        }
        let scheme = url.split(':').next().unwrap_or_default();
        Err(StoreError::UnsupportedUrl(format!("{scheme}:...")))
    }
}

/// Session of an `AnyUserStore`.
pub enum AnySession {
    Memory(MemorySession),
    Postgres(PgSession),
}

impl UserStore for AnyUserStore {
    type Session = AnySession;

    async fn begin(&self) -> Result<AnySession, StoreError> {
        match self {
            Self::Memory(store) => store.begin().await.map(AnySession::Memory),
            Self::Postgres(store) => store.begin().await.map(AnySession::Postgres),
        }
    }

    async fn ping(&self) -> bool {
        match self {
            Self::Memory(store) => store.ping().await,
            Self::Postgres(store) => store.ping().await,
        }
    }
}

impl StoreSession for AnySession {
    async fn find_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        match self {
            Self::Memory(session) => session.find_by_username(username).await,
            Self::Postgres(session) => session.find_by_username(username).await,
        }
    }

    async fn commit(self) -> Result<(), StoreError> {
        match self {
            Self::Memory(session) => session.commit().await,
            Self::Postgres(session) => session.commit().await,
        }
    }

    async fn rollback(self) {
        match self {
            Self::Memory(session) => session.rollback().await,
            Self::Postgres(session) => session.rollback().await,
        }
    }
}
