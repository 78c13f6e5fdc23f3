//! Postgres credential store.
//!
//! Reads the `users` table:
//!
//! ```sql
//! CREATE TABLE users (
//!     username      TEXT PRIMARY KEY,
//!     password_hash TEXT NOT NULL,
//!     created_at    TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
//!     updated_at    TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
//! );
//! ```
//!
//! Each session is a `sqlx` transaction; sqlx rolls a transaction back when
//! it is dropped without being committed.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};

use super::{CredentialRecord, StoreError, StoreSession, UserStore};

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

// `created_at` may be declared with or without a time zone; normalize to UTC.
const FIND_BY_USERNAME: &str = "SELECT username, password_hash, created_at::timestamptz \
     FROM users WHERE username = $1";

/// A credential store backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Build a pool without connecting.
    ///
    /// `port_override` replaces the port named in `url`.
    ///
    /// # Errors
    /// Returns `StoreError::Connection` if the URL cannot be parsed.
    pub fn connect_lazy(url: &str, port_override: Option<u16>) -> Result<Self, StoreError> {
        let mut options = PgConnectOptions::from_str(url)
            .map_err(|e| StoreError::Connection(format!("invalid DATABASE_URL: {e}")))?;
        if let Some(port) = port_override {
            tracing::info!("overriding database port with {port}");
            options = options.port(port);
        }

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .test_before_acquire(true)
            .connect_lazy_with(options);

        Ok(Self { pool })
    }
}

impl UserStore for PgUserStore {
    type Session = PgSession;

    async fn begin(&self) -> Result<PgSession, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(PgSession { tx })
    }

    async fn ping(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("failed to connect to the database: {e}");
                false
            }
        }
    }
}

/// A transaction on the Postgres store.
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

impl StoreSession for PgSession {
    async fn find_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        let row: Option<(String, String, DateTime<Utc>)> = sqlx::query_as(FIND_BY_USERNAME)
            .bind(username)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(row.map(|(username, password_hash, created_at)| CredentialRecord {
            username,
            password_hash,
            created_at,
        }))
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn rollback(self) {
        if let Err(e) = self.tx.rollback().await {
            tracing::warn!("database transaction rollback failed: {e}");
        }
    }
}
