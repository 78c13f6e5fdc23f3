//! In-memory credential store.
//!
//! Backs `DATABASE_URL=memory:` and the test suite. Records live in a
//! `RwLock<HashMap>`; sessions read through to the shared map and count how
//! they were closed so tests can assert the commit/rollback discipline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use super::{CredentialRecord, StoreError, StoreSession, UserStore};

/// Counters of how sessions were opened and closed.
#[derive(Debug, Default)]
pub struct SessionStats {
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
}

impl SessionStats {
    #[must_use]
    pub fn begun(&self) -> u64 {
        self.begun.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn rolled_back(&self) -> u64 {
        self.rolled_back.load(Ordering::SeqCst)
    }

    /// Sessions that have been opened but not yet closed.
    #[must_use]
    pub fn open(&self) -> u64 {
        self.begun()
            .saturating_sub(self.committed())
            .saturating_sub(self.rolled_back())
    }
}

#[derive(Debug, Default)]
struct Inner {
    users: RwLock<HashMap<String, CredentialRecord>>,
    stats: SessionStats,
    unavailable: AtomicBool,
    fail_lookups: AtomicBool,
}

/// A credential store held entirely in memory.
///
/// Cloning is cheap; clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    inner: Arc<Inner>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record.
    pub fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        created_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let record = CredentialRecord {
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        };
        self.inner
            .users
            .write()
            .map_err(|_| StoreError::Query("user map lock poisoned".to_string()))?
            .insert(record.username.clone(), record);
        Ok(())
    }

    /// Remove a user record. Returns whether a record was removed.
    pub fn remove_user(&self, username: &str) -> Result<bool, StoreError> {
        let removed = self
            .inner
            .users
            .write()
            .map_err(|_| StoreError::Query("user map lock poisoned".to_string()))?
            .remove(username);
        Ok(removed.is_some())
    }

    /// Make `begin` and `ping` fail as if the store were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make lookups inside open sessions fail.
    pub fn set_fail_lookups(&self, fail: bool) {
        self.inner.fail_lookups.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn stats(&self) -> &SessionStats {
        &self.inner.stats
    }
}

impl UserStore for MemoryUserStore {
    type Session = MemorySession;

    async fn begin(&self) -> Result<MemorySession, StoreError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("memory store marked unavailable".to_string()));
        }
        self.inner.stats.begun.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            inner: Arc::clone(&self.inner),
            closed: false,
        })
    }

    async fn ping(&self) -> bool {
        !self.inner.unavailable.load(Ordering::SeqCst)
    }
}

/// Session over a `MemoryUserStore`.
#[derive(Debug)]
pub struct MemorySession {
    inner: Arc<Inner>,
    closed: bool,
}

impl MemorySession {
    fn finish(mut self, committed: bool) {
        let counter = if committed {
            &self.inner.stats.committed
        } else {
            &self.inner.stats.rolled_back
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.closed = true;
    }
}

impl StoreSession for MemorySession {
    async fn find_by_username(
        &mut self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, StoreError> {
        if self.inner.fail_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Query("memory store lookup failure".to_string()));
        }
        let users = self
            .inner
            .users
            .read()
            .map_err(|_| StoreError::Query("user map lock poisoned".to_string()))?;
        Ok(users.get(username).cloned())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.finish(true);
        Ok(())
    }

    async fn rollback(self) {
        self.finish(false);
    }
}

// Dropped without commit or rollback: count it as a rollback.
impl Drop for MemorySession {
    fn drop(&mut self) {
        if !self.closed {
            self.inner.stats.rolled_back.fetch_add(1, Ordering::SeqCst);
        }
    }
}
