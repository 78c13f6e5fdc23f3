//! Time source abstraction for token expiry.
//!
//! This module provides a `TimeSource` trait that abstracts over the clock,
//! allowing the token codec to use real system time in production and
//! simulated time in tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Abstraction over time operations.
///
/// Implementations must be shareable across request handlers.
pub trait TimeSource: Send + Sync {
    /// Get the current time in whole seconds since Unix epoch.
    fn now_secs(&self) -> u64;
}

/// Real time source using system clock.
///
/// This is the default implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_secs(&self) -> u64 {
        // duration_since(UNIX_EPOCH) only fails if system time is before 1970.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |duration| duration.as_secs())
    }
}

/// A simulated time source for deterministic testing.
///
/// Time only advances when explicitly told to.
///
/// # Example
///
/// ```
/// use gateway::time::{SimulatedTimeSource, TimeSource};
///
/// let time = SimulatedTimeSource::new(1000);
/// assert_eq!(time.now_secs(), 1000);
///
/// time.advance(100);
/// assert_eq!(time.now_secs(), 1100);
/// ```
#[derive(Debug)]
pub struct SimulatedTimeSource {
    current_secs: AtomicU64,
}

impl SimulatedTimeSource {
    /// Create a new simulated time source with the given initial time.
    #[must_use]
    pub const fn new(initial_secs: u64) -> Self {
        Self {
            current_secs: AtomicU64::new(initial_secs),
        }
    }

    /// Create a simulated time source starting at `1_700_000_000` (November 2023).
    #[must_use]
    pub const fn default_start() -> Self {
        Self::new(1_700_000_000)
    }

    /// Advance time by the given number of seconds, saturating at `u64::MAX`.
    pub fn advance(&self, secs: u64) {
        let _ = self
            .current_secs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(secs))
            });
    }

    /// Set the current time to a specific value.
    pub fn set(&self, secs: u64) {
        self.current_secs.store(secs, Ordering::SeqCst);
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now_secs(&self) -> u64 {
        self.current_secs.load(Ordering::SeqCst)
    }
}
