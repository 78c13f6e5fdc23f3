//! Shared fixtures for unit and end-to-end tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::auth::{AuthService, JwtConfig, TokenCodec, password};
use crate::store::MemoryUserStore;
use crate::time::SimulatedTimeSource;

/// Secret shared by every test fixture.
pub const TEST_SECRET: &[u8] = b"test-secret-key";

/// Lowest bcrypt cost, for fast tests.
pub const TEST_BCRYPT_COST: u32 = 4;

/// Token lifetime used by test services.
pub const TEST_TTL: Duration = Duration::from_secs(5 * 60);

/// Creation time of the seeded user.
#[must_use]
pub fn seeded_created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0)
        .single()
        .expect("valid timestamp")
}

/// Create a memory store holding `testuser` / `testpass`.
#[must_use]
pub fn seeded_store() -> MemoryUserStore {
    let store = MemoryUserStore::new();
    let hash = password::hash_password("testpass", TEST_BCRYPT_COST).expect("hash password");
    store
        .insert_user("testuser", &hash, seeded_created_at())
        .expect("insert seeded user");
    store
}

/// Create a token codec signing with `secret` on a simulated clock.
#[must_use]
pub fn test_codec(secret: &[u8], time: &Arc<SimulatedTimeSource>) -> TokenCodec {
    let config = JwtConfig::new_hs256(secret.to_vec()).expect("valid jwt config");
    TokenCodec::with_time_source(config, Arc::<SimulatedTimeSource>::clone(time))
}

/// Create an auth service over `store` using `TEST_SECRET` and `TEST_TTL`.
#[must_use]
pub fn test_service(
    store: MemoryUserStore,
    time: &Arc<SimulatedTimeSource>,
) -> AuthService<MemoryUserStore> {
    AuthService::new(store, Some(test_codec(TEST_SECRET, time)), TEST_TTL)
}
