//! Storage readers for raw telemetry.
//!
//! Follows the Explicit Module Boundary Pattern (EMBP): callers only see the
//! [`SensorStore`] trait and the two implementations re-exported here.
//! - [`RtdbStore`] reads a Firebase Realtime Database over its REST API.
//! - [`FixtureStore`] serves static raw records when no database is
//!   configured (and in tests).

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::RawSnapshot;

mod fixture;
mod rtdb;

pub use fixture::FixtureStore;
pub use rtdb::RtdbStore;

// ---

/// Characters Firebase forbids in keys, plus the path separator.
const FORBIDDEN_KEY_CHARS: [char; 6] = ['/', '.', '#', '$', '[', ']'];

/// Source of raw telemetry records for a (user, field) pair.
///
/// Implementations own path construction, authentication and transport
/// errors. `Ok(None)` means the pair has no telemetry at all.
#[async_trait]
pub trait SensorStore: Send + Sync {
    // ---
    async fn fetch_records(&self, user_id: &str, field_id: &str) -> Result<Option<RawSnapshot>>;

    /// Short label used in logs and the health endpoint.
    fn kind(&self) -> &'static str;
}

/// Reject ids that cannot name a single database path segment.
pub fn validate_path_segment(name: &str, value: &str) -> Result<()> {
    // ---
    if value.trim().is_empty() {
        bail!("{} must not be empty", name);
    }
    if value.contains(&FORBIDDEN_KEY_CHARS[..]) {
        bail!("{} contains characters not allowed in a database path: '{}'", name, value);
    }
    Ok(())
}
