//! Session persistence.
//!
//! One [`SessionRecord`] per subject holds the hash of the refresh
//! credential that is currently redeemable. Backends implement
//! [`SessionStore`]; the rotation protocol relies on
//! [`SessionStore::compare_and_swap`] being atomic per subject.

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_common::PlatformError;
use serde::{Deserialize, Serialize};

pub use memory::InMemorySessionStore;
pub use self::redis::RedisSessionStore;

/// Persisted session state for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Subject GUID, unique key
    pub subject: String,
    /// Encoded slow hash of the current refresh credential
    pub refresh_credential_hash: String,
    /// Successful rotations since the session was issued
    pub rotation_count: u64,
    /// When the session was issued
    pub created_at: DateTime<Utc>,
    /// When the hash was last replaced
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Fresh record for a newly issued session.
    pub fn new(subject: impl Into<String>, refresh_credential_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            subject: subject.into(),
            refresh_credential_hash: refresh_credential_hash.into(),
            rotation_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a successful rotation to `new_hash`.
    pub fn rotate(&mut self, new_hash: impl Into<String>) {
        self.refresh_credential_hash = new_hash.into();
        self.rotation_count += 1;
        self.updated_at = Utc::now();
    }
}

/// Storage contract for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create or overwrite the record for `subject`.
    ///
    /// Overwriting starts a new session: the rotation count resets.
    async fn upsert(&self, subject: &str, refresh_credential_hash: &str) -> Result<(), PlatformError>;

    /// Load the record for `subject`.
    ///
    /// Fails with [`PlatformError::NotFound`] if there is none.
    async fn find_by_subject(&self, subject: &str) -> Result<SessionRecord, PlatformError>;

    /// Atomically replace the hash for `subject` if it still equals
    /// `expected_hash`.
    ///
    /// Returns `Ok(false)` when another writer replaced it first and
    /// [`PlatformError::NotFound`] when the record does not exist.
    async fn compare_and_swap(
        &self,
        subject: &str,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, PlatformError>;
}
