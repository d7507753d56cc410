use std::collections::HashMap;

use async_trait::async_trait;
use rust_common::PlatformError;
use tokio::sync::RwLock;

use super::{SessionRecord, SessionStore};

/// Process-local session store.
///
/// Compare-and-swap runs under the write lock, which serializes rotations
/// for every subject in the process.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    records: RwLock<HashMap<String, SessionRecord>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn upsert(&self, subject: &str, refresh_credential_hash: &str) -> Result<(), PlatformError> {
        self.records.write().await.insert(
            subject.to_string(),
            SessionRecord::new(subject, refresh_credential_hash),
        );
        Ok(())
    }

    async fn find_by_subject(&self, subject: &str) -> Result<SessionRecord, PlatformError> {
        self.records
            .read()
            .await
            .get(subject)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("session {subject}")))
    }

    async fn compare_and_swap(
        &self,
        subject: &str,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, PlatformError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(subject)
            .ok_or_else(|| PlatformError::not_found(format!("session {subject}")))?;

        if record.refresh_credential_hash != expected_hash {
            return Ok(false);
        }
        record.rotate(new_hash);
        Ok(true)
    }
}
