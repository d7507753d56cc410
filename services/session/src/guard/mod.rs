//! Reuse detection for refresh credentials.
//!
//! Only a slow salted hash of the current refresh credential is kept per
//! subject. A presented credential that does not match that hash has
//! either been rotated away already or was never issued.

pub mod hasher;

use std::sync::Arc;

use rust_common::PlatformError;
use tracing::error;

use crate::error::TokenError;
use crate::store::SessionStore;

pub use hasher::CredentialHasher;

/// Hash of the current credential as read during a successful check.
///
/// Committing a rotation replaces exactly this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedHash(String);

impl ObservedHash {
    /// Encoded hash value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Guards refresh credentials against redemption after rotation.
pub struct ReuseGuard {
    store: Arc<dyn SessionStore>,
    hasher: CredentialHasher,
}

impl ReuseGuard {
    /// Create a guard over `store`.
    pub fn new(store: Arc<dyn SessionStore>, hasher: CredentialHasher) -> Self {
        Self { store, hasher }
    }

    /// Make `refresh` the only redeemable credential for `subject`.
    ///
    /// # Errors
    ///
    /// `PersistenceError` if the store fails.
    pub async fn store(&self, subject: &str, refresh: &str) -> Result<(), TokenError> {
        let hash = self.hasher.hash_blocking(refresh).await?;
        self.store
            .upsert(subject, &hash)
            .await
            .map_err(|e| persistence_error(subject, &e))
    }

    /// Whether `refresh` is the current credential for `subject`.
    ///
    /// # Errors
    ///
    /// `NoActiveSession` if nothing was ever issued for `subject`,
    /// `PersistenceError` if the store fails.
    pub async fn verify(&self, subject: &str, refresh: &str) -> Result<bool, TokenError> {
        Ok(self.check(subject, refresh).await?.is_some())
    }

    /// Like [`verify`](Self::verify), returning the matched hash on success.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify).
    pub async fn check(&self, subject: &str, refresh: &str) -> Result<Option<ObservedHash>, TokenError> {
        let record = self.store.find_by_subject(subject).await.map_err(|e| {
            if e.is_not_found() {
                TokenError::NoActiveSession
            } else {
                persistence_error(subject, &e)
            }
        })?;

        let matches = self
            .hasher
            .verify_blocking(refresh, &record.refresh_credential_hash)
            .await?;
        Ok(matches.then_some(ObservedHash(record.refresh_credential_hash)))
    }

    /// Replace `observed` with the hash of `new_refresh`, atomically.
    ///
    /// # Errors
    ///
    /// `ConcurrentRotation` if the stored hash is no longer `observed`,
    /// `NoActiveSession` if the record vanished, `PersistenceError` if the
    /// store fails.
    pub async fn replace(
        &self,
        subject: &str,
        observed: &ObservedHash,
        new_refresh: &str,
    ) -> Result<(), TokenError> {
        let new_hash = self.hasher.hash_blocking(new_refresh).await?;
        let swapped = self
            .store
            .compare_and_swap(subject, observed.as_str(), &new_hash)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    TokenError::NoActiveSession
                } else {
                    persistence_error(subject, &e)
                }
            })?;

        if swapped {
            Ok(())
        } else {
            Err(TokenError::ConcurrentRotation)
        }
    }
}

fn persistence_error(subject: &str, err: &PlatformError) -> TokenError {
    error!(subject = %subject, error = %err, retryable = err.is_retryable(), "Session store failure");
    TokenError::persistence(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySessionStore;

    fn guard() -> (ReuseGuard, Arc<InMemorySessionStore>) {
        let store = Arc::new(InMemorySessionStore::new());
        (ReuseGuard::new(store.clone(), CredentialHasher::new(1_000)), store)
    }

    #[tokio::test]
    async fn test_store_then_verify() {
        let (guard, store) = guard();
        guard.store("user-1", "refresh-1").await.unwrap();

        assert!(guard.verify("user-1", "refresh-1").await.unwrap());
        assert!(!guard.verify("user-1", "refresh-0").await.unwrap());

        let record = store.find_by_subject("user-1").await.unwrap();
        assert!(!record.refresh_credential_hash.contains("refresh-1"));
    }

    #[tokio::test]
    async fn test_missing_session() {
        let (guard, _) = guard();
        assert!(matches!(
            guard.verify("nobody", "refresh-1").await,
            Err(TokenError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_store_replaces_previous() {
        let (guard, _) = guard();
        guard.store("user-1", "refresh-1").await.unwrap();
        guard.store("user-1", "refresh-2").await.unwrap();

        assert!(!guard.verify("user-1", "refresh-1").await.unwrap());
        assert!(guard.verify("user-1", "refresh-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_retires_old_credential() {
        let (guard, _) = guard();
        guard.store("user-1", "refresh-1").await.unwrap();

        let observed = guard.check("user-1", "refresh-1").await.unwrap().unwrap();
        guard.replace("user-1", &observed, "refresh-2").await.unwrap();

        assert!(!guard.verify("user-1", "refresh-1").await.unwrap());
        assert!(guard.verify("user-1", "refresh-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_with_stale_observation() {
        let (guard, _) = guard();
        guard.store("user-1", "refresh-1").await.unwrap();
        let observed = guard.check("user-1", "refresh-1").await.unwrap().unwrap();

        guard.replace("user-1", &observed, "refresh-2").await.unwrap();
        let err = guard.replace("user-1", &observed, "refresh-3").await.unwrap_err();

        assert!(matches!(err, TokenError::ConcurrentRotation));
        assert!(guard.verify("user-1", "refresh-2").await.unwrap());
    }
}
