//! Shared harness for session service integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use rust_common::PlatformError;
use session_service::SessionService;
use session_service::clock::ManualClock;
use session_service::guard::{CredentialHasher, ReuseGuard};
use session_service::issuer::TokenIssuer;
use session_service::jwt::{SigningTier, TokenCodec, TokenKind};
use session_service::store::{InMemorySessionStore, SessionRecord, SessionStore};
use test_utils::fixtures::{ACCESS_SECRET, EPOCH_2024, FAST_HASH_ITERATIONS, REFRESH_SECRET};
use tokio::sync::Barrier;

pub struct Harness {
    pub service: SessionService,
    pub clock: Arc<ManualClock>,
}

pub fn issuer(clock: Arc<ManualClock>) -> TokenIssuer {
    TokenIssuer::new(
        TokenCodec::new(ACCESS_SECRET.as_bytes(), TokenKind::Access, SigningTier::Hs256),
        TokenCodec::new(REFRESH_SECRET.as_bytes(), TokenKind::Refresh, SigningTier::Hs512),
        clock,
    )
}

pub fn harness_with_store(store: Arc<dyn SessionStore>) -> Harness {
    let clock = Arc::new(ManualClock::new(EPOCH_2024));
    let issuer = Arc::new(issuer(clock.clone()));
    let guard = Arc::new(ReuseGuard::new(store, CredentialHasher::new(FAST_HASH_ITERATIONS)));

    Harness {
        service: SessionService::new(issuer, guard),
        clock,
    }
}

pub fn harness() -> Harness {
    harness_with_store(Arc::new(InMemorySessionStore::new()))
}

/// Store whose operations can be made to fail on demand.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemorySessionStore,
    pub fail_upsert: AtomicBool,
    pub fail_find: AtomicBool,
    pub fail_cas: AtomicBool,
}

impl FlakyStore {
    pub fn set(flag: &AtomicBool, failing: bool) {
        flag.store(failing, Ordering::SeqCst);
    }

    pub async fn current_hash(&self, subject: &str) -> String {
        self.inner
            .find_by_subject(subject)
            .await
            .unwrap()
            .refresh_credential_hash
    }
}

fn check(flag: &AtomicBool) -> Result<(), PlatformError> {
    if flag.load(Ordering::SeqCst) {
        Err(PlatformError::unavailable("injected failure"))
    } else {
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn upsert(&self, subject: &str, refresh_credential_hash: &str) -> Result<(), PlatformError> {
        check(&self.fail_upsert)?;
        self.inner.upsert(subject, refresh_credential_hash).await
    }

    async fn find_by_subject(&self, subject: &str) -> Result<SessionRecord, PlatformError> {
        check(&self.fail_find)?;
        self.inner.find_by_subject(subject).await
    }

    async fn compare_and_swap(
        &self,
        subject: &str,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, PlatformError> {
        check(&self.fail_cas)?;
        self.inner.compare_and_swap(subject, expected_hash, new_hash).await
    }
}

/// Store that holds every reader at a barrier until `parties` readers have
/// loaded the record, forcing them to observe the same hash.
pub struct GatedStore {
    inner: InMemorySessionStore,
    gate: Barrier,
    armed: AtomicBool,
}

impl GatedStore {
    pub fn new(parties: usize) -> Self {
        Self {
            inner: InMemorySessionStore::new(),
            gate: Barrier::new(parties),
            armed: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionStore for GatedStore {
    async fn upsert(&self, subject: &str, refresh_credential_hash: &str) -> Result<(), PlatformError> {
        self.inner.upsert(subject, refresh_credential_hash).await
    }

    async fn find_by_subject(&self, subject: &str) -> Result<SessionRecord, PlatformError> {
        let record = self.inner.find_by_subject(subject).await;
        if self.armed.load(Ordering::SeqCst) {
            self.gate.wait().await;
        }
        record
    }

    async fn compare_and_swap(
        &self,
        subject: &str,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<bool, PlatformError> {
        self.inner.compare_and_swap(subject, expected_hash, new_hash).await
    }
}
