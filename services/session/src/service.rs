//! Produced interface: issue a session, rotate a session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use secrecy::ExposeSecret;
use tracing::{info, instrument};

use crate::clock::Clock;
use crate::config::Config;
use crate::error::TokenError;
use crate::guard::{CredentialHasher, ReuseGuard};
use crate::issuer::{TokenIssuer, TokenPair};
use crate::jwt::{TokenCodec, TokenKind};
use crate::metrics;
use crate::rotation::RotationProtocol;
use crate::store::SessionStore;

/// Longest accepted subject identifier, in characters.
pub const MAX_SUBJECT_LENGTH: usize = 256;

/// Issues and rotates credential pairs.
pub struct SessionService {
    issuer: Arc<TokenIssuer>,
    guard: Arc<ReuseGuard>,
    rotation: RotationProtocol,
}

impl SessionService {
    /// Assemble a service from its parts.
    pub fn new(issuer: Arc<TokenIssuer>, guard: Arc<ReuseGuard>) -> Self {
        let rotation = RotationProtocol::new(issuer.clone(), guard.clone());
        Self { issuer, guard, rotation }
    }

    /// Build a service from configuration.
    ///
    /// # Errors
    ///
    /// `Config` if a token lifetime does not fit in Unix seconds.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        let access = TokenCodec::new(
            config.access_secret.expose_secret().as_bytes(),
            TokenKind::Access,
            config.access_algorithm,
        );
        let refresh = TokenCodec::new(
            config.refresh_secret.expose_secret().as_bytes(),
            TokenKind::Refresh,
            config.refresh_algorithm,
        );
        let issuer = TokenIssuer::new(access, refresh, clock).with_ttls(
            ttl_seconds("ACCESS_TOKEN_TTL", config.access_token_ttl)?,
            ttl_seconds("REFRESH_TOKEN_TTL", config.refresh_token_ttl)?,
        );
        let guard = ReuseGuard::new(store, CredentialHasher::new(config.hash_iterations));

        Ok(Self::new(Arc::new(issuer), Arc::new(guard)))
    }

    /// Issue a new pair for `subject`, replacing any current session.
    ///
    /// # Errors
    ///
    /// `InvalidSubject`, `SigningError` or `PersistenceError`.
    #[instrument(skip(self))]
    pub async fn issue(&self, subject: &str) -> Result<TokenPair, TokenError> {
        validate_subject(subject)?;

        let pair = self.issuer.issue_pair(subject)?;
        self.guard.store(subject, &pair.refresh_token).await?;

        metrics::record_pair_issued("login");
        info!(correlation_id = %pair.correlation_id, "Issued session");
        Ok(pair)
    }

    /// Redeem a presented pair for a new one.
    ///
    /// # Errors
    ///
    /// See [`RotationProtocol::rotate`].
    pub async fn rotate(&self, access_token: &str, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let start = Instant::now();
        let result = self.rotation.rotate(access_token, refresh_token).await;

        let outcome = match &result {
            Ok(_) => {
                metrics::record_pair_issued("rotation");
                "success"
            }
            Err(e) => e.code(),
        };
        metrics::record_rotation(outcome, start.elapsed().as_secs_f64());
        result
    }
}

fn ttl_seconds(name: &str, ttl: Duration) -> Result<i64, TokenError> {
    i64::try_from(ttl.as_secs()).map_err(|_| TokenError::config(format!("{name} is out of range")))
}

/// Check that `subject` is usable as a session key.
///
/// # Errors
///
/// `InvalidSubject` if it is blank, longer than [`MAX_SUBJECT_LENGTH`]
/// or contains control characters.
pub fn validate_subject(subject: &str) -> Result<(), TokenError> {
    if subject.trim().is_empty() {
        return Err(TokenError::InvalidSubject("subject is empty".to_string()));
    }
    if subject.chars().count() > MAX_SUBJECT_LENGTH {
        return Err(TokenError::InvalidSubject(format!(
            "subject exceeds {MAX_SUBJECT_LENGTH} characters"
        )));
    }
    if subject.chars().any(char::is_control) {
        return Err(TokenError::InvalidSubject(
            "subject contains control characters".to_string(),
        ));
    }
    Ok(())
}
