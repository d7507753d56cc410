//! Refresh rotation.
//!
//! A rotation attempt walks through
//! `Received -> Decoded -> Correlated -> ReuseChecked -> Reissued -> Committed`
//! and stops at `Rejected` on the first failing gate. Nothing is written
//! before `Reissued`, and the new pair is only handed out once `Committed`.
//! The commit is a compare-and-swap against the hash observed at the reuse
//! check, so two redemptions of one credential cannot both commit.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::TokenError;
use crate::guard::ReuseGuard;
use crate::issuer::{TokenIssuer, TokenPair};
use crate::metrics;

/// Progress of a single rotation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStage {
    /// Credentials received, nothing checked yet
    Received,
    /// Both credentials verified; refresh not expired
    Decoded,
    /// Both credentials come from the same issuance
    Correlated,
    /// Refresh credential is the current one for its subject
    ReuseChecked,
    /// Replacement pair signed
    Reissued,
    /// Replacement hash stored; old credential retired
    Committed,
    /// A gate failed
    Rejected,
}

impl RotationStage {
    /// Label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Decoded => "decoded",
            Self::Correlated => "correlated",
            Self::ReuseChecked => "reuse_checked",
            Self::Reissued => "reissued",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
        }
    }

    /// Whether the attempt has finished.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Rejected)
    }
}

impl fmt::Display for RotationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates a presented pair and replaces it with a new one.
pub struct RotationProtocol {
    issuer: Arc<TokenIssuer>,
    guard: Arc<ReuseGuard>,
}

impl RotationProtocol {
    /// Create a protocol over an issuer and a reuse guard.
    pub fn new(issuer: Arc<TokenIssuer>, guard: Arc<ReuseGuard>) -> Self {
        Self { issuer, guard }
    }

    /// Redeem a refresh credential for a new pair.
    ///
    /// `access_token` and `refresh_token` are in compact form. The access
    /// credential may be expired; the refresh credential may not.
    ///
    /// # Errors
    ///
    /// `Malformed`, `InvalidSignature` or `UnexpectedAlgorithm` for bad
    /// credentials, `RefreshExpired`, `PairMismatch`, `ReuseDetected`,
    /// `SigningError`, `PersistenceError` or `ConcurrentRotation`.
    pub async fn rotate(&self, access_token: &str, refresh_token: &str) -> Result<TokenPair, TokenError> {
        let mut stage = RotationStage::Received;

        match self.run(&mut stage, access_token, refresh_token).await {
            Ok(pair) => {
                info!(
                    subject = %pair.subject,
                    correlation_id = %pair.correlation_id,
                    stage = %RotationStage::Committed,
                    "Rotated token pair"
                );
                Ok(pair)
            }
            Err(err) => {
                debug!(
                    failed_after = %stage,
                    stage = %RotationStage::Rejected,
                    code = err.code(),
                    "Rotation rejected"
                );
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        stage: &mut RotationStage,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, TokenError> {
        let now = self.issuer.now();
        let refresh = self
            .issuer
            .refresh_codec()
            .verify(refresh_token, now)
            .map_err(|e| match e {
                TokenError::Expired { .. } => TokenError::RefreshExpired,
                other => other,
            })?;
        let access = self.issuer.access_codec().verify_signature(access_token)?;
        advance(stage, RotationStage::Decoded, &refresh.sub);

        if !access.is_correlated_with(&refresh) {
            return Err(TokenError::PairMismatch);
        }
        advance(stage, RotationStage::Correlated, &refresh.sub);

        let subject = refresh.sub;
        let observed = match self.guard.check(&subject, refresh_token).await {
            Ok(Some(observed)) => observed,
            Ok(None) | Err(TokenError::NoActiveSession) => {
                warn!(
                    subject = %subject,
                    correlation_id = %refresh.cid,
                    "Refresh token reuse detected"
                );
                metrics::record_security_event("REFRESH_REUSE");
                return Err(TokenError::ReuseDetected);
            }
            Err(e) => return Err(e),
        };
        advance(stage, RotationStage::ReuseChecked, &subject);

        let pair = self.issuer.issue_pair(&subject)?;
        advance(stage, RotationStage::Reissued, &subject);

        match self.guard.replace(&subject, &observed, &pair.refresh_token).await {
            Ok(()) => {}
            Err(TokenError::ConcurrentRotation) => {
                warn!(subject = %subject, "Concurrent rotation lost the race");
                return Err(TokenError::ConcurrentRotation);
            }
            Err(TokenError::NoActiveSession) => return Err(TokenError::ReuseDetected),
            Err(e) => return Err(e),
        }
        *stage = RotationStage::Committed;

        Ok(pair)
    }
}

fn advance(stage: &mut RotationStage, next: RotationStage, subject: &str) {
    *stage = next;
    debug!(subject = %subject, stage = %next, "Rotation stage");
}
