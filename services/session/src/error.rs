//! Error type for issuance and rotation.
//!
//! Every failure belongs to one [`ErrorClass`] so callers can tell
//! "fix the request" from "re-authenticate" from "retry later".

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Broad failure classes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself is unusable; nothing was changed.
    ClientInput,
    /// A credential was rejected; nothing was changed.
    Credential,
    /// A collaborator failed; no unconfirmed state was left behind.
    Infrastructure,
}

/// Errors produced by the token codec, issuer, reuse guard and rotation protocol.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TokenError {
    /// Subject identifier is empty, too long or contains control characters
    #[error("Invalid subject: {0}")]
    InvalidSubject(String),

    /// Token has the wrong shape or encoding
    #[error("Token malformed: {0}")]
    Malformed(String),

    /// Recomputed signature does not match
    #[error("Token signature invalid")]
    InvalidSignature,

    /// Token expiry has passed
    #[error("Token expired at {expired_at}")]
    Expired {
        /// When the token expired
        expired_at: DateTime<Utc>,
    },

    /// Header names an algorithm outside the HMAC family
    #[error("Unexpected signing algorithm: {0}")]
    UnexpectedAlgorithm(String),

    /// Refresh token expired; the caller must authenticate again
    #[error("Refresh token expired")]
    RefreshExpired,

    /// Access and refresh tokens were not issued together
    #[error("Token pair mismatch")]
    PairMismatch,

    /// Refresh token is not the current one for its subject
    #[error("Refresh token reused - replay attack detected")]
    ReuseDetected,

    /// No session record exists for the subject
    #[error("No active session")]
    NoActiveSession,

    /// Claims could not be signed
    #[error("Token signing failed: {0}")]
    SigningError(String),

    /// Session store failed
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// Another rotation for the same subject committed first
    #[error("Concurrent rotation detected")]
    ConcurrentRotation,

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TokenError {
    /// Create a malformed-token error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }

    /// Create a persistence error.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::PersistenceError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Expired error for a Unix timestamp.
    #[must_use]
    pub fn expired_at(exp: i64) -> Self {
        Self::Expired {
            expired_at: DateTime::from_timestamp(exp, 0).unwrap_or_default(),
        }
    }

    /// Failure class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidSubject(_) | Self::Malformed(_) => ErrorClass::ClientInput,
            Self::InvalidSignature
            | Self::Expired { .. }
            | Self::UnexpectedAlgorithm(_)
            | Self::RefreshExpired
            | Self::PairMismatch
            | Self::ReuseDetected
            | Self::NoActiveSession => ErrorClass::Credential,
            Self::SigningError(_)
            | Self::PersistenceError(_)
            | Self::ConcurrentRotation
            | Self::Config(_)
            | Self::Internal(_) => ErrorClass::Infrastructure,
        }
    }

    /// Whether retrying the same request may succeed.
    ///
    /// After a persistence failure the presented refresh token is still the
    /// current one. After a concurrent rotation a retry reports reuse.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceError(_) | Self::ConcurrentRotation)
    }

    /// Whether the caller has to start a new session.
    #[must_use]
    pub const fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::RefreshExpired | Self::ReuseDetected | Self::NoActiveSession)
    }

    /// Stable error code for API responses.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSubject(_) => "INVALID_SUBJECT",
            Self::Malformed(_) => "TOKEN_MALFORMED",
            Self::InvalidSignature => "TOKEN_INVALID_SIGNATURE",
            Self::Expired { .. } => "TOKEN_EXPIRED",
            Self::UnexpectedAlgorithm(_) => "TOKEN_UNEXPECTED_ALGORITHM",
            Self::RefreshExpired => "TOKEN_REFRESH_EXPIRED",
            Self::PairMismatch => "TOKEN_PAIR_MISMATCH",
            Self::ReuseDetected => "TOKEN_REFRESH_REUSED",
            Self::NoActiveSession => "NO_ACTIVE_SESSION",
            Self::SigningError(_) => "TOKEN_SIGNING_FAILED",
            Self::PersistenceError(_) => "PERSISTENCE_UNAVAILABLE",
            Self::ConcurrentRotation => "CONCURRENT_ROTATION",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                Self::UnexpectedAlgorithm(err.to_string())
            }
            ErrorKind::InvalidKeyFormat | ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidRsaKey(_) => {
                Self::SigningError(err.to_string())
            }
            _ => Self::Malformed(err.to_string()),
        }
    }
}
