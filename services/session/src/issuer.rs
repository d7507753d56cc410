use std::fmt;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::TokenError;
use crate::jwt::{Claims, TokenCodec, TokenKind};

/// Default access credential lifetime (15 minutes).
pub const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;

/// Default refresh credential lifetime (7 days).
pub const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

/// A freshly issued, correlated access/refresh pair.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Compact signed access credential
    pub access_token: String,
    /// Compact signed refresh credential
    pub refresh_token: String,
    /// Correlation ID embedded in both credentials
    pub correlation_id: String,
    /// Subject the pair was issued for
    pub subject: String,
    /// Access expiry (Unix seconds)
    pub access_expires_at: i64,
    /// Refresh expiry (Unix seconds)
    pub refresh_expires_at: i64,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("subject", &self.subject)
            .field("correlation_id", &self.correlation_id)
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish_non_exhaustive()
    }
}

/// Builds correlated credential pairs.
pub struct TokenIssuer {
    access: TokenCodec,
    refresh: TokenCodec,
    access_ttl: i64,
    refresh_ttl: i64,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    /// Create an issuer with the default lifetimes.
    pub fn new(access: TokenCodec, refresh: TokenCodec, clock: Arc<dyn Clock>) -> Self {
        debug_assert_eq!(access.kind(), TokenKind::Access);
        debug_assert_eq!(refresh.kind(), TokenKind::Refresh);

        Self {
            access,
            refresh,
            access_ttl: DEFAULT_ACCESS_TTL_SECONDS,
            refresh_ttl: DEFAULT_REFRESH_TTL_SECONDS,
            clock,
        }
    }

    /// Override the credential lifetimes.
    #[must_use]
    pub const fn with_ttls(mut self, access_ttl: i64, refresh_ttl: i64) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    /// Issue a new pair for `subject` with a fresh correlation ID.
    ///
    /// # Errors
    ///
    /// `SigningError` if either credential cannot be signed.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, TokenError> {
        let correlation_id = Uuid::new_v4().to_string();
        let now = self.clock.now();

        let access_claims = Claims::new(subject, &correlation_id, TokenKind::Access, now, self.access_ttl);
        let refresh_claims =
            Claims::new(subject, &correlation_id, TokenKind::Refresh, now, self.refresh_ttl);

        let access_token = self.access.sign(&access_claims)?;
        let refresh_token = self.refresh.sign(&refresh_claims)?;

        debug!(
            subject = %subject,
            correlation_id = %correlation_id,
            "Issued token pair"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            correlation_id,
            subject: subject.to_string(),
            access_expires_at: access_claims.exp,
            refresh_expires_at: refresh_claims.exp,
        })
    }

    /// Codec for access credentials.
    #[must_use]
    pub const fn access_codec(&self) -> &TokenCodec {
        &self.access
    }

    /// Codec for refresh credentials.
    #[must_use]
    pub const fn refresh_codec(&self) -> &TokenCodec {
        &self.refresh
    }

    /// Current time of the issuer's clock.
    #[must_use]
    pub fn now(&self) -> i64 {
        self.clock.now()
    }
}
