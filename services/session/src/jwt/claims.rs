use serde::{Deserialize, Serialize};
use std::fmt;

/// Which half of a token pair a credential is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived credential presented to resource servers
    Access,
    /// Long-lived credential redeemable once for a new pair
    Refresh,
}

impl TokenKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by both credentials of a pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject GUID
    pub sub: String,
    /// Correlation ID shared by the access and refresh token of one issuance
    pub cid: String,
    /// Which half of the pair this is
    pub kind: TokenKind,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds)
    pub exp: i64,
}

impl Claims {
    /// Build claims valid from `now` for `ttl_seconds`.
    pub fn new(
        subject: impl Into<String>,
        correlation_id: impl Into<String>,
        kind: TokenKind,
        now: i64,
        ttl_seconds: i64,
    ) -> Self {
        Self {
            sub: subject.into(),
            cid: correlation_id.into(),
            kind,
            iat: now,
            exp: now.saturating_add(ttl_seconds),
        }
    }

    /// A token is expired from its expiry instant onwards.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Whether both claim sets came from the same issuance.
    #[must_use]
    pub fn is_correlated_with(&self, other: &Self) -> bool {
        self.cid == other.cid && self.sub == other.sub
    }
}
