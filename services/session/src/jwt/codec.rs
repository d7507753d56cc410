//! Compact HMAC-signed token encoding and verification.
//!
//! Tokens are the usual three base64url segments (header, payload,
//! signature). Only the HMAC family is accepted; the header algorithm is
//! inspected before signature verification so that foreign algorithm names
//! are reported as such instead of as a generic parse failure.

use std::fmt;
use std::str::FromStr;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Deserialize;

use crate::error::TokenError;
use crate::jwt::claims::{Claims, TokenKind};

const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// HMAC strength used to sign a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SigningTier {
    /// HMAC with SHA-256
    Hs256,
    /// HMAC with SHA-384
    Hs384,
    /// HMAC with SHA-512
    Hs512,
}

impl SigningTier {
    /// Algorithm written into the token header.
    #[must_use]
    pub const fn algorithm(self) -> Algorithm {
        match self {
            Self::Hs256 => Algorithm::HS256,
            Self::Hs384 => Algorithm::HS384,
            Self::Hs512 => Algorithm::HS512,
        }
    }

    /// Header name of the algorithm.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
        }
    }
}

impl FromStr for SigningTier {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "HS256" => Ok(Self::Hs256),
            "HS384" => Ok(Self::Hs384),
            "HS512" => Ok(Self::Hs512),
            _ => Err(TokenError::UnexpectedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for SigningTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Signs and verifies one kind of credential with one secret.
pub struct TokenCodec {
    kind: TokenKind,
    tier: SigningTier,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec for `kind` credentials signed with `secret` at `tier`.
    #[must_use]
    pub fn new(secret: &[u8], kind: TokenKind, tier: SigningTier) -> Self {
        let mut validation = Validation::new(tier.algorithm());
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        // Expiry is checked against the injected clock, without leeway.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Self {
            kind,
            tier,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Credential kind handled by this codec.
    #[must_use]
    pub const fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Signing strength of this codec.
    #[must_use]
    pub const fn tier(&self) -> SigningTier {
        self.tier
    }

    /// Serialize and sign `claims`.
    ///
    /// # Errors
    ///
    /// `SigningError` if the claims are for another credential kind or
    /// cannot be serialized.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        if claims.kind != self.kind {
            return Err(TokenError::SigningError(format!(
                "{} codec cannot sign {} claims",
                self.kind, claims.kind
            )));
        }

        encode(&Header::new(self.tier.algorithm()), claims, &self.encoding_key)
            .map_err(|e| TokenError::SigningError(e.to_string()))
    }

    /// Verify signature and expiry at `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// `Malformed`, `UnexpectedAlgorithm`, `InvalidSignature`, or `Expired`
    /// when `now` has reached the embedded expiry.
    pub fn verify(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let claims = self.verify_signature(token)?;
        if claims.is_expired_at(now) {
            return Err(TokenError::expired_at(claims.exp));
        }
        Ok(claims)
    }

    /// Verify the signature only, ignoring expiry.
    ///
    /// # Errors
    ///
    /// `Malformed`, `UnexpectedAlgorithm` or `InvalidSignature`.
    pub fn verify_signature(&self, token: &str) -> Result<Claims, TokenError> {
        let header = header_segment(token)?;
        check_algorithm(header)?;

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;
        if claims.kind != self.kind {
            return Err(TokenError::malformed(format!(
                "expected {} token, got {}",
                self.kind, claims.kind
            )));
        }
        Ok(claims)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("kind", &self.kind)
            .field("tier", &self.tier)
            .finish_non_exhaustive()
    }
}

fn header_segment(token: &str) -> Result<&str, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }
    Ok(segments[0])
}

fn check_algorithm(header_segment: &str) -> Result<(), TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(header_segment)
        .map_err(|e| TokenError::malformed(format!("header encoding: {e}")))?;
    let header: RawHeader = serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::malformed(format!("header json: {e}")))?;

    if [SigningTier::Hs256, SigningTier::Hs384, SigningTier::Hs512]
        .iter()
        .any(|tier| tier.as_str() == header.alg)
    {
        Ok(())
    } else {
        Err(TokenError::UnexpectedAlgorithm(header.alg))
    }
}
