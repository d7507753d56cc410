//! Slow salted hashing of refresh credentials.
//!
//! Encoded form: `pbkdf2-sha256$<iterations>$<salt>$<hash>` with standard
//! base64 for salt and hash. Verification reads the iteration count from
//! the encoded value, so records written under an older setting stay
//! verifiable after the count is raised.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::TokenError;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Lowest accepted iteration count.
pub const MIN_ITERATIONS: u32 = 1_000;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

/// PBKDF2-HMAC-SHA256 credential hasher.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    iterations: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl CredentialHasher {
    /// Hasher using `iterations` rounds, raised to [`MIN_ITERATIONS`] if lower.
    #[must_use]
    pub const fn new(iterations: u32) -> Self {
        let iterations = if iterations < MIN_ITERATIONS { MIN_ITERATIONS } else { iterations };
        Self { iterations }
    }

    /// Configured iteration count.
    #[must_use]
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash `credential` with a fresh random salt.
    #[must_use]
    pub fn hash(&self, credential: &str) -> String {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);

        let digest = derive(credential, &salt, self.iterations);
        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            STANDARD.encode(salt),
            STANDARD.encode(digest)
        )
    }

    /// Check `credential` against an encoded hash in constant time.
    ///
    /// # Errors
    ///
    /// `Internal` if `encoded` is not a hash produced by this scheme.
    pub fn verify(&self, credential: &str, encoded: &str) -> Result<bool, TokenError> {
        let parsed = parse(encoded)?;
        let digest = derive(credential, &parsed.salt, parsed.iterations);
        Ok(bool::from(digest.as_slice().ct_eq(parsed.hash.as_slice())))
    }

    /// [`hash`](Self::hash) on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// `Internal` if the blocking task fails.
    pub async fn hash_blocking(&self, credential: &str) -> Result<String, TokenError> {
        let hasher = *self;
        let credential = credential.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&credential))
            .await
            .map_err(|e| TokenError::internal(format!("hash task: {e}")))
    }

    /// [`verify`](Self::verify) on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// `Internal` if the blocking task fails or `encoded` is unreadable.
    pub async fn verify_blocking(&self, credential: &str, encoded: &str) -> Result<bool, TokenError> {
        let hasher = *self;
        let credential = credential.to_string();
        let encoded = encoded.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&credential, &encoded))
            .await
            .map_err(|e| TokenError::internal(format!("verify task: {e}")))?
    }
}

struct ParsedHash {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

fn derive(credential: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(credential.as_bytes(), salt, iterations, &mut out);
    out
}

fn parse(encoded: &str) -> Result<ParsedHash, TokenError> {
    let invalid = || TokenError::internal("stored credential hash is unreadable");

    let mut parts = encoded.split('$');
    if parts.next() != Some(SCHEME) {
        return Err(invalid());
    }
    let iterations: u32 = parts.next().and_then(|s| s.parse().ok()).ok_or_else(invalid)?;
    let salt = parts.next().and_then(|s| STANDARD.decode(s).ok()).ok_or_else(invalid)?;
    let hash = parts.next().and_then(|s| STANDARD.decode(s).ok()).ok_or_else(invalid)?;

    if parts.next().is_some() || iterations == 0 || hash.len() != HASH_LENGTH {
        return Err(invalid());
    }
    Ok(ParsedHash { iterations, salt, hash })
}
