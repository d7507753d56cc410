//! Centralized configuration for the session service.
//!
//! All configuration is loaded from environment variables and validated
//! at startup. Signing secrets are held as [`SecretString`] and never
//! printed.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::TokenError;
use crate::guard::hasher::{DEFAULT_ITERATIONS, MIN_ITERATIONS};
use crate::jwt::SigningTier;

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Longest accepted token lifetime (one year), in seconds.
pub const MAX_TOKEN_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Session persistence backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local map; sessions are lost on restart
    Memory,
    /// Redis hash per subject
    Redis,
}

impl FromStr for StoreBackend {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            _ => Err(TokenError::config(format!("Invalid SESSION_STORE: {s}"))),
        }
    }
}

/// Session service configuration.
#[derive(Debug)]
pub struct Config {
    // Server settings
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    // Signing settings
    /// Secret for access credentials
    pub access_secret: SecretString,
    /// Secret for refresh credentials
    pub refresh_secret: SecretString,
    /// Access credential algorithm
    pub access_algorithm: SigningTier,
    /// Refresh credential algorithm, stronger than the access one
    pub refresh_algorithm: SigningTier,
    /// Access token TTL
    pub access_token_ttl: Duration,
    /// Refresh token TTL
    pub refresh_token_ttl: Duration,

    // Session storage
    /// PBKDF2 rounds for refresh credential hashes
    pub hash_iterations: u32,
    /// Persistence backend
    pub session_store: StoreBackend,
    /// Redis connection URL
    pub redis_url: String,
    /// Prefix for Redis session keys
    pub redis_key_prefix: String,

    // Logging
    /// Default log filter
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables and `.env`.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, TokenError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port = parse_var(&lookup, "PORT", 8080)?;

        let access_secret = required_secret(&lookup, "ACCESS_SECRET")?;
        let refresh_secret = required_secret(&lookup, "REFRESH_SECRET")?;
        if access_secret == refresh_secret {
            return Err(TokenError::config("ACCESS_SECRET and REFRESH_SECRET must differ"));
        }

        let access_algorithm = parse_tier("ACCESS_ALGORITHM", &var("ACCESS_ALGORITHM", "HS256"))?;
        let refresh_algorithm = parse_tier("REFRESH_ALGORITHM", &var("REFRESH_ALGORITHM", "HS512"))?;
        if refresh_algorithm <= access_algorithm {
            return Err(TokenError::config(format!(
                "REFRESH_ALGORITHM ({refresh_algorithm}) must be stronger than ACCESS_ALGORITHM ({access_algorithm})"
            )));
        }

        let access_token_ttl = parse_var(&lookup, "ACCESS_TOKEN_TTL", 900u64)?;
        let refresh_token_ttl = parse_var(&lookup, "REFRESH_TOKEN_TTL", 604_800u64)?;
        if access_token_ttl == 0 || refresh_token_ttl <= access_token_ttl {
            return Err(TokenError::config(
                "token TTLs must satisfy 0 < ACCESS_TOKEN_TTL < REFRESH_TOKEN_TTL",
            ));
        }
        if refresh_token_ttl > MAX_TOKEN_TTL_SECONDS {
            return Err(TokenError::config(format!(
                "REFRESH_TOKEN_TTL must be at most {MAX_TOKEN_TTL_SECONDS} seconds"
            )));
        }

        let hash_iterations = parse_var(&lookup, "HASH_ITERATIONS", DEFAULT_ITERATIONS)?;
        if hash_iterations < MIN_ITERATIONS {
            return Err(TokenError::config(format!(
                "HASH_ITERATIONS must be at least {MIN_ITERATIONS}"
            )));
        }

        let session_store = var("SESSION_STORE", "memory").parse()?;
        let redis_url = var("REDIS_URL", "redis://127.0.0.1:6379");
        let redis_key_prefix = var("REDIS_KEY_PREFIX", "session");

        let log_level = var("LOG_LEVEL", "info");
        let log_json = parse_var(&lookup, "LOG_JSON", false)?;

        Ok(Self {
            host,
            port,
            access_secret: SecretString::from(access_secret),
            refresh_secret: SecretString::from(refresh_secret),
            access_algorithm,
            refresh_algorithm,
            access_token_ttl: Duration::from_secs(access_token_ttl),
            refresh_token_ttl: Duration::from_secs(refresh_token_ttl),
            hash_iterations,
            session_store,
            redis_url,
            redis_key_prefix,
            log_level,
            log_json,
        })
    }

    /// `host:port` to bind the HTTP listener to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse variable `name` with a default value.
fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T, TokenError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(val) => val
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}

fn required_secret<F>(lookup: &F, name: &str) -> Result<String, TokenError>
where
    F: Fn(&str) -> Option<String>,
{
    let secret = lookup(name).ok_or_else(|| TokenError::config(format!("{name} is required")))?;
    if secret.len() < MIN_SECRET_LENGTH {
        return Err(TokenError::config(format!(
            "{name} must be at least {MIN_SECRET_LENGTH} bytes"
        )));
    }
    Ok(secret)
}

fn parse_tier(name: &str, value: &str) -> Result<SigningTier, TokenError> {
    value
        .parse()
        .map_err(|_| TokenError::config(format!("Invalid {name}: {value}")))
}
