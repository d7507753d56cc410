//! Session service library.
//!
//! Issues correlated access/refresh token pairs, rotates them on refresh
//! and detects redemption of refresh tokens that were already rotated away.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod issuer;
pub mod jwt;
pub mod metrics;
pub mod rotation;
pub mod service;
pub mod shutdown;
pub mod store;

// Re-exports for convenience
pub use config::Config;
pub use error::{ErrorClass, TokenError};
pub use issuer::{TokenIssuer, TokenPair};
pub use rotation::{RotationProtocol, RotationStage};
pub use service::SessionService;
