//! Credential claims, signing and transport encoding.

pub mod claims;
pub mod codec;
pub mod wire;

pub use claims::{Claims, TokenKind};
pub use codec::{SigningTier, TokenCodec};
pub use wire::{decode_refresh, encode_refresh};
