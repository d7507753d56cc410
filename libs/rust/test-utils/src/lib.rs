//! Shared test utilities for auth-platform Rust services.
//!
//! This crate provides:
//! - Proptest generators for subjects and signing secrets
//! - Fixed fixtures for deterministic tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use generators::*;
