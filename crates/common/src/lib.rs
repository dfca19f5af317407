//! Modular common utilities shared across Postbridge crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error taxonomy and classification
//! - `crypto`: AEAD sealing, key rotation, PKCE, random tokens, secret strings

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;

// Crypto tier
// --------------------------------------------------------------------
#[cfg(feature = "crypto")]
pub mod auth;
#[cfg(feature = "crypto")]
pub mod crypto;
#[cfg(feature = "crypto")]
pub mod security;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "crypto")]
pub use crypto::{CryptoError, CryptoResult, EncryptionService, KeyRing, KeySlot};
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "crypto")]
pub use security::SecureString;
