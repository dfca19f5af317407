//! Crypto utilities: AEAD sealing, key rotation, random tokens.
//!
//! Nothing in this module performs I/O beyond reading the operating system
//! random source. Every failure is fatal to the caller; there is no
//! unauthenticated fallback encoding.

pub mod encryption;
pub mod keyring;
pub mod tokens;

pub use encryption::{CryptoError, CryptoResult, EncryptionService, KEY_LEN, NONCE_LEN, TAG_LEN};
pub use keyring::{KeyRing, KeySlot};
pub use tokens::{constant_time_eq, random_token, TOKEN_BYTES};
