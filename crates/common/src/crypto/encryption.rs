//! AES-256-GCM sealing of opaque blobs.
//!
//! A sealed blob is self-contained and laid out as
//!
//! ```text
//! nonce (12 bytes) || tag (16 bytes) || ciphertext
//! ```
//!
//! Every call to [`EncryptionService::encrypt_with_aad`] draws a fresh random
//! nonce from the operating system. Decryption verifies the tag before any
//! plaintext is released; a wrong key, a flipped bit, a truncated blob or
//! mismatched associated data all surface as [`CryptoError::Integrity`].
//!
//! ```rust
//! use postbridge_common::crypto::EncryptionService;
//!
//! let key = EncryptionService::generate_key()?;
//! let service = EncryptionService::new(&key)?;
//!
//! let sealed = service.encrypt_with_aad(b"state payload", b"auth-state")?;
//! let opened = service.decrypt_with_aad(&sealed, b"auth-state")?;
//! assert_eq!(opened, b"state payload");
//! # Ok::<(), postbridge_common::crypto::CryptoError>(())
//! ```

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroize;

/// Length of an AES-256 key in bytes.
pub const KEY_LEN: usize = 32;
/// Length of the GCM nonce prefix in bytes.
pub const NONCE_LEN: usize = 12;
/// Length of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Result alias for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Failures raised by the crypto utilities.
///
/// None of the variants carry plaintext or key material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Key material has the wrong length or encoding.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Authentication tag did not verify (tampering, wrong key, truncation).
    #[error("ciphertext failed integrity verification")]
    Integrity,

    /// The AEAD refused to encrypt the buffer.
    #[error("encryption failed")]
    Encryption,

    /// The operating system random source failed.
    #[error("secure random source unavailable: {0}")]
    Randomness(String),
}

/// AES-256-GCM service bound to a single key.
#[derive(Clone)]
pub struct EncryptionService {
    cipher: Aes256Gcm,
    fingerprint: String,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("key", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl EncryptionService {
    /// Create a service from a raw 32-byte key.
    pub fn new(key: &[u8]) -> CryptoResult<Self> {
        if key.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CryptoError::InvalidKey(format!("cipher rejected key: {e}")))?;

        Ok(Self { cipher, fingerprint: fingerprint(key) })
    }

    /// Generate a random 32-byte symmetric key.
    pub fn generate_key() -> CryptoResult<Vec<u8>> {
        let mut key = vec![0u8; KEY_LEN];
        fill_random(&mut key)?;
        Ok(key)
    }

    /// Short, non-reversible identifier of the key, safe to log.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Seal `plaintext` without associated data.
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
        self.encrypt_with_aad(plaintext, &[])
    }

    /// Seal `plaintext`, binding the blob to `aad`.
    pub fn encrypt_with_aad(&self, plaintext: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        fill_random(&mut nonce)?;

        let mut buffer = plaintext.to_vec();
        let tag = match self.cipher.encrypt_in_place_detached(
            Nonce::from_slice(&nonce),
            aad,
            &mut buffer,
        ) {
            Ok(tag) => tag,
            Err(_) => {
                buffer.zeroize();
                return Err(CryptoError::Encryption);
            }
        };

        let mut blob = Vec::with_capacity(NONCE_LEN + TAG_LEN + buffer.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(tag.as_slice());
        blob.extend_from_slice(&buffer);
        Ok(blob)
    }

    /// Open a blob sealed without associated data.
    pub fn decrypt(&self, blob: &[u8]) -> CryptoResult<Vec<u8>> {
        self.decrypt_with_aad(blob, &[])
    }

    /// Open a blob sealed with `aad`.
    pub fn decrypt_with_aad(&self, blob: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>> {
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(CryptoError::Integrity);
        }

        let (nonce, rest) = blob.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);

        let mut buffer = ciphertext.to_vec();
        match self.cipher.decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            aad,
            &mut buffer,
            Tag::from_slice(tag),
        ) {
            Ok(()) => Ok(buffer),
            Err(_) => {
                buffer.zeroize();
                Err(CryptoError::Integrity)
            }
        }
    }

    /// Seal and encode as unpadded base64url, safe for query strings and
    /// cookies.
    pub fn encrypt_to_string(&self, plaintext: &[u8], aad: &[u8]) -> CryptoResult<String> {
        self.encrypt_with_aad(plaintext, aad).map(|blob| URL_SAFE_NO_PAD.encode(blob))
    }

    /// Decode an unpadded base64url blob and open it.
    ///
    /// Undecodable input is reported as an integrity failure.
    pub fn decrypt_from_string(&self, encoded: &str, aad: &[u8]) -> CryptoResult<Vec<u8>> {
        let blob = URL_SAFE_NO_PAD.decode(encoded.trim()).map_err(|_| CryptoError::Integrity)?;
        self.decrypt_with_aad(&blob, aad)
    }
}

/// Fill `buf` from the operating system random source.
pub(crate) fn fill_random(buf: &mut [u8]) -> CryptoResult<()> {
    OsRng.try_fill_bytes(buf).map_err(|e| CryptoError::Randomness(e.to_string()))
}

fn fingerprint(key: &[u8]) -> String {
    let digest = Sha256::digest(key);
    hex::encode(&digest[..4])
}
