//! Key rotation support.
//!
//! A [`KeyRing`] always seals with its current key and opens with the current
//! key first, then each previous key in the order they were added. Blobs
//! sealed under a retired key keep opening for as long as that key stays in
//! the ring; nothing is re-encrypted in place.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use zeroize::Zeroizing;

use super::encryption::{CryptoError, CryptoResult, EncryptionService, KEY_LEN};

/// Which key in the ring opened a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySlot {
    /// The key new blobs are sealed with.
    Current,
    /// A retired key, by position in the previous-key list.
    Previous(usize),
}

/// Current key plus retired keys still accepted for decryption.
#[derive(Clone)]
pub struct KeyRing {
    current: EncryptionService,
    previous: Vec<EncryptionService>,
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("current", &self.current.fingerprint())
            .field(
                "previous",
                &self.previous.iter().map(EncryptionService::fingerprint).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl KeyRing {
    /// Build a ring from the raw current key.
    pub fn new(current_key: &[u8]) -> CryptoResult<Self> {
        Ok(Self { current: EncryptionService::new(current_key)?, previous: Vec::new() })
    }

    /// Add a retired key that should still open existing blobs.
    pub fn with_previous(mut self, key: &[u8]) -> CryptoResult<Self> {
        self.previous.push(EncryptionService::new(key)?);
        Ok(self)
    }

    /// Build a ring from encoded key material.
    ///
    /// Each key may be 64 hex characters or base64 (standard or url-safe)
    /// of exactly 32 bytes.
    pub fn from_encoded<S: AsRef<str>>(current: &str, previous: &[S]) -> CryptoResult<Self> {
        let key = decode_key(current)?;
        let mut ring = Self::new(&key)?;
        for encoded in previous {
            let key = decode_key(encoded.as_ref())?;
            ring = ring.with_previous(&key)?;
        }
        Ok(ring)
    }

    /// Fingerprint of the current key.
    pub fn current_fingerprint(&self) -> &str {
        self.current.fingerprint()
    }

    /// Number of retired keys still accepted.
    pub fn previous_len(&self) -> usize {
        self.previous.len()
    }

    /// Seal with the current key.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>> {
        self.current.encrypt_with_aad(plaintext, aad)
    }

    /// Seal with the current key and encode as unpadded base64url.
    pub fn seal_to_string(&self, plaintext: &[u8], aad: &[u8]) -> CryptoResult<String> {
        self.current.encrypt_to_string(plaintext, aad)
    }

    /// Open a blob with whichever key in the ring sealed it.
    pub fn open(&self, blob: &[u8], aad: &[u8]) -> CryptoResult<Vec<u8>> {
        self.open_with_slot(blob, aad).map(|(plaintext, _)| plaintext)
    }

    /// Open a blob and report which key opened it.
    pub fn open_with_slot(&self, blob: &[u8], aad: &[u8]) -> CryptoResult<(Vec<u8>, KeySlot)> {
        if let Ok(plaintext) = self.current.decrypt_with_aad(blob, aad) {
            return Ok((plaintext, KeySlot::Current));
        }

        for (index, service) in self.previous.iter().enumerate() {
            if let Ok(plaintext) = service.decrypt_with_aad(blob, aad) {
                return Ok((plaintext, KeySlot::Previous(index)));
            }
        }

        Err(CryptoError::Integrity)
    }

    /// Decode an unpadded base64url blob and open it.
    pub fn open_str(&self, encoded: &str, aad: &[u8]) -> CryptoResult<Vec<u8>> {
        self.open_str_with_slot(encoded, aad).map(|(plaintext, _)| plaintext)
    }

    /// Decode an unpadded base64url blob, open it, and report the key slot.
    pub fn open_str_with_slot(
        &self,
        encoded: &str,
        aad: &[u8],
    ) -> CryptoResult<(Vec<u8>, KeySlot)> {
        let blob = URL_SAFE_NO_PAD.decode(encoded.trim()).map_err(|_| CryptoError::Integrity)?;
        self.open_with_slot(&blob, aad)
    }

    /// Whether an encoded blob only opens under a retired key.
    ///
    /// Blobs that do not open at all report `Err(Integrity)`.
    pub fn needs_reencryption(&self, encoded: &str, aad: &[u8]) -> CryptoResult<bool> {
        self.open_str_with_slot(encoded, aad).map(|(_, slot)| slot != KeySlot::Current)
    }
}

fn decode_key(encoded: &str) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let trimmed = encoded.trim();

    let decoded = if trimmed.len() == KEY_LEN * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit())
    {
        hex::decode(trimmed).ok()
    } else {
        STANDARD
            .decode(trimmed)
            .ok()
            .or_else(|| URL_SAFE_NO_PAD.decode(trimmed.trim_end_matches('=')).ok())
    };

    match decoded {
        Some(bytes) if bytes.len() == KEY_LEN => Ok(Zeroizing::new(bytes)),
        Some(bytes) => Err(CryptoError::InvalidKey(format!(
            "decoded key is {} bytes, expected {KEY_LEN}",
            bytes.len()
        ))),
        None => Err(CryptoError::InvalidKey("key is neither hex nor base64".into())),
    }
}
