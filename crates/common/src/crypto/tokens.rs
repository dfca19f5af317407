//! Random tokens and constant-time comparison.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use super::encryption::{fill_random, CryptoResult};

/// Number of random bytes behind every generated token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Generate `len` random bytes encoded as unpadded base64url.
pub fn random_token(len: usize) -> CryptoResult<String> {
    let mut bytes = vec![0u8; len];
    fill_random(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Compare two byte strings without short-circuiting on the first mismatch.
///
/// Only the length difference is observable through timing.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
