//! PKCE (Proof Key for Code Exchange, RFC 7636) and OAuth state tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::crypto::{constant_time_eq, random_token, CryptoResult, TOKEN_BYTES};

/// Challenge method sent alongside every PKCE challenge.
pub const CHALLENGE_METHOD: &str = "S256";

/// Generate a cryptographically secure code verifier
///
/// 32 random bytes, base64url without padding: always 43 characters, inside
/// the 43-128 envelope RFC 7636 allows.
pub fn generate_code_verifier() -> CryptoResult<String> {
    random_token(TOKEN_BYTES)
}

/// Derive the S256 code challenge for `verifier`
///
/// `BASE64URL(SHA256(ASCII(code_verifier)))` without padding. Deterministic.
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state token for CSRF protection (256 bits).
pub fn generate_state() -> CryptoResult<String> {
    random_token(TOKEN_BYTES)
}

/// Validate that the returned state token matches the one that was issued.
///
/// Runs in constant time with respect to the token contents.
pub fn validate_state(expected: &str, actual: &str) -> bool {
    constant_time_eq(expected.as_bytes(), actual.as_bytes())
}

/// Verifier and challenge pair for one authorization attempt.
#[derive(Clone)]
pub struct PkcePair {
    /// Random secret kept until the token exchange.
    pub code_verifier: String,

    /// S256 challenge sent in the authorization request.
    pub code_challenge: String,
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("code_verifier", &"[REDACTED]")
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}

impl PkcePair {
    /// Generate a fresh verifier and its challenge.
    pub fn generate() -> CryptoResult<Self> {
        let code_verifier = generate_code_verifier()?;
        let code_challenge = generate_code_challenge(&code_verifier);
        Ok(Self { code_verifier, code_challenge })
    }

    /// Get the challenge method (always "S256")
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        CHALLENGE_METHOD
    }
}
