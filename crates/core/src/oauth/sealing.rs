//! Sealing of credentials and authorization state.
//!
//! Both payloads are serialized to JSON and sealed with the key ring under
//! distinct associated data, so a sealed credential can never be replayed as
//! an authorization state or the other way round.

use postbridge_common::{CommonError, CryptoError, KeyRing};
use postbridge_domain::{
    AuthState, IntegrationError, PlatformAuthData, Result, SealedCredential, StateRejection,
};
use serde::Serialize;
use zeroize::Zeroizing;

const CREDENTIAL_AAD: &[u8] = b"postbridge:credentials:v1";
const AUTH_STATE_AAD: &[u8] = b"postbridge:auth-state:v1";

/// Seals and opens the two encrypted payloads of the integration layer.
#[derive(Debug, Clone)]
pub struct CredentialSealer {
    ring: KeyRing,
}

impl CredentialSealer {
    pub fn new(ring: KeyRing) -> Self {
        Self { ring }
    }

    pub fn seal_credential(&self, credential: &PlatformAuthData) -> Result<SealedCredential> {
        let plaintext = Zeroizing::new(serialize(credential)?);
        Ok(SealedCredential::new(self.ring.seal_to_string(&plaintext, CREDENTIAL_AAD)?))
    }

    /// Open a stored credential. Any failure is `Integrity`.
    pub fn open_credential(&self, sealed: &SealedCredential) -> Result<PlatformAuthData> {
        let plaintext = Zeroizing::new(self.ring.open_str(sealed.as_str(), CREDENTIAL_AAD)?);
        serde_json::from_slice(&plaintext).map_err(|_| IntegrationError::Integrity)
    }

    /// Whether a stored credential is sealed under a retired key.
    pub fn credential_needs_reencryption(&self, sealed: &SealedCredential) -> Result<bool> {
        Ok(self.ring.needs_reencryption(sealed.as_str(), CREDENTIAL_AAD)?)
    }

    pub fn seal_state(&self, state: &AuthState) -> Result<String> {
        let plaintext = Zeroizing::new(serialize(state)?);
        Ok(self.ring.seal_to_string(&plaintext, AUTH_STATE_AAD)?)
    }

    /// Open a caller-supplied state blob.
    ///
    /// The blob crosses a trust boundary, so every failure is reported as a
    /// state rejection rather than a crypto error.
    pub fn open_state(&self, encoded: &str) -> Result<AuthState> {
        let plaintext = Zeroizing::new(self.ring.open_str(encoded, AUTH_STATE_AAD).map_err(
            |err| match err {
                CryptoError::Integrity => IntegrationError::state(StateRejection::Tampered),
                other => IntegrationError::from(other),
            },
        )?);
        serde_json::from_slice(&plaintext)
            .map_err(|_| IntegrationError::state(StateRejection::Incomplete))
    }
}

fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value).map_err(CommonError::from)?)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use postbridge_common::EncryptionService;
    use postbridge_domain::Platform;

    use super::*;

    fn sealer() -> CredentialSealer {
        CredentialSealer::new(KeyRing::new(&EncryptionService::generate_key().unwrap()).unwrap())
    }

    fn sample_state() -> AuthState {
        AuthState {
            state: "state-token".into(),
            code_verifier: None,
            request_token: None,
            request_token_secret: None,
            user_id: "user-1".into(),
            platform: Platform::LinkedIn,
            created_at: Utc::now(),
            redirect_uri: "https://app.example/callback".into(),
            redirect_target: None,
            instance_url: None,
        }
    }

    #[test]
    fn credential_round_trip() {
        let sealer = sealer();
        let auth = PlatformAuthData::bearer("access", Some(3600), Utc::now())
            .with_refresh_token(Some("refresh".into()));

        let sealed = sealer.seal_credential(&auth).unwrap();
        assert!(!sealed.as_str().contains("access"));
        assert_eq!(sealer.open_credential(&sealed).unwrap(), auth);
        assert!(!sealer.credential_needs_reencryption(&sealed).unwrap());
    }

    #[test]
    fn credential_blob_is_not_a_valid_state() {
        let sealer = sealer();
        let auth = PlatformAuthData::bearer("a", None, Utc::now());
        let sealed = sealer.seal_credential(&auth).unwrap();

        let err = sealer.open_state(sealed.as_str()).unwrap_err();
        assert_eq!(err, IntegrationError::state(StateRejection::Tampered));
    }

    #[test]
    fn state_blob_is_not_a_valid_credential() {
        let sealer = sealer();
        let blob = sealer.seal_state(&sample_state()).unwrap();

        let err = sealer.open_credential(&SealedCredential::new(blob)).unwrap_err();
        assert_eq!(err, IntegrationError::Integrity);
    }

    /// Every single-bit change anywhere in the blob (nonce, ciphertext or tag)
    /// is reported as tampering.
    #[test]
    fn any_flipped_state_bit_is_tampered() {
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;

        let sealer = sealer();
        let blob = URL_SAFE_NO_PAD.decode(sealer.seal_state(&sample_state()).unwrap()).unwrap();

        for index in 0..blob.len() {
            for bit in 0..8 {
                let mut tampered = blob.clone();
                tampered[index] ^= 1 << bit;

                let err = sealer.open_state(&URL_SAFE_NO_PAD.encode(&tampered)).unwrap_err();
                assert_eq!(
                    err,
                    IntegrationError::state(StateRejection::Tampered),
                    "byte {index} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn garbage_state_is_tampered() {
        let err = sealer().open_state("not-base64!!").unwrap_err();
        assert_eq!(err, IntegrationError::state(StateRejection::Tampered));
    }
}
