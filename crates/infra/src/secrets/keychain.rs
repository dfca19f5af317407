//! Secrets stored in the platform keychain (macOS Keychain, Windows
//! Credential Manager, Linux Secret Service)
//!
//! Entries live under one service name:
//!
//! - `state_key` and `state_keys_previous` (comma-separated)
//! - `<platform>.client_id` and `<platform>.client_secret`

use async_trait::async_trait;
use keyring::Entry;
use postbridge_common::KeyRing;
use postbridge_core::SecretsProvider;
use postbridge_domain::{ClientCredentials, IntegrationError, Platform, Result};
use tracing::debug;

use super::split_previous;
use crate::errors::InfraError;

const STATE_KEY: &str = "state_key";
const PREVIOUS_KEYS: &str = "state_keys_previous";

/// Reads secrets from the platform keychain.
#[derive(Debug, Clone)]
pub struct KeychainSecretsProvider {
    service: String,
}

impl KeychainSecretsProvider {
    /// # Arguments
    /// * `service` - Keychain service name (e.g. "postbridge")
    pub fn new(service: impl Into<String>) -> Self {
        Self { service: service.into() }
    }

    /// Store a secret; used by provisioning tooling and tests.
    pub fn set_secret(&self, key: &str, value: &str) -> Result<()> {
        debug!(service = %self.service, key = %key, "Storing secret in keychain");
        let entry = Entry::new(&self.service, key).map_err(InfraError::from)?;
        entry.set_password(value).map_err(InfraError::from)?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        debug!(service = %self.service, key = %key, "Reading secret from keychain");
        let entry = Entry::new(&self.service, key).map_err(InfraError::from)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)?.ok_or_else(|| {
            IntegrationError::Configuration(format!(
                "keychain entry '{key}' missing in service '{}'",
                self.service
            ))
        })
    }
}

fn client_entry(platform: Platform, field: &str) -> String {
    format!("{}.{field}", platform.slug())
}

#[async_trait]
impl SecretsProvider for KeychainSecretsProvider {
    async fn key_ring(&self) -> Result<KeyRing> {
        let current = self.require(STATE_KEY)?;
        let previous = split_previous(self.get(PREVIOUS_KEYS)?.as_deref());
        Ok(KeyRing::from_encoded(current.trim(), &previous)?)
    }

    async fn client_credentials(&self, platform: Platform) -> Result<ClientCredentials> {
        let id = self.require(&client_entry(platform, "client_id"))?;
        let secret = self.require(&client_entry(platform, "client_secret"))?;
        Ok(ClientCredentials::new(id, secret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_entries_are_namespaced_by_platform() {
        assert_eq!(client_entry(Platform::YouTube, "client_id"), "youtube.client_id");
        assert_eq!(client_entry(Platform::X, "client_secret"), "x.client_secret");
    }
}
