//! `SecretsProvider` implementations
//!
//! Key material and OAuth client registrations come from environment
//! variables, the platform keychain or a fixed in-process set.

mod env;
mod keychain;

use std::collections::HashMap;

use async_trait::async_trait;
use postbridge_common::KeyRing;
use postbridge_core::SecretsProvider;
use postbridge_domain::{ClientCredentials, IntegrationError, Platform, Result};

pub use env::EnvSecretsProvider;
pub use keychain::KeychainSecretsProvider;

/// Parse a comma-separated list of retired keys, ignoring blanks.
fn split_previous(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value.split(',').map(str::trim).filter(|k| !k.is_empty()).map(str::to_string).collect()
    })
    .unwrap_or_default()
}

fn missing_client(platform: Platform) -> IntegrationError {
    IntegrationError::Configuration(format!("no OAuth client registered for {platform}"))
}

/// Fixed secrets held in memory.
#[derive(Clone)]
pub struct StaticSecretsProvider {
    ring: KeyRing,
    clients: HashMap<Platform, ClientCredentials>,
}

impl StaticSecretsProvider {
    pub fn new(ring: KeyRing) -> Self {
        Self { ring, clients: HashMap::new() }
    }

    /// Register the OAuth client for `platform`.
    pub fn with_client(mut self, platform: Platform, client: ClientCredentials) -> Self {
        self.clients.insert(platform, client);
        self
    }
}

#[async_trait]
impl SecretsProvider for StaticSecretsProvider {
    async fn key_ring(&self) -> Result<KeyRing> {
        Ok(self.ring.clone())
    }

    async fn client_credentials(&self, platform: Platform) -> Result<ClientCredentials> {
        self.clients.get(&platform).cloned().ok_or_else(|| missing_client(platform))
    }
}
