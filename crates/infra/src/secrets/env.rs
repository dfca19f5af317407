//! Secrets from environment variables
//!
//! - `<PREFIX>_STATE_KEY`: current sealing key (64 hex chars or base64)
//! - `<PREFIX>_STATE_KEYS_PREVIOUS`: comma-separated retired keys
//! - `<PREFIX>_<PLATFORM>_CLIENT_ID` / `<PREFIX>_<PLATFORM>_CLIENT_SECRET`
//!
//! Variables are read on every call so rotated values are picked up without
//! a restart.

use async_trait::async_trait;
use postbridge_common::KeyRing;
use postbridge_core::SecretsProvider;
use postbridge_domain::{ClientCredentials, IntegrationError, Platform, Result};

use super::{missing_client, split_previous};

const DEFAULT_PREFIX: &str = "POSTBRIDGE";

/// Reads secrets from `POSTBRIDGE_*` variables.
#[derive(Debug, Clone)]
pub struct EnvSecretsProvider {
    prefix: String,
}

impl Default for EnvSecretsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvSecretsProvider {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }

    /// Use `<prefix>_*` instead of `POSTBRIDGE_*`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    fn var(&self, suffix: &str) -> Option<String> {
        std::env::var(format!("{}_{suffix}", self.prefix)).ok().filter(|v| !v.trim().is_empty())
    }

    fn client_var(&self, platform: Platform, field: &str) -> Option<String> {
        self.var(&format!("{}_{field}", platform.slug().to_ascii_uppercase()))
    }
}

#[async_trait]
impl SecretsProvider for EnvSecretsProvider {
    async fn key_ring(&self) -> Result<KeyRing> {
        let current = self.var("STATE_KEY").ok_or_else(|| {
            IntegrationError::Configuration(format!("{}_STATE_KEY is not set", self.prefix))
        })?;
        let previous = split_previous(self.var("STATE_KEYS_PREVIOUS").as_deref());

        Ok(KeyRing::from_encoded(current.trim(), &previous)?)
    }

    async fn client_credentials(&self, platform: Platform) -> Result<ClientCredentials> {
        match (self.client_var(platform, "CLIENT_ID"), self.client_var(platform, "CLIENT_SECRET")) {
            (Some(id), Some(secret)) => Ok(ClientCredentials::new(id, secret)),
            _ => Err(missing_client(platform)),
        }
    }
}
