//! # Postbridge Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The retrying HTTP client and OAuth network calls (OAuth 2.0 and 1.0a)
//! - One adapter per platform behind the [`AdapterRegistry`]
//! - Secrets providers (environment, OS keychain, static)
//! - In-memory credential store, organization directory and replay ledger
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `postbridge-core`
//! - Contains all "impure" code (network, keychain, environment)

pub mod adapters;
pub mod config;
pub mod errors;
pub mod http;
pub mod oauth;
pub mod secrets;
pub mod store;
pub mod telemetry;

use std::sync::Arc;

use postbridge_core::{IntegrationPorts, SecretsProvider};
use postbridge_domain::{IntegrationConfig, Result};

// Re-export commonly used items
pub use adapters::{AdapterRegistry, ContainerPolling, PlatformAdapter};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use oauth::{OAuth1Signer, OAuthProviderClient};
pub use secrets::{EnvSecretsProvider, KeychainSecretsProvider, StaticSecretsProvider};
pub use store::{InMemoryCredentialStore, MokaStateLedger, StaticOrganizationDirectory};
pub use telemetry::init_tracing;

/// Wire every port with the HTTP implementations and in-memory stores.
///
/// `directory` carries user to organization memberships; pass an empty
/// directory when every connection is user-owned.
pub fn in_memory_ports(
    config: &IntegrationConfig,
    secrets: Arc<dyn SecretsProvider>,
    directory: StaticOrganizationDirectory,
) -> Result<IntegrationPorts> {
    let http = HttpClient::from_config(&config.http)?;
    let gateway = AdapterRegistry::new(config, http.clone(), Arc::clone(&secrets))?;

    Ok(IntegrationPorts {
        store: Arc::new(InMemoryCredentialStore::new()),
        directory: Arc::new(directory),
        secrets,
        authorization: Arc::new(OAuthProviderClient::new(http)),
        gateway: Arc::new(gateway),
        ledger: Arc::new(MokaStateLedger::default()),
    })
}
