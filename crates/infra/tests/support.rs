//! Shared fixtures for infra integration tests.
//!
//! Every helper points provider endpoints at a local `wiremock` server so
//! adapters and the OAuth client run their real request building against
//! canned responses.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use postbridge_common::{EncryptionService, KeyRing};
use postbridge_core::DispatchTarget;
use postbridge_domain::{
    ClientCredentials, IntegrationConfig, Platform, PlatformAuthData, PlatformSettings,
};
use postbridge_infra::{AdapterRegistry, HttpClient, StaticSecretsProvider};

/// Config whose API, token and upload URLs for `platform` all point at `uri`.
pub fn config_for(platform: Platform, uri: &str) -> IntegrationConfig {
    let mut config = IntegrationConfig::default();
    config.http.base_backoff_ms = 1;
    config.platforms.insert(
        platform,
        PlatformSettings {
            token_url: Some(format!("{uri}/oauth/token")),
            api_base_url: Some(uri.to_string()),
            upload_base_url: Some(uri.to_string()),
            ..PlatformSettings::default()
        },
    );
    config
}

/// Two attempts, near-zero backoff.
pub fn http_client() -> HttpClient {
    HttpClient::builder()
        .timeout(Duration::from_secs(5))
        .max_attempts(2)
        .base_backoff(Duration::from_millis(1))
        .build()
        .expect("http client should build")
}

/// Fresh key ring and a client registration for every platform.
pub fn secrets() -> Arc<StaticSecretsProvider> {
    let key = EncryptionService::generate_key().expect("key generation");
    let ring = KeyRing::new(&key).expect("key ring");
    let provider = Platform::ALL.into_iter().fold(StaticSecretsProvider::new(ring), |p, platform| {
        p.with_client(
            platform,
            ClientCredentials::new(format!("{platform}-client"), format!("{platform}-secret")),
        )
    });
    Arc::new(provider)
}

/// Registry built from `config` with test HTTP settings.
pub fn registry(config: &IntegrationConfig) -> AdapterRegistry {
    AdapterRegistry::new(config, http_client(), secrets()).expect("registry should build")
}

/// Bearer credential that never expires.
pub fn bearer(token: &str) -> PlatformAuthData {
    PlatformAuthData::bearer(token, None, Utc::now())
}

/// Dispatch target acting as `account_id`.
pub fn target(
    platform: Platform,
    account_id: &str,
    credential: PlatformAuthData,
) -> DispatchTarget {
    DispatchTarget { platform, account_id: Some(account_id.to_string()), credential }
}
