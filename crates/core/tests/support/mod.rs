//! Shared test helpers for `postbridge-core` integration tests.
//!
//! In-memory implementations of every port plus fixtures, so tests can focus
//! on behaviour instead of wiring.

#![allow(dead_code)]

pub mod mocks;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use postbridge_common::{EncryptionService, KeyRing};
use postbridge_core::{CredentialSealer, IntegrationPorts};
use postbridge_domain::{
    ConnectionId, Platform, PlatformAuthData, PlatformConnection, PlatformProfile, ProfileMetrics,
};

pub use mocks::{
    InMemoryCredentialStore, InMemoryStateLedger, MockAuthorizationProvider, MockPlatformGateway,
    StaticDirectory, StaticSecrets,
};

/// Handles to every mock behind an [`IntegrationPorts`].
pub struct Harness {
    pub store: Arc<InMemoryCredentialStore>,
    pub directory: Arc<StaticDirectory>,
    pub secrets: Arc<StaticSecrets>,
    pub authorization: Arc<MockAuthorizationProvider>,
    pub gateway: Arc<MockPlatformGateway>,
    pub ledger: Arc<InMemoryStateLedger>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryCredentialStore::default()),
            directory: Arc::new(StaticDirectory::default()),
            secrets: Arc::new(StaticSecrets::new(test_key_ring())),
            authorization: Arc::new(MockAuthorizationProvider::default()),
            gateway: Arc::new(MockPlatformGateway::default()),
            ledger: Arc::new(InMemoryStateLedger::default()),
        }
    }

    pub fn ports(&self) -> IntegrationPorts {
        IntegrationPorts {
            store: self.store.clone(),
            directory: self.directory.clone(),
            secrets: self.secrets.clone(),
            authorization: self.authorization.clone(),
            gateway: self.gateway.clone(),
            ledger: self.ledger.clone(),
        }
    }

    /// Sealer using the same key ring as the secrets mock.
    pub fn sealer(&self) -> Arc<CredentialSealer> {
        Arc::new(CredentialSealer::new(self.secrets.ring()))
    }
}

/// Fresh random key ring.
pub fn test_key_ring() -> KeyRing {
    let key = EncryptionService::generate_key().expect("key generation");
    KeyRing::new(&key).expect("valid key")
}

/// Bearer credential expiring `expires_in` seconds after `now`.
pub fn credential(
    access: &str,
    refresh: Option<&str>,
    expires_in: Option<i64>,
    now: DateTime<Utc>,
) -> PlatformAuthData {
    PlatformAuthData::bearer(access, expires_in, now).with_refresh_token(refresh.map(String::from))
}

/// Active connection holding `auth` sealed with `sealer`.
pub fn connection(
    sealer: &CredentialSealer,
    platform: Platform,
    auth: &PlatformAuthData,
) -> PlatformConnection {
    let now = Utc::now();
    PlatformConnection {
        id: ConnectionId::new(),
        user_id: "user-1".into(),
        organization_id: None,
        platform,
        account_id: "acct-1".into(),
        handle: "tester".into(),
        credential: sealer.seal_credential(auth).expect("seal"),
        active: true,
        deactivation_reason: None,
        created_at: now,
        updated_at: now,
        last_sync_at: None,
        metrics: None,
    }
}

/// Profile the gateway mock reports for `platform`.
pub fn profile(platform: Platform, account_id: &str) -> PlatformProfile {
    PlatformProfile {
        platform,
        account_id: account_id.into(),
        handle: format!("{account_id}-handle"),
        metrics: ProfileMetrics {
            display_name: Some("Test Account".into()),
            followers_count: Some(42),
            ..ProfileMetrics::default()
        },
    }
}
