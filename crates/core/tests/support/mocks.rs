//! In-memory port implementations for testing
//!
//! Each mock records how often it was called so tests can assert that no
//! network-facing port was touched.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use postbridge_common::KeyRing;
use postbridge_core::{
    AuthorizationProvider, CodeExchange, CredentialStore, DispatchTarget, OrganizationDirectory,
    PlatformGateway, RefreshRequest, SecretsProvider, StateLedger,
};
use postbridge_domain::{
    ClientCredentials, ConnectionId, DeactivationReason, IntegrationError, OwnerScope, Platform,
    PlatformAnalytics, PlatformAuthData, PlatformConnection, PlatformRequest, PlatformResponse,
    PostResult, ProviderEndpoints, Result as DomainResult, SealedCredential,
    TemporaryCredentials,
};

/// In-memory mock for `CredentialStore`.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    connections: Mutex<HashMap<ConnectionId, PlatformConnection>>,
    saves: AtomicUsize,
}

impl InMemoryCredentialStore {
    /// Seed a connection without counting it as a save.
    pub fn insert(&self, connection: PlatformConnection) {
        self.connections.lock().unwrap().insert(connection.id, connection);
    }

    pub fn snapshot(&self, id: ConnectionId) -> Option<PlatformConnection> {
        self.connections.lock().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<PlatformConnection> {
        self.connections.lock().unwrap().values().cloned().collect()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, id: ConnectionId) -> DomainResult<Option<PlatformConnection>> {
        Ok(self.snapshot(id))
    }

    async fn save(&self, connection: PlatformConnection) -> DomainResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.insert(connection);
        Ok(())
    }

    async fn update_credential(
        &self,
        id: ConnectionId,
        credential: SealedCredential,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let mut connections = self.connections.lock().unwrap();
        match connections.get_mut(&id) {
            Some(connection) if connection.active => {
                self.saves.fetch_add(1, Ordering::SeqCst);
                connection.replace_credential(credential, updated_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate(&self, id: ConnectionId, reason: DeactivationReason) -> DomainResult<()> {
        let mut connections = self.connections.lock().unwrap();
        let connection =
            connections.get_mut(&id).ok_or_else(|| IntegrationError::connection_not_found(id))?;
        connection.deactivate(reason, Utc::now());
        Ok(())
    }

    async fn find_active(
        &self,
        owner: &OwnerScope,
        platform: Platform,
        account_id: &str,
    ) -> DomainResult<Option<PlatformConnection>> {
        Ok(self
            .connections
            .lock()
            .unwrap()
            .values()
            .find(|c| {
                c.active
                    && &c.owner() == owner
                    && c.platform == platform
                    && c.account_id == account_id
            })
            .cloned())
    }

    async fn list_for_owner(&self, owner: &OwnerScope) -> DomainResult<Vec<PlatformConnection>> {
        Ok(self
            .connections
            .lock()
            .unwrap()
            .values()
            .filter(|c| &c.owner() == owner)
            .cloned()
            .collect())
    }
}

/// Fixed user → organization mapping.
#[derive(Default)]
pub struct StaticDirectory {
    memberships: Mutex<HashMap<String, String>>,
}

impl StaticDirectory {
    pub fn add(&self, user_id: &str, organization_id: &str) {
        self.memberships.lock().unwrap().insert(user_id.into(), organization_id.into());
    }
}

#[async_trait]
impl OrganizationDirectory for StaticDirectory {
    async fn organization_for(&self, user_id: &str) -> DomainResult<Option<String>> {
        Ok(self.memberships.lock().unwrap().get(user_id).cloned())
    }
}

/// Secrets mock with one key ring and the same client for every platform.
pub struct StaticSecrets {
    ring: KeyRing,
}

impl StaticSecrets {
    pub fn new(ring: KeyRing) -> Self {
        Self { ring }
    }

    pub fn ring(&self) -> KeyRing {
        self.ring.clone()
    }
}

#[async_trait]
impl SecretsProvider for StaticSecrets {
    async fn key_ring(&self) -> DomainResult<KeyRing> {
        Ok(self.ring.clone())
    }

    async fn client_credentials(&self, platform: Platform) -> DomainResult<ClientCredentials> {
        Ok(ClientCredentials::new(format!("{platform}-client"), "client-secret"))
    }
}

/// Scripted `AuthorizationProvider`.
///
/// Refresh responses are taken from a queue; when the queue is empty a fresh
/// one-hour credential is returned. An optional delay widens race windows.
#[derive(Default)]
pub struct MockAuthorizationProvider {
    exchanges: AtomicUsize,
    refreshes: AtomicUsize,
    temporary: AtomicUsize,
    refresh_results: Mutex<VecDeque<DomainResult<PlatformAuthData>>>,
    exchange_result: Mutex<Option<DomainResult<PlatformAuthData>>>,
    last_exchange: Mutex<Option<CodeExchange>>,
    refresh_delay: Mutex<Duration>,
}

impl MockAuthorizationProvider {
    pub fn push_refresh(&self, result: DomainResult<PlatformAuthData>) {
        self.refresh_results.lock().unwrap().push_back(result);
    }

    pub fn set_exchange(&self, result: DomainResult<PlatformAuthData>) {
        *self.exchange_result.lock().unwrap() = Some(result);
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn temporary_count(&self) -> usize {
        self.temporary.load(Ordering::SeqCst)
    }

    pub fn last_exchange(&self) -> Option<CodeExchange> {
        self.last_exchange.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorizationProvider for MockAuthorizationProvider {
    async fn request_temporary_credentials(
        &self,
        _endpoints: &ProviderEndpoints,
        _client: &ClientCredentials,
        _callback_url: &str,
    ) -> DomainResult<TemporaryCredentials> {
        self.temporary.fetch_add(1, Ordering::SeqCst);
        Ok(TemporaryCredentials {
            token: "request-token".into(),
            token_secret: "request-secret".into(),
        })
    }

    async fn exchange_code(&self, exchange: CodeExchange) -> DomainResult<PlatformAuthData> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        *self.last_exchange.lock().unwrap() = Some(exchange);
        self.exchange_result.lock().unwrap().clone().unwrap_or_else(|| {
            Ok(PlatformAuthData::bearer("exchanged-access", Some(3600), Utc::now())
                .with_refresh_token(Some("exchanged-refresh".into())))
        })
    }

    async fn refresh(&self, request: RefreshRequest) -> DomainResult<PlatformAuthData> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let delay = *self.refresh_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.refresh_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            let n = self.refresh_count();
            Ok(PlatformAuthData::bearer(format!("refreshed-{n}"), Some(3600), Utc::now())
                .with_instance_url(request.credential.instance_url))
        })
    }
}

/// Gateway mock answering profile requests and echoing posts.
#[derive(Default)]
pub struct MockPlatformGateway {
    calls: AtomicUsize,
    requests: Mutex<Vec<(Option<String>, PlatformRequest)>>,
    seen_tokens: Mutex<HashSet<String>>,
    failure: Mutex<Option<IntegrationError>>,
}

impl MockPlatformGateway {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(Option<String>, PlatformRequest)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn saw_token(&self, token: &str) -> bool {
        self.seen_tokens.lock().unwrap().contains(token)
    }

    pub fn fail_with(&self, err: IntegrationError) {
        *self.failure.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl PlatformGateway for MockPlatformGateway {
    async fn dispatch(
        &self,
        target: DispatchTarget,
        request: PlatformRequest,
    ) -> DomainResult<PlatformResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_tokens.lock().unwrap().insert(target.credential.access_token.clone());
        self.requests.lock().unwrap().push((target.account_id.clone(), request.clone()));

        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }

        let account = target.account_id.unwrap_or_else(|| "acct-1".into());
        Ok(match request {
            PlatformRequest::GetProfile => {
                PlatformResponse::Profile(super::profile(target.platform, &account))
            }
            PlatformRequest::CreatePost { .. } => {
                PlatformResponse::Post(PostResult::published(target.platform, "post-1", None))
            }
            PlatformRequest::SchedulePost { publish_at, .. } => PlatformResponse::Post(
                PostResult::scheduled(target.platform, "post-2", None, publish_at),
            ),
            PlatformRequest::DeletePost { post_id } => PlatformResponse::Deleted { post_id },
            PlatformRequest::GetAnalytics { post_id } => {
                PlatformResponse::Analytics(PlatformAnalytics::for_post(target.platform, post_id))
            }
        })
    }
}

/// In-memory mock for `StateLedger`.
#[derive(Default)]
pub struct InMemoryStateLedger {
    consumed: Mutex<HashSet<String>>,
}

#[async_trait]
impl StateLedger for InMemoryStateLedger {
    async fn consume(&self, state: &str, _ttl: Duration) -> DomainResult<bool> {
        Ok(self.consumed.lock().unwrap().insert(state.to_string()))
    }
}
