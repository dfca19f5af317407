//! Port interfaces for the integration layer
//!
//! These traits define the boundaries between core business logic
//! and infrastructure implementations.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use postbridge_common::KeyRing;
use postbridge_domain::{
    ClientCredentials, ConnectionId, DeactivationReason, OwnerScope, Platform, PlatformAuthData,
    PlatformConnection, PlatformRequest, PlatformResponse, ProviderEndpoints, Result,
    SealedCredential, TemporaryCredentials,
};

/// Persistence for connections and their sealed credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load a connection by id, active or not
    async fn get(&self, id: ConnectionId) -> Result<Option<PlatformConnection>>;

    /// Insert or replace a connection
    async fn save(&self, connection: PlatformConnection) -> Result<()>;

    /// Replace the sealed credential of an active connection. Returns `false`
    /// without writing when the connection is unknown or inactive.
    async fn update_credential(
        &self,
        id: ConnectionId,
        credential: SealedCredential,
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Soft-delete a connection; `NotFound` if the id is unknown
    async fn deactivate(&self, id: ConnectionId, reason: DeactivationReason) -> Result<()>;

    /// The active connection for an owner, platform and external account
    async fn find_active(
        &self,
        owner: &OwnerScope,
        platform: Platform,
        account_id: &str,
    ) -> Result<Option<PlatformConnection>>;

    /// Every connection (active or not) owned by `owner`
    async fn list_for_owner(&self, owner: &OwnerScope) -> Result<Vec<PlatformConnection>>;
}

/// Resolves which organization, if any, a user acts for.
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    async fn organization_for(&self, user_id: &str) -> Result<Option<String>>;
}

/// Source of key material and OAuth client registrations.
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    /// Current and retired sealing keys
    async fn key_ring(&self) -> Result<KeyRing>;

    /// Client id and secret (consumer key and secret for OAuth 1.0a)
    async fn client_credentials(&self, platform: Platform) -> Result<ClientCredentials>;
}

/// Code-for-token exchange input.
#[derive(Debug, Clone)]
pub struct CodeExchange {
    pub endpoints: ProviderEndpoints,
    pub client: ClientCredentials,
    /// Authorization code, or `oauth_verifier` for OAuth 1.0a
    pub code: String,
    pub redirect_uri: String,
    pub code_verifier: Option<String>,
    /// OAuth 1.0a request token pair from before the redirect
    pub request_token: Option<TemporaryCredentials>,
}

/// Refresh input. `credential` is the current, possibly expired, payload.
#[derive(Debug, Clone)]
pub struct RefreshRequest {
    pub endpoints: ProviderEndpoints,
    pub client: ClientCredentials,
    pub credential: PlatformAuthData,
}

/// OAuth network calls.
///
/// Implementations report a provider refusal (bad code, `invalid_grant`,
/// revoked consent) as `ProviderExchange` and timeouts, 5xx and rate limits
/// as `TransientProvider`.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// OAuth 1.0a: obtain a request token bound to `callback_url`
    async fn request_temporary_credentials(
        &self,
        endpoints: &ProviderEndpoints,
        client: &ClientCredentials,
        callback_url: &str,
    ) -> Result<TemporaryCredentials>;

    /// Exchange an authorization code (or OAuth 1.0a verifier) for a credential
    async fn exchange_code(&self, exchange: CodeExchange) -> Result<PlatformAuthData>;

    /// Renew a credential using the provider's refresh style
    async fn refresh(&self, request: RefreshRequest) -> Result<PlatformAuthData>;
}

/// Who a dispatched request acts as.
#[derive(Debug, Clone)]
pub struct DispatchTarget {
    pub platform: Platform,
    /// `None` only when resolving the identity of a fresh credential
    pub account_id: Option<String>,
    pub credential: PlatformAuthData,
}

/// Executes a negotiated request against a platform API.
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    async fn dispatch(
        &self,
        target: DispatchTarget,
        request: PlatformRequest,
    ) -> Result<PlatformResponse>;
}

/// Single-use ledger of consumed state tokens.
#[async_trait]
pub trait StateLedger: Send + Sync {
    /// Record `state`; `true` on first use, `false` if already consumed
    /// within `ttl`
    async fn consume(&self, state: &str, ttl: Duration) -> Result<bool>;
}
