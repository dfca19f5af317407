//! Integration service - the entry point callers use

use std::sync::Arc;

use postbridge_domain::{
    AuthorizationRedirect, AuthorizationRequest, ConnectionId, DeactivationReason,
    IntegrationConfig, IntegrationError, OwnerScope, Platform, PlatformConnection,
    PlatformProfile, PlatformRequest, PlatformResponse, Result,
};
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::dispatch::CapabilityNegotiator;
use crate::oauth::{CredentialSealer, OAuthFlowBuilder};
use crate::ports::{
    AuthorizationProvider, CredentialStore, DispatchTarget, OrganizationDirectory,
    PlatformGateway, SecretsProvider, StateLedger,
};
use crate::tokens::{ConnectionState, NewConnection, TokenLifecycleManager};

/// Every adapter the service needs, wired once at start-up.
#[derive(Clone)]
pub struct IntegrationPorts {
    pub store: Arc<dyn CredentialStore>,
    pub directory: Arc<dyn OrganizationDirectory>,
    pub secrets: Arc<dyn SecretsProvider>,
    pub authorization: Arc<dyn AuthorizationProvider>,
    pub gateway: Arc<dyn PlatformGateway>,
    pub ledger: Arc<dyn StateLedger>,
}

/// Connect accounts, keep their credentials fresh, and run operations
/// against them.
pub struct IntegrationService {
    store: Arc<dyn CredentialStore>,
    directory: Arc<dyn OrganizationDirectory>,
    gateway: Arc<dyn PlatformGateway>,
    flow: OAuthFlowBuilder,
    tokens: TokenLifecycleManager,
}

impl IntegrationService {
    /// Build the service, loading key material from the secrets provider.
    pub async fn from_ports(config: IntegrationConfig, ports: IntegrationPorts) -> Result<Self> {
        Self::with_clock(config, ports, Arc::new(SystemClock)).await
    }

    /// Build the service with an explicit clock
    pub async fn with_clock(
        config: IntegrationConfig,
        ports: IntegrationPorts,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let config = Arc::new(config);
        let ring = ports.secrets.key_ring().await?;
        let sealer = Arc::new(CredentialSealer::new(ring));

        let flow = OAuthFlowBuilder::new(
            Arc::clone(&config),
            Arc::clone(&sealer),
            Arc::clone(&ports.secrets),
            Arc::clone(&ports.authorization),
            ports.ledger,
        )
        .with_clock(Arc::clone(&clock));

        let tokens = TokenLifecycleManager::new(
            Arc::clone(&ports.store),
            ports.authorization,
            ports.secrets,
            sealer,
            config,
        )
        .with_clock(clock);

        Ok(Self {
            store: ports.store,
            directory: ports.directory,
            gateway: ports.gateway,
            flow,
            tokens,
        })
    }

    /// Start connecting an account.
    pub async fn build_authorization_url(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationRedirect> {
        self.flow.build_authorization_url(request).await
    }

    /// Finish connecting an account from the provider callback.
    ///
    /// The new credential is used once to resolve the account identity, then
    /// stored under the user's organization when they have one. Reconnecting
    /// an already connected account updates it in place.
    pub async fn complete_authorization(
        &self,
        platform: Platform,
        code: &str,
        state: &str,
        encrypted_state: &str,
    ) -> Result<PlatformConnection> {
        let completed =
            self.flow.complete_authorization(platform, code, state, encrypted_state).await?;

        let profile = self
            .fetch_profile(DispatchTarget {
                platform,
                account_id: None,
                credential: completed.credential.clone(),
            })
            .await?;

        let organization_id = self.directory.organization_for(&completed.user_id).await?;

        self.tokens
            .store_new_connection(NewConnection {
                user_id: completed.user_id,
                organization_id,
                platform,
                account_id: profile.account_id,
                handle: profile.handle,
                metrics: Some(profile.metrics),
                credential: completed.credential,
            })
            .await
    }

    /// Run an operation on a connection.
    ///
    /// The request is negotiated against the platform's capabilities before
    /// the credential is refreshed or any provider is contacted.
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        request: PlatformRequest,
    ) -> Result<PlatformResponse> {
        let connection = self.load(connection_id).await?;
        if !connection.active {
            return Err(IntegrationError::ReauthorizationRequired { connection_id });
        }

        let platform = connection.platform;
        let operation = request.operation();
        let (request, dropped) = CapabilityNegotiator::negotiate(platform, request)
            .inspect_err(|err| {
                info!(
                    connection_id = %connection_id,
                    platform = %platform,
                    operation = %operation,
                    error_kind = err.kind(),
                    "Request rejected by capability negotiation"
                );
            })?
            .into_parts();
        if !dropped.is_empty() {
            warn!(
                connection_id = %connection_id,
                platform = %platform,
                dropped = ?dropped,
                "Request degraded to fit platform capabilities"
            );
        }

        let credential = self.tokens.ensure_valid(&connection).await?;
        let target = DispatchTarget {
            platform,
            account_id: Some(connection.account_id.clone()),
            credential,
        };

        let mut response = self.gateway.dispatch(target, request).await.inspect_err(|err| {
            warn!(
                connection_id = %connection_id,
                platform = %platform,
                operation = %operation,
                error_kind = err.kind(),
                "Platform request failed"
            );
        })?;

        if let PlatformResponse::Post(result) = &mut response {
            result.degraded = dropped;
        }

        info!(
            connection_id = %connection_id,
            platform = %platform,
            operation = %operation,
            "Platform request completed"
        );
        Ok(response)
    }

    /// Disconnect an account. The connection is soft-deleted.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Result<()> {
        let connection = self.load(connection_id).await?;
        if !connection.active
            && connection.deactivation_reason == Some(DeactivationReason::UserDisconnected)
        {
            return Ok(());
        }
        self.tokens.deactivate(connection_id, DeactivationReason::UserDisconnected).await
    }

    /// Refresh cached profile metrics from the provider.
    pub async fn sync_profile(&self, connection_id: ConnectionId) -> Result<PlatformConnection> {
        let connection = self.load(connection_id).await?;
        if !connection.active {
            return Err(IntegrationError::ReauthorizationRequired { connection_id });
        }
        CapabilityNegotiator::negotiate(connection.platform, PlatformRequest::GetProfile)?;

        let credential = self.tokens.ensure_valid(&connection).await?;
        let profile = self
            .fetch_profile(DispatchTarget {
                platform: connection.platform,
                account_id: Some(connection.account_id.clone()),
                credential,
            })
            .await?;

        let connection =
            self.tokens.update_profile(connection_id, profile.handle, profile.metrics).await?;

        info!(connection_id = %connection_id, platform = %connection.platform, "Profile synced");
        Ok(connection)
    }

    /// Lifecycle state of a connection right now.
    pub async fn connection_state(&self, connection_id: ConnectionId) -> Result<ConnectionState> {
        let connection = self.load(connection_id).await?;
        self.tokens.state_of(&connection)
    }

    /// Connections visible to a user (their organization's when they have one).
    pub async fn list_connections(&self, user_id: &str) -> Result<Vec<PlatformConnection>> {
        let organization_id = self.directory.organization_for(user_id).await?;
        let owner = OwnerScope::resolve(user_id, organization_id.as_deref());
        self.store.list_for_owner(&owner).await
    }

    async fn load(&self, connection_id: ConnectionId) -> Result<PlatformConnection> {
        self.store
            .get(connection_id)
            .await?
            .ok_or_else(|| IntegrationError::connection_not_found(connection_id))
    }

    async fn fetch_profile(&self, target: DispatchTarget) -> Result<PlatformProfile> {
        let platform = target.platform;
        match self.gateway.dispatch(target, PlatformRequest::GetProfile).await? {
            PlatformResponse::Profile(profile) => Ok(profile),
            other => Err(IntegrationError::Internal(format!(
                "{platform} returned {other:?} for a profile request"
            ))),
        }
    }
}
