//! Token lifecycle manager
//!
//! Keeps stored credentials usable: refreshes ahead of expiry, deactivates
//! connections whose credential can no longer be renewed, and guarantees a
//! single provider refresh per connection no matter how many callers race.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use postbridge_domain::{
    ConnectionId, DeactivationReason, IntegrationConfig, IntegrationError, OwnerScope, Platform,
    PlatformAuthData, PlatformConnection, ProfileMetrics, RefreshStyle, Result,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::state::ConnectionState;
use crate::clock::{Clock, SystemClock};
use crate::oauth::CredentialSealer;
use crate::ports::{AuthorizationProvider, CredentialStore, RefreshRequest, SecretsProvider};

/// Whether a credential expiring at `expires_at` must be refreshed at `now`.
///
/// True iff `now >= expires_at - buffer`. Credentials without an expiry never
/// expire.
pub fn is_expired(
    expires_at: Option<DateTime<Utc>>,
    buffer: chrono::Duration,
    now: DateTime<Utc>,
) -> bool {
    match expires_at {
        Some(expiry) => now >= expiry - buffer,
        None => false,
    }
}

type Gates = DashMap<ConnectionId, Arc<Mutex<()>>>;

/// Claim on one connection's gate. Dropping it removes the map entry once no
/// other caller holds the gate, including when the holder is cancelled.
struct GateLease<'a> {
    gates: &'a Gates,
    id: ConnectionId,
    gate: Arc<Mutex<()>>,
}

impl<'a> GateLease<'a> {
    fn acquire(gates: &'a Gates, id: ConnectionId) -> Self {
        let gate = Arc::clone(gates.entry(id).or_default().value());
        Self { gates, id, gate }
    }
}

impl Drop for GateLease<'_> {
    fn drop(&mut self) {
        // The map and this lease hold the only two references.
        self.gates.remove_if(&self.id, |_, gate| {
            Arc::ptr_eq(gate, &self.gate) && Arc::strong_count(gate) == 2
        });
    }
}

/// A freshly authorized account to persist.
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub user_id: String,
    pub organization_id: Option<String>,
    pub platform: Platform,
    pub account_id: String,
    pub handle: String,
    pub metrics: Option<ProfileMetrics>,
    pub credential: PlatformAuthData,
}

/// Refreshes, persists and retires connection credentials.
pub struct TokenLifecycleManager {
    store: Arc<dyn CredentialStore>,
    provider: Arc<dyn AuthorizationProvider>,
    secrets: Arc<dyn SecretsProvider>,
    sealer: Arc<CredentialSealer>,
    config: Arc<IntegrationConfig>,
    clock: Arc<dyn Clock>,
    gates: Gates,
}

impl TokenLifecycleManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        provider: Arc<dyn AuthorizationProvider>,
        secrets: Arc<dyn SecretsProvider>,
        sealer: Arc<CredentialSealer>,
        config: Arc<IntegrationConfig>,
    ) -> Self {
        Self {
            store,
            provider,
            secrets,
            sealer,
            config,
            clock: Arc::new(SystemClock),
            gates: DashMap::new(),
        }
    }

    /// Replace the wall clock (tests)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Decrypt a stored credential.
    pub fn open(&self, connection: &PlatformConnection) -> Result<PlatformAuthData> {
        self.sealer.open_credential(&connection.credential)
    }

    /// Return a credential that is valid for at least the refresh buffer,
    /// refreshing it first if needed.
    ///
    /// Concurrent callers for the same connection share one refresh: the
    /// first takes the gate and calls the provider, the rest wait on the gate
    /// and then pick up the persisted result.
    pub async fn ensure_valid(&self, connection: &PlatformConnection) -> Result<PlatformAuthData> {
        if !connection.active {
            return Err(IntegrationError::ReauthorizationRequired { connection_id: connection.id });
        }

        let credential = self.open(connection)?;
        if !self.needs_refresh(&credential) {
            if self.sealer.credential_needs_reencryption(&connection.credential)? {
                debug!(connection_id = %connection.id, "Credential sealed under a retired key");
            }
            return Ok(credential);
        }

        let lease = GateLease::acquire(&self.gates, connection.id);
        let _guard = lease.gate.lock().await;
        self.refresh_locked(connection.id).await
    }

    /// Persist a new credential, updating the existing active connection for
    /// the same owner, platform and account instead of duplicating it.
    pub async fn store_new_connection(&self, new: NewConnection) -> Result<PlatformConnection> {
        let owner = OwnerScope::resolve(&new.user_id, new.organization_id.as_deref());
        let now = self.clock.now();
        let sealed = self.sealer.seal_credential(&new.credential)?;

        let existing = self.store.find_active(&owner, new.platform, &new.account_id).await?;
        let connection = match existing {
            Some(mut existing) => {
                existing.replace_credential(sealed, now);
                existing.handle = new.handle;
                if new.metrics.is_some() {
                    existing.metrics = new.metrics;
                }
                info!(
                    connection_id = %existing.id,
                    platform = %existing.platform,
                    "Reconnected existing account"
                );
                existing
            }
            None => {
                let connection = PlatformConnection {
                    id: ConnectionId::new(),
                    user_id: new.user_id,
                    organization_id: new.organization_id,
                    platform: new.platform,
                    account_id: new.account_id,
                    handle: new.handle,
                    credential: sealed,
                    active: true,
                    deactivation_reason: None,
                    created_at: now,
                    updated_at: now,
                    last_sync_at: None,
                    metrics: new.metrics,
                };
                info!(
                    connection_id = %connection.id,
                    platform = %connection.platform,
                    "Stored new connection"
                );
                connection
            }
        };

        self.store.save(connection.clone()).await?;
        Ok(connection)
    }

    /// Soft-delete a connection.
    ///
    /// Waits for an in-flight refresh of the same connection, so a refresh
    /// can never write an active row back over the deactivation.
    pub async fn deactivate(&self, id: ConnectionId, reason: DeactivationReason) -> Result<()> {
        let lease = GateLease::acquire(&self.gates, id);
        let _guard = lease.gate.lock().await;
        self.deactivate_locked(id, reason).await
    }

    /// Replace the cached handle and metrics of an active connection.
    ///
    /// Runs under the connection's gate and re-reads the row, so a connection
    /// deactivated meanwhile is reported instead of revived.
    pub async fn update_profile(
        &self,
        id: ConnectionId,
        handle: String,
        metrics: ProfileMetrics,
    ) -> Result<PlatformConnection> {
        let lease = GateLease::acquire(&self.gates, id);
        let _guard = lease.gate.lock().await;

        let mut connection =
            self.store.get(id).await?.ok_or_else(|| IntegrationError::connection_not_found(id))?;
        if !connection.active {
            return Err(IntegrationError::ReauthorizationRequired { connection_id: id });
        }

        let now = self.clock.now();
        connection.handle = handle;
        connection.metrics = Some(metrics);
        connection.last_sync_at = Some(now);
        connection.updated_at = now;
        self.store.save(connection.clone()).await?;
        Ok(connection)
    }

    async fn deactivate_locked(&self, id: ConnectionId, reason: DeactivationReason) -> Result<()> {
        self.store.deactivate(id, reason).await?;
        warn!(connection_id = %id, reason = %reason, "Connection deactivated");
        Ok(())
    }

    /// Lifecycle state of a connection at the current time.
    pub fn state_of(&self, connection: &PlatformConnection) -> Result<ConnectionState> {
        let expires_at = if connection.active { self.open(connection)?.expires_at } else { None };
        Ok(ConnectionState::derive(
            connection,
            expires_at,
            self.config.tokens.refresh_buffer(),
            self.clock.now(),
        ))
    }

    fn needs_refresh(&self, credential: &PlatformAuthData) -> bool {
        is_expired(credential.expires_at, self.config.tokens.refresh_buffer(), self.clock.now())
    }

    async fn refresh_locked(&self, id: ConnectionId) -> Result<PlatformAuthData> {
        let connection =
            self.store.get(id).await?.ok_or_else(|| IntegrationError::connection_not_found(id))?;
        if !connection.active {
            return Err(IntegrationError::ReauthorizationRequired { connection_id: id });
        }

        let current = self.open(&connection)?;
        if !self.needs_refresh(&current) {
            debug!(connection_id = %id, "Credential already refreshed by another caller");
            return Ok(current);
        }

        let platform = connection.platform;
        let endpoints = self.config.endpoints(platform, current.instance_url.as_deref())?;
        let refreshable = match endpoints.descriptor.refresh {
            RefreshStyle::RefreshToken => current.refresh_token.is_some(),
            RefreshStyle::ExchangeAccessToken { .. } => {
                current.expires_at.is_some_and(|expiry| expiry > self.clock.now())
            }
            RefreshStyle::Unsupported => false,
        };
        if !refreshable {
            return self.retire(id, DeactivationReason::RefreshUnavailable).await;
        }

        let client = self.secrets.client_credentials(platform).await?;
        debug!(connection_id = %id, platform = %platform, "Refreshing credential");

        let refreshed = self
            .provider
            .refresh(RefreshRequest { endpoints, client, credential: current.clone() })
            .await;

        let mut fresh = match refreshed {
            Ok(fresh) => fresh,
            Err(IntegrationError::ProviderExchange { message, .. }) => {
                warn!(connection_id = %id, platform = %platform, %message, "Refresh rejected");
                return self.retire(id, DeactivationReason::RefreshRejected).await;
            }
            Err(err) => {
                warn!(
                    connection_id = %id,
                    platform = %platform,
                    error_kind = err.kind(),
                    "Refresh failed"
                );
                return Err(err);
            }
        };

        if fresh.refresh_token.is_none() {
            fresh.refresh_token = current.refresh_token;
        }
        if fresh.scopes.is_empty() {
            fresh.scopes = current.scopes;
        }
        if fresh.instance_url.is_none() {
            fresh.instance_url = current.instance_url;
        }

        let sealed = self.sealer.seal_credential(&fresh)?;
        if !self.store.update_credential(id, sealed, self.clock.now()).await? {
            warn!(
                connection_id = %id,
                platform = %platform,
                "Connection deactivated during refresh"
            );
            return Err(IntegrationError::ReauthorizationRequired { connection_id: id });
        }

        info!(connection_id = %id, platform = %platform, "Credential refreshed");
        Ok(fresh)
    }

    async fn retire(
        &self,
        id: ConnectionId,
        reason: DeactivationReason,
    ) -> Result<PlatformAuthData> {
        self.deactivate_locked(id, reason).await?;
        Err(IntegrationError::ReauthorizationRequired { connection_id: id })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    /// Validates the refresh boundary is inclusive at `expiry - buffer`.
    #[test]
    fn test_is_expired_boundary() {
        let expiry = Utc::now();
        let buffer = Duration::seconds(300);

        assert!(!is_expired(Some(expiry), buffer, expiry - Duration::seconds(301)));
        assert!(is_expired(Some(expiry), buffer, expiry - Duration::seconds(300)));
        assert!(is_expired(Some(expiry), buffer, expiry - Duration::seconds(299)));
        assert!(is_expired(Some(expiry), buffer, expiry + Duration::seconds(1)));
    }

    /// Validates credentials without an expiry never expire.
    #[test]
    fn test_no_expiry_never_expires() {
        let far_future = Utc::now() + Duration::days(36_500);
        assert!(!is_expired(None, Duration::seconds(300), far_future));
    }

    /// Validates a gate entry outlives the first lease while another is held.
    #[test]
    fn test_gate_entry_removed_with_last_lease() {
        let gates = Gates::default();
        let id = ConnectionId::new();

        let first = GateLease::acquire(&gates, id);
        let second = GateLease::acquire(&gates, id);
        assert!(Arc::ptr_eq(&first.gate, &second.gate));

        drop(first);
        assert!(gates.contains_key(&id));

        drop(second);
        assert!(gates.is_empty());
    }

    /// Validates a cancelled holder of the gate does not leak its entry.
    #[tokio::test]
    async fn test_cancelled_holder_releases_gate_entry() {
        let gates = Gates::default();
        let id = ConnectionId::new();

        let held = async {
            let lease = GateLease::acquire(&gates, id);
            let _guard = lease.gate.lock().await;
            std::future::pending::<()>().await;
        };
        let outcome = tokio::time::timeout(std::time::Duration::from_millis(20), held).await;

        assert!(outcome.is_err());
        assert!(gates.is_empty());

        let lease = GateLease::acquire(&gates, id);
        assert!(lease.gate.try_lock().is_ok());
    }
}
