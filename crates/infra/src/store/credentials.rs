//! DashMap-backed credential store
//!
//! Keeps a secondary index of active connections keyed by
//! (owner scope, platform, account id). The index is updated through the
//! `entry` API so two concurrent saves can never both register an active
//! connection for the same account.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use postbridge_core::CredentialStore;
use postbridge_domain::{
    ConnectionId, DeactivationReason, IntegrationError, OwnerScope, Platform, PlatformConnection,
    Result, SealedCredential,
};
use tracing::debug;

type AccountKey = (OwnerScope, Platform, String);

fn account_key(connection: &PlatformConnection) -> AccountKey {
    (connection.owner(), connection.platform, connection.account_id.clone())
}

/// In-memory [`CredentialStore`]; connections hold only sealed credentials.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    connections: DashMap<ConnectionId, PlatformConnection>,
    active: DashMap<AccountKey, ConnectionId>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn release(&self, key: &AccountKey, id: ConnectionId) {
        self.active.remove_if(key, |_, holder| *holder == id);
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, id: ConnectionId) -> Result<Option<PlatformConnection>> {
        Ok(self.connections.get(&id).map(|c| c.value().clone()))
    }

    async fn save(&self, connection: PlatformConnection) -> Result<()> {
        let key = account_key(&connection);
        let id = connection.id;

        if connection.active {
            match self.active.entry(key.clone()) {
                Entry::Occupied(holder) if *holder.get() != id => {
                    return Err(IntegrationError::Storage(format!(
                        "{} account {} already has active connection {}",
                        connection.platform,
                        connection.account_id,
                        holder.get()
                    )));
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(id);
                }
            }
        } else {
            self.release(&key, id);
        }

        if let Some(previous) = self.connections.insert(id, connection) {
            let previous_key = account_key(&previous);
            if previous_key != key {
                self.release(&previous_key, id);
            }
        }

        debug!(connection_id = %id, "Connection saved");
        Ok(())
    }

    async fn update_credential(
        &self,
        id: ConnectionId,
        credential: SealedCredential,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(mut connection) = self.connections.get_mut(&id) else {
            return Ok(false);
        };
        if !connection.active {
            return Ok(false);
        }
        connection.replace_credential(credential, updated_at);

        debug!(connection_id = %id, "Credential replaced");
        Ok(true)
    }

    async fn deactivate(&self, id: ConnectionId, reason: DeactivationReason) -> Result<()> {
        let key = {
            let mut connection = self
                .connections
                .get_mut(&id)
                .ok_or_else(|| IntegrationError::connection_not_found(id))?;
            connection.deactivate(reason, Utc::now());
            account_key(&connection)
        };
        self.release(&key, id);

        debug!(connection_id = %id, reason = %reason, "Connection deactivated");
        Ok(())
    }

    async fn find_active(
        &self,
        owner: &OwnerScope,
        platform: Platform,
        account_id: &str,
    ) -> Result<Option<PlatformConnection>> {
        let key = (owner.clone(), platform, account_id.to_string());
        let Some(id) = self.active.get(&key).map(|holder| *holder.value()) else {
            return Ok(None);
        };
        Ok(self.connections.get(&id).filter(|c| c.active).map(|c| c.value().clone()))
    }

    async fn list_for_owner(&self, owner: &OwnerScope) -> Result<Vec<PlatformConnection>> {
        let mut connections: Vec<_> = self
            .connections
            .iter()
            .filter(|entry| &entry.owner() == owner)
            .map(|entry| entry.value().clone())
            .collect();
        connections.sort_by_key(|c| c.created_at);
        Ok(connections)
    }
}
