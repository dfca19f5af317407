//! Connection lifecycle state machine.

use chrono::{DateTime, Utc};
use postbridge_domain::{DeactivationReason, IntegrationError, PlatformConnection, Result};
use serde::Serialize;

use super::lifecycle::is_expired;

/// Where a connection is in its lifecycle.
///
/// ```text
/// Connected -> TokenExpiringSoon -> Connected (refreshed)
///                                 -> ReauthorizationRequired -> Disconnected
/// ```
///
/// `Disconnected` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    TokenExpiringSoon,
    ReauthorizationRequired,
    Disconnected,
}

/// Something that happened to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The credential entered the refresh buffer.
    ExpiryApproaching,
    Refreshed,
    /// Refresh was rejected or impossible; the provider may also revoke a
    /// healthy connection.
    RefreshFailed,
    /// The user removed the connection.
    Disconnect,
}

impl ConnectionState {
    /// Apply `event`, rejecting transitions the lifecycle does not allow.
    pub fn transition(self, event: ConnectionEvent) -> Result<Self> {
        use ConnectionEvent as E;

        match (self, event) {
            (Self::Connected, E::ExpiryApproaching) => Ok(Self::TokenExpiringSoon),
            (Self::Connected | Self::TokenExpiringSoon, E::Refreshed) => Ok(Self::Connected),
            (Self::Connected | Self::TokenExpiringSoon, E::RefreshFailed) => {
                Ok(Self::ReauthorizationRequired)
            }
            (Self::Disconnected, _) => Err(illegal(self, event)),
            (_, E::Disconnect) => Ok(Self::Disconnected),
            _ => Err(illegal(self, event)),
        }
    }

    /// Derive the state from a stored connection and its credential expiry.
    pub fn derive(
        connection: &PlatformConnection,
        expires_at: Option<DateTime<Utc>>,
        buffer: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Self {
        if !connection.active {
            return match connection.deactivation_reason {
                Some(DeactivationReason::UserDisconnected) => Self::Disconnected,
                _ => Self::ReauthorizationRequired,
            };
        }

        if is_expired(expires_at, buffer, now) {
            Self::TokenExpiringSoon
        } else {
            Self::Connected
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::TokenExpiringSoon => "token_expiring_soon",
            Self::ReauthorizationRequired => "reauthorization_required",
            Self::Disconnected => "disconnected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn illegal(state: ConnectionState, event: ConnectionEvent) -> IntegrationError {
    IntegrationError::Internal(format!("illegal connection transition: {state} on {event:?}"))
}
