//! Platform connections and the credential payload they carry.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::platform::Platform;
use crate::errors::IntegrationError;

/// Identifier of a [`PlatformConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ConnectionId {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| IntegrationError::InvalidRequest(format!("invalid connection id '{s}'")))
    }
}

/// Who owns a connection for uniqueness purposes: the organization when the
/// user belongs to one, otherwise the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerScope {
    User(String),
    Organization(String),
}

impl OwnerScope {
    /// Scope for a user with an optional resolved organization.
    pub fn resolve(user_id: &str, organization_id: Option<&str>) -> Self {
        match organization_id {
            Some(org) => Self::Organization(org.to_string()),
            None => Self::User(user_id.to_string()),
        }
    }
}

/// Opaque, sealed [`PlatformAuthData`] (unpadded base64url AEAD blob).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedCredential(String);

impl SealedCredential {
    pub fn new(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SealedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedCredential({} bytes)", self.0.len())
    }
}

/// Why a connection stopped being active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeactivationReason {
    /// The user disconnected the account.
    UserDisconnected,
    /// The provider told us the grant was revoked.
    ProviderRevoked,
    /// The credential expired and there was nothing to refresh it with.
    RefreshUnavailable,
    /// The provider rejected the refresh attempt.
    RefreshRejected,
}

crate::impl_slug_conversions!(DeactivationReason {
    UserDisconnected => "user_disconnected",
    ProviderRevoked => "provider_revoked",
    RefreshUnavailable => "refresh_unavailable",
    RefreshRejected => "refresh_rejected",
});

/// Cached account metrics from the last profile sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetrics {
    pub display_name: Option<String>,
    pub followers_count: Option<u64>,
    pub following_count: Option<u64>,
    pub profile_image_url: Option<String>,
    pub profile_url: Option<String>,
}

/// One authenticated link between an owner and one external account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformConnection {
    pub id: ConnectionId,
    pub user_id: String,
    pub organization_id: Option<String>,
    pub platform: Platform,
    pub account_id: String,
    pub handle: String,
    pub credential: SealedCredential,
    pub active: bool,
    pub deactivation_reason: Option<DeactivationReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub metrics: Option<ProfileMetrics>,
}

impl PlatformConnection {
    /// Uniqueness scope of this connection.
    pub fn owner(&self) -> OwnerScope {
        OwnerScope::resolve(&self.user_id, self.organization_id.as_deref())
    }

    /// Soft-delete in place.
    pub fn deactivate(&mut self, reason: DeactivationReason, at: DateTime<Utc>) {
        self.active = false;
        self.deactivation_reason = Some(reason);
        self.updated_at = at;
    }

    /// Replace the sealed credential after a refresh.
    pub fn replace_credential(&mut self, credential: SealedCredential, at: DateTime<Utc>) {
        self.credential = credential;
        self.updated_at = at;
    }
}

/// Decrypted credential payload.
///
/// `Debug` never prints token material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformAuthData {
    pub access_token: String,
    /// OAuth 1.0a token secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// `None` for credentials that do not expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub token_type: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Instance base URL for federated platforms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<String>,
}

impl PlatformAuthData {
    /// Bearer credential with an optional lifetime in seconds from `issued_at`.
    pub fn bearer(
        access_token: impl Into<String>,
        expires_in: Option<i64>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_secret: None,
            refresh_token: None,
            expires_at: expires_in.map(|secs| issued_at + Duration::seconds(secs)),
            token_type: "bearer".to_string(),
            scopes: Vec::new(),
            instance_url: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: Option<String>) -> Self {
        self.refresh_token = refresh_token;
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_instance_url(mut self, instance_url: Option<String>) -> Self {
        self.instance_url = instance_url;
        self
    }
}

impl fmt::Debug for PlatformAuthData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformAuthData")
            .field("access_token", &"[REDACTED]")
            .field("token_secret", &self.token_secret.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .field("scopes", &self.scopes)
            .field("instance_url", &self.instance_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_scope_prefers_organization() {
        assert_eq!(OwnerScope::resolve("u1", Some("o1")), OwnerScope::Organization("o1".into()));
        assert_eq!(OwnerScope::resolve("u1", None), OwnerScope::User("u1".into()));
    }

    #[test]
    fn bearer_computes_expiry_from_expires_in() {
        let issued = Utc::now();
        let auth = PlatformAuthData::bearer("tok", Some(3600), issued);
        assert_eq!(auth.expires_at, Some(issued + Duration::seconds(3600)));
        assert!(PlatformAuthData::bearer("tok", None, issued).expires_at.is_none());
    }

    #[test]
    fn debug_redacts_tokens() {
        let auth = PlatformAuthData::bearer("access-abc", Some(60), Utc::now())
            .with_refresh_token(Some("refresh-xyz".into()));
        let rendered = format!("{auth:?}");
        assert!(!rendered.contains("access-abc"));
        assert!(!rendered.contains("refresh-xyz"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn connection_id_parses() {
        let id = ConnectionId::new();
        assert_eq!(id.to_string().parse::<ConnectionId>().unwrap(), id);
        assert!("nope".parse::<ConnectionId>().is_err());
    }
}
