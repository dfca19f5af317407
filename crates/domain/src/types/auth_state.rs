//! Values that travel through the OAuth redirect round trip.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::platform::Platform;

/// Single-use state sealed into the blob the caller keeps (cookie or session)
/// between the redirect and the callback.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
    /// OAuth 1.0a request token issued before the redirect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_token_secret: Option<String>,
    pub user_id: String,
    pub platform: Platform,
    pub created_at: DateTime<Utc>,
    pub redirect_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<String>,
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("state", &"[REDACTED]")
            .field("code_verifier", &self.code_verifier.as_ref().map(|_| "[REDACTED]"))
            .field("request_token", &self.request_token.as_ref().map(|_| "[REDACTED]"))
            .field("user_id", &self.user_id)
            .field("platform", &self.platform)
            .field("created_at", &self.created_at)
            .field("redirect_uri", &self.redirect_uri)
            .field("redirect_target", &self.redirect_target)
            .field("instance_url", &self.instance_url)
            .finish()
    }
}

/// Input to start a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub platform: Platform,
    pub user_id: String,
    pub redirect_uri: String,
    /// Overrides the configured scopes when set.
    pub scopes: Option<Vec<String>>,
    /// Where the product should send the user after connecting.
    pub redirect_target: Option<String>,
    /// Instance base URL for federated platforms.
    pub instance_url: Option<String>,
}

impl AuthorizationRequest {
    pub fn new(
        platform: Platform,
        user_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            user_id: user_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: None,
            redirect_target: None,
            instance_url: None,
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = Some(scopes);
        self
    }

    pub fn with_redirect_target(mut self, target: impl Into<String>) -> Self {
        self.redirect_target = Some(target.into());
        self
    }

    pub fn with_instance_url(mut self, instance_url: impl Into<String>) -> Self {
        self.instance_url = Some(instance_url.into());
        self
    }
}

/// Output of starting a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRedirect {
    /// Provider URL to send the user to.
    pub url: String,
    /// Sealed [`AuthState`] the caller must hand back on the callback.
    pub encrypted_state: String,
    /// Raw state token embedded in `url`.
    pub state: String,
}

/// OAuth 1.0a request token pair.
#[derive(Clone, PartialEq, Eq)]
pub struct TemporaryCredentials {
    pub token: String,
    pub token_secret: String,
}

impl fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("token", &self.token)
            .field("token_secret", &"[REDACTED]")
            .finish()
    }
}
