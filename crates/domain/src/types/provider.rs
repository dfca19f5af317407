//! OAuth handshake descriptors per platform.
//!
//! The handshake differs across providers in a handful of well-defined ways:
//! protocol version, PKCE, the name of the client id parameter, how the
//! client authenticates at the token endpoint and how (or whether) an access
//! token can be renewed. Each of those is a field here so the flow builder
//! and token manager never branch on the platform itself.

use std::fmt;

use postbridge_common::SecureString;
use serde::{Deserialize, Serialize};

use super::platform::Platform;

/// Handshake protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProtocol {
    /// OAuth 2.0 authorization code grant.
    OAuth2,
    /// OAuth 1.0a three-legged flow (request token, authorize, access token).
    OAuth1a,
}

/// How the client authenticates at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthStyle {
    /// `client_id` and `client_secret` in the form body.
    RequestBody,
    /// HTTP Basic with `client_id:client_secret`.
    BasicHeader,
}

/// How an expiring access token is renewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStyle {
    /// Standard `grant_type=refresh_token`.
    RefreshToken,
    /// Exchange the still-valid long-lived access token for a new one.
    ExchangeAccessToken { grant_type: &'static str },
    /// Tokens cannot be renewed; expiry requires reauthorization.
    Unsupported,
}

/// Static handshake description for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub platform: Platform,
    pub protocol: AuthProtocol,
    pub uses_pkce: bool,
    /// Authorize endpoint, or the path appended to the instance for
    /// federated platforms.
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    /// OAuth 1.0a request-token endpoint.
    pub request_token_url: Option<&'static str>,
    /// Separate endpoint used by [`RefreshStyle::ExchangeAccessToken`].
    pub refresh_url: Option<&'static str>,
    pub api_base_url: &'static str,
    pub upload_base_url: Option<&'static str>,
    pub client_id_param: &'static str,
    pub client_auth: ClientAuthStyle,
    pub refresh: RefreshStyle,
    pub default_scopes: &'static [&'static str],
    pub scope_separator: &'static str,
    pub extra_authorize_params: &'static [(&'static str, &'static str)],
}

impl Platform {
    /// Handshake descriptor for this platform.
    pub const fn provider(self) -> ProviderDescriptor {
        match self {
            Self::X => ProviderDescriptor {
                platform: self,
                protocol: AuthProtocol::OAuth1a,
                uses_pkce: false,
                authorize_url: "https://api.twitter.com/oauth/authorize",
                token_url: "https://api.twitter.com/oauth/access_token",
                request_token_url: Some("https://api.twitter.com/oauth/request_token"),
                refresh_url: None,
                api_base_url: "https://api.twitter.com",
                upload_base_url: Some("https://upload.twitter.com"),
                client_id_param: "oauth_consumer_key",
                client_auth: ClientAuthStyle::RequestBody,
                refresh: RefreshStyle::Unsupported,
                default_scopes: &[],
                scope_separator: " ",
                extra_authorize_params: &[],
            },
            Self::Facebook => ProviderDescriptor {
                platform: self,
                protocol: AuthProtocol::OAuth2,
                uses_pkce: false,
                authorize_url: "https://www.facebook.com/v19.0/dialog/oauth",
                token_url: "https://graph.facebook.com/v19.0/oauth/access_token",
                request_token_url: None,
                refresh_url: None,
                api_base_url: "https://graph.facebook.com/v19.0",
                upload_base_url: None,
                client_id_param: "client_id",
                client_auth: ClientAuthStyle::RequestBody,
                refresh: RefreshStyle::Unsupported,
                default_scopes: &[
                    "pages_show_list",
                    "pages_read_engagement",
                    "pages_manage_posts",
                    "read_insights",
                ],
                scope_separator: ",",
                extra_authorize_params: &[],
            },
            Self::Instagram => ProviderDescriptor {
                platform: self,
                protocol: AuthProtocol::OAuth2,
                uses_pkce: false,
                authorize_url: "https://www.instagram.com/oauth/authorize",
                token_url: "https://api.instagram.com/oauth/access_token",
                request_token_url: None,
                refresh_url: Some("https://graph.instagram.com/refresh_access_token"),
                api_base_url: "https://graph.instagram.com",
                upload_base_url: None,
                client_id_param: "client_id",
                client_auth: ClientAuthStyle::RequestBody,
                refresh: RefreshStyle::ExchangeAccessToken { grant_type: "ig_refresh_token" },
                default_scopes: &[
                    "instagram_business_basic",
                    "instagram_business_content_publish",
                    "instagram_business_manage_insights",
                ],
                scope_separator: ",",
                extra_authorize_params: &[],
            },
            Self::LinkedIn => ProviderDescriptor {
                platform: self,
                protocol: AuthProtocol::OAuth2,
                uses_pkce: false,
                authorize_url: "https://www.linkedin.com/oauth/v2/authorization",
                token_url: "https://www.linkedin.com/oauth/v2/accessToken",
                request_token_url: None,
                refresh_url: None,
                api_base_url: "https://api.linkedin.com",
                upload_base_url: None,
                client_id_param: "client_id",
                client_auth: ClientAuthStyle::RequestBody,
                refresh: RefreshStyle::RefreshToken,
                default_scopes: &["openid", "profile", "w_member_social"],
                scope_separator: " ",
                extra_authorize_params: &[],
            },
            Self::TikTok => ProviderDescriptor {
                platform: self,
                protocol: AuthProtocol::OAuth2,
                uses_pkce: true,
                authorize_url: "https://www.tiktok.com/v2/auth/authorize/",
                token_url: "https://open.tiktokapis.com/v2/oauth/token/",
                request_token_url: None,
                refresh_url: None,
                api_base_url: "https://open.tiktokapis.com",
                upload_base_url: None,
                client_id_param: "client_key",
                client_auth: ClientAuthStyle::RequestBody,
                refresh: RefreshStyle::RefreshToken,
                default_scopes: &[
                    "user.info.basic",
                    "user.info.stats",
                    "video.publish",
                    "video.list",
                ],
                scope_separator: ",",
                extra_authorize_params: &[],
            },
            Self::YouTube => ProviderDescriptor {
                platform: self,
                protocol: AuthProtocol::OAuth2,
                uses_pkce: true,
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
                token_url: "https://oauth2.googleapis.com/token",
                request_token_url: None,
                refresh_url: None,
                api_base_url: "https://www.googleapis.com",
                upload_base_url: Some("https://www.googleapis.com/upload"),
                client_id_param: "client_id",
                client_auth: ClientAuthStyle::RequestBody,
                refresh: RefreshStyle::RefreshToken,
                default_scopes: &[
                    "https://www.googleapis.com/auth/youtube.upload",
                    "https://www.googleapis.com/auth/youtube.readonly",
                    "https://www.googleapis.com/auth/youtube.force-ssl",
                ],
                scope_separator: " ",
                extra_authorize_params: &[("access_type", "offline"), ("prompt", "consent")],
            },
            Self::Reddit => ProviderDescriptor {
                platform: self,
                protocol: AuthProtocol::OAuth2,
                uses_pkce: false,
                authorize_url: "https://www.reddit.com/api/v1/authorize",
                token_url: "https://www.reddit.com/api/v1/access_token",
                request_token_url: None,
                refresh_url: None,
                api_base_url: "https://oauth.reddit.com",
                upload_base_url: None,
                client_id_param: "client_id",
                client_auth: ClientAuthStyle::BasicHeader,
                refresh: RefreshStyle::RefreshToken,
                default_scopes: &["identity", "submit", "read", "edit"],
                scope_separator: " ",
                extra_authorize_params: &[("duration", "permanent")],
            },
            Self::Mastodon => ProviderDescriptor {
                platform: self,
                protocol: AuthProtocol::OAuth2,
                uses_pkce: true,
                authorize_url: "/oauth/authorize",
                token_url: "/oauth/token",
                request_token_url: None,
                refresh_url: None,
                api_base_url: "",
                upload_base_url: None,
                client_id_param: "client_id",
                client_auth: ClientAuthStyle::RequestBody,
                refresh: RefreshStyle::Unsupported,
                default_scopes: &["read", "write"],
                scope_separator: " ",
                extra_authorize_params: &[],
            },
            Self::Threads => ProviderDescriptor {
                platform: self,
                protocol: AuthProtocol::OAuth2,
                uses_pkce: false,
                authorize_url: "https://threads.net/oauth/authorize",
                token_url: "https://graph.threads.net/oauth/access_token",
                request_token_url: None,
                refresh_url: Some("https://graph.threads.net/refresh_access_token"),
                api_base_url: "https://graph.threads.net/v1.0",
                upload_base_url: None,
                client_id_param: "client_id",
                client_auth: ClientAuthStyle::RequestBody,
                refresh: RefreshStyle::ExchangeAccessToken { grant_type: "th_refresh_token" },
                default_scopes: &[
                    "threads_basic",
                    "threads_content_publish",
                    "threads_manage_insights",
                ],
                scope_separator: ",",
                extra_authorize_params: &[],
            },
        }
    }
}

/// Descriptor with every URL resolved against configuration overrides and,
/// for federated platforms, the instance URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub descriptor: ProviderDescriptor,
    pub authorize_url: String,
    pub token_url: String,
    pub request_token_url: Option<String>,
    pub refresh_url: Option<String>,
    pub api_base_url: String,
    pub upload_base_url: Option<String>,
    pub scopes: Vec<String>,
}

impl ProviderEndpoints {
    /// Platform these endpoints belong to.
    pub fn platform(&self) -> Platform {
        self.descriptor.platform
    }

    /// Scopes joined with the provider's separator.
    pub fn scope_string(&self) -> String {
        self.scopes.join(self.descriptor.scope_separator)
    }
}

/// OAuth client registration for one platform (consumer key/secret for
/// OAuth 1.0a).
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: SecureString,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<SecureString>) -> Self {
        Self { client_id: client_id.into(), client_secret: client_secret.into() }
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}
