//! OAuth 2.0 and OAuth 1.0a token endpoint client
//!
//! Implements [`AuthorizationProvider`] for every platform from its
//! [`ProviderEndpoints`]: client authentication style, PKCE verifier,
//! refresh style and the OAuth 1.0a request/access token legs.

use std::sync::Arc;

use async_trait::async_trait;
use postbridge_core::{AuthorizationProvider, Clock, CodeExchange, RefreshRequest, SystemClock};
use postbridge_domain::{
    AuthProtocol, ClientAuthStyle, ClientCredentials, IntegrationError, Platform,
    PlatformAuthData, ProviderEndpoints, RefreshStyle, Result, TemporaryCredentials,
};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::signature::OAuth1Signer;
use crate::http::HttpClient;

/// Token endpoint response. Some providers report errors with HTTP 200.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<Value>,
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<Value>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Seconds from a number or a numeric string.
fn lenient_seconds(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Granted scopes from a delimited string or an array.
fn granted_scopes(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split([' ', ','])
            .filter(|scope| !scope.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(items)) => {
            items.iter().filter_map(|item| item.as_str().map(str::to_string)).collect()
        }
        _ => Vec::new(),
    }
}

fn form_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Grant used to trade a short-lived user token for a long-lived one.
fn long_lived_grant(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::Facebook => Some("fb_exchange_token"),
        Platform::Instagram => Some("ig_exchange_token"),
        Platform::Threads => Some("th_exchange_token"),
        _ => None,
    }
}

/// HTTP implementation of [`AuthorizationProvider`].
#[derive(Clone)]
pub struct OAuthProviderClient {
    http: HttpClient,
    clock: Arc<dyn Clock>,
}

impl OAuthProviderClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http, clock: Arc::new(SystemClock) }
    }

    /// Compute expiry instants from `clock` instead of the system time.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn authenticate(
        &self,
        builder: RequestBuilder,
        endpoints: &ProviderEndpoints,
        client: &ClientCredentials,
        form: &mut Vec<(String, String)>,
    ) -> RequestBuilder {
        match endpoints.descriptor.client_auth {
            ClientAuthStyle::RequestBody => {
                form.push((endpoints.descriptor.client_id_param.into(), client.client_id.clone()));
                form.push(("client_secret".into(), client.client_secret.expose().to_string()));
                builder
            }
            ClientAuthStyle::BasicHeader => {
                builder.basic_auth(&client.client_id, Some(client.client_secret.expose()))
            }
        }
    }

    async fn token_request(
        &self,
        platform: Platform,
        builder: RequestBuilder,
    ) -> Result<PlatformAuthData> {
        let response: TokenResponse = self.http.json(platform, builder).await?;
        self.credential_from(platform, response)
    }

    fn credential_from(
        &self,
        platform: Platform,
        response: TokenResponse,
    ) -> Result<PlatformAuthData> {
        let Some(access_token) = response.access_token.filter(|t| !t.is_empty()) else {
            let message = match (response.error, response.error_description) {
                (Some(error), Some(description)) => format!("{error}: {description}"),
                (Some(error), None) => error,
                (None, Some(description)) => description,
                (None, None) => "token response without access_token".to_string(),
            };
            return Err(IntegrationError::exchange(platform, message));
        };

        let mut credential = PlatformAuthData::bearer(
            access_token,
            lenient_seconds(response.expires_in.as_ref()),
            self.clock.now(),
        )
        .with_refresh_token(response.refresh_token.filter(|t| !t.is_empty()))
        .with_scopes(granted_scopes(response.scope.as_ref()));
        if let Some(token_type) = response.token_type {
            credential.token_type = token_type.to_ascii_lowercase();
        }
        Ok(credential)
    }

    async fn exchange_oauth2(&self, exchange: CodeExchange) -> Result<PlatformAuthData> {
        let endpoints = &exchange.endpoints;
        let platform = endpoints.platform();

        let mut form = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), exchange.code.clone()),
            ("redirect_uri".to_string(), exchange.redirect_uri.clone()),
        ];
        if let Some(verifier) = &exchange.code_verifier {
            form.push(("code_verifier".into(), verifier.clone()));
        }

        let builder = self.http.request(Method::POST, &endpoints.token_url);
        let builder = self.authenticate(builder, endpoints, &exchange.client, &mut form);

        debug!(platform = %platform, "Requesting access token");
        let credential = self.token_request(platform, builder.form(&form)).await?;

        match long_lived_grant(platform) {
            Some(grant) => {
                self.upgrade_long_lived(endpoints, &exchange.client, credential, grant).await
            }
            None => Ok(credential),
        }
    }

    /// Trade a short-lived Meta user token for a long-lived one.
    async fn upgrade_long_lived(
        &self,
        endpoints: &ProviderEndpoints,
        client: &ClientCredentials,
        short_lived: PlatformAuthData,
        grant: &str,
    ) -> Result<PlatformAuthData> {
        let platform = endpoints.platform();
        let secret = client.client_secret.expose();

        let builder = match endpoints.refresh_url.as_deref() {
            Some(refresh_url) => {
                let url = Url::parse(refresh_url)
                    .and_then(|url| url.join("access_token"))
                    .map_err(|err| {
                        IntegrationError::Configuration(format!(
                            "invalid {platform} refresh URL: {err}"
                        ))
                    })?;
                self.http.request(Method::GET, url).query(&[
                    ("grant_type", grant),
                    ("client_secret", secret),
                    ("access_token", short_lived.access_token.as_str()),
                ])
            }
            None => self.http.request(Method::GET, &endpoints.token_url).query(&[
                ("grant_type", grant),
                ("client_id", client.client_id.as_str()),
                ("client_secret", secret),
                ("fb_exchange_token", short_lived.access_token.as_str()),
            ]),
        };

        debug!(platform = %platform, "Upgrading to long-lived token");
        let mut long_lived = self.token_request(platform, builder).await?;
        if long_lived.scopes.is_empty() {
            long_lived.scopes = short_lived.scopes;
        }
        Ok(long_lived)
    }

    async fn exchange_oauth1(&self, exchange: CodeExchange) -> Result<PlatformAuthData> {
        let endpoints = &exchange.endpoints;
        let platform = endpoints.platform();
        let request_token = exchange.request_token.as_ref().ok_or_else(|| {
            IntegrationError::InvalidRequest("OAuth 1.0a exchange without a request token".into())
        })?;

        let signer =
            OAuth1Signer::new(&exchange.client.client_id, exchange.client.client_secret.expose())
                .with_token(&request_token.token, &request_token.token_secret);
        let authorization = signer.authorization(
            "POST",
            &endpoints.token_url,
            &[("oauth_verifier", exchange.code.as_str())],
            &[],
        )?;

        debug!(platform = %platform, "Requesting OAuth 1.0a access token");
        let pairs = self
            .http
            .form(
                platform,
                self.http
                    .request(Method::POST, &endpoints.token_url)
                    .header(reqwest::header::AUTHORIZATION, authorization),
            )
            .await?;

        match (form_value(&pairs, "oauth_token"), form_value(&pairs, "oauth_token_secret")) {
            (Some(token), Some(secret)) => Ok(PlatformAuthData {
                access_token: token.to_string(),
                token_secret: Some(secret.to_string()),
                refresh_token: None,
                expires_at: None,
                token_type: "oauth1".to_string(),
                scopes: Vec::new(),
                instance_url: None,
            }),
            _ => Err(IntegrationError::exchange(
                platform,
                "access token response missing oauth_token",
            )),
        }
    }
}

#[async_trait]
impl AuthorizationProvider for OAuthProviderClient {
    async fn request_temporary_credentials(
        &self,
        endpoints: &ProviderEndpoints,
        client: &ClientCredentials,
        callback_url: &str,
    ) -> Result<TemporaryCredentials> {
        let platform = endpoints.platform();
        let url = endpoints.request_token_url.as_deref().ok_or_else(|| {
            IntegrationError::Configuration(format!("{platform} has no request token endpoint"))
        })?;

        let authorization = OAuth1Signer::new(&client.client_id, client.client_secret.expose())
            .authorization("POST", url, &[("oauth_callback", callback_url)], &[])?;

        debug!(platform = %platform, "Requesting OAuth 1.0a request token");
        let pairs = self
            .http
            .form(
                platform,
                self.http
                    .request(Method::POST, url)
                    .header(reqwest::header::AUTHORIZATION, authorization),
            )
            .await?;

        if form_value(&pairs, "oauth_callback_confirmed") != Some("true") {
            return Err(IntegrationError::exchange(platform, "callback not confirmed by provider"));
        }
        match (form_value(&pairs, "oauth_token"), form_value(&pairs, "oauth_token_secret")) {
            (Some(token), Some(secret)) => Ok(TemporaryCredentials {
                token: token.to_string(),
                token_secret: secret.to_string(),
            }),
            _ => Err(IntegrationError::exchange(platform, "request token response incomplete")),
        }
    }

    async fn exchange_code(&self, exchange: CodeExchange) -> Result<PlatformAuthData> {
        let platform = exchange.endpoints.platform();
        let credential = match exchange.endpoints.descriptor.protocol {
            AuthProtocol::OAuth2 => self.exchange_oauth2(exchange).await?,
            AuthProtocol::OAuth1a => self.exchange_oauth1(exchange).await?,
        };
        info!(platform = %platform, "Access token obtained");
        Ok(credential)
    }

    async fn refresh(&self, request: RefreshRequest) -> Result<PlatformAuthData> {
        let endpoints = &request.endpoints;
        let platform = endpoints.platform();

        let builder = match endpoints.descriptor.refresh {
            RefreshStyle::RefreshToken => {
                let refresh_token = request.credential.refresh_token.clone().ok_or_else(|| {
                    IntegrationError::exchange(platform, "no refresh token available")
                })?;
                let mut form = vec![
                    ("grant_type".to_string(), "refresh_token".to_string()),
                    ("refresh_token".to_string(), refresh_token),
                ];
                let builder = self.http.request(Method::POST, &endpoints.token_url);
                let builder = self.authenticate(builder, endpoints, &request.client, &mut form);
                builder.form(&form)
            }
            RefreshStyle::ExchangeAccessToken { grant_type } => {
                let url = endpoints.refresh_url.as_deref().unwrap_or(&endpoints.token_url);
                self.http.request(Method::GET, url).query(&[
                    ("grant_type", grant_type),
                    ("access_token", request.credential.access_token.as_str()),
                ])
            }
            RefreshStyle::Unsupported => {
                return Err(IntegrationError::exchange(
                    platform,
                    "provider does not support token refresh",
                ));
            }
        };

        debug!(platform = %platform, "Refreshing access token");
        self.token_request(platform, builder).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn expires_in_accepts_numbers_and_strings() {
        assert_eq!(lenient_seconds(Some(&json!(3600))), Some(3600));
        assert_eq!(lenient_seconds(Some(&json!("5184000"))), Some(5_184_000));
        assert_eq!(lenient_seconds(Some(&json!(null))), None);
        assert_eq!(lenient_seconds(None), None);
    }

    #[test]
    fn scopes_accept_delimited_strings_and_arrays() {
        assert_eq!(granted_scopes(Some(&json!("read write"))), vec!["read", "write"]);
        assert_eq!(
            granted_scopes(Some(&json!("user.info.basic,video.publish"))),
            vec!["user.info.basic", "video.publish"]
        );
        assert_eq!(granted_scopes(Some(&json!(["a", "b"]))), vec!["a", "b"]);
        assert!(granted_scopes(None).is_empty());
    }

    #[test]
    fn error_in_successful_response_is_a_provider_refusal() {
        let client = OAuthProviderClient::new(HttpClient::builder().build().unwrap());
        let response: TokenResponse = serde_json::from_value(json!({
            "error": "invalid_grant",
            "error_description": "code expired"
        }))
        .unwrap();

        let err = client.credential_from(Platform::TikTok, response).unwrap_err();
        assert_eq!(
            err,
            IntegrationError::exchange(Platform::TikTok, "invalid_grant: code expired")
        );
    }
}
