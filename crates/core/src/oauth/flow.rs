//! OAuth flow builder
//!
//! Builds provider authorization URLs and completes the callback. The only
//! state that survives between the two calls is the sealed [`AuthState`]
//! blob the caller keeps; it is treated as adversarial when it comes back.

use std::sync::Arc;

use postbridge_common::auth::{generate_state, validate_state, PkcePair};
use postbridge_domain::{
    AuthProtocol, AuthState, AuthorizationRedirect, AuthorizationRequest, IntegrationConfig,
    IntegrationError, Platform, PlatformAuthData, ProviderEndpoints, Result, StateRejection,
    TemporaryCredentials,
};
use tracing::{debug, info, warn};
use url::Url;

use super::sealing::CredentialSealer;
use crate::clock::{Clock, SystemClock};
use crate::ports::{AuthorizationProvider, CodeExchange, SecretsProvider, StateLedger};

/// Credential obtained from a completed callback, with the context sealed
/// into the state when the flow started.
#[derive(Debug, Clone)]
pub struct CompletedAuthorization {
    pub platform: Platform,
    pub user_id: String,
    pub credential: PlatformAuthData,
    pub redirect_target: Option<String>,
}

/// Builds and completes OAuth 2.0 and OAuth 1.0a authorization flows.
pub struct OAuthFlowBuilder {
    config: Arc<IntegrationConfig>,
    sealer: Arc<CredentialSealer>,
    secrets: Arc<dyn SecretsProvider>,
    provider: Arc<dyn AuthorizationProvider>,
    ledger: Arc<dyn StateLedger>,
    clock: Arc<dyn Clock>,
}

impl OAuthFlowBuilder {
    pub fn new(
        config: Arc<IntegrationConfig>,
        sealer: Arc<CredentialSealer>,
        secrets: Arc<dyn SecretsProvider>,
        provider: Arc<dyn AuthorizationProvider>,
        ledger: Arc<dyn StateLedger>,
    ) -> Self {
        Self { config, sealer, secrets, provider, ledger, clock: Arc::new(SystemClock) }
    }

    /// Replace the wall clock (tests)
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Start a connection: mint state (and PKCE material), seal it, and
    /// return the provider URL.
    ///
    /// OAuth 1.0a providers are contacted once here to obtain a request
    /// token; OAuth 2.0 providers are not contacted at all.
    pub async fn build_authorization_url(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationRedirect> {
        if request.user_id.trim().is_empty() {
            return Err(IntegrationError::InvalidRequest("user_id is required".into()));
        }
        let redirect_uri = parse_absolute(&request.redirect_uri)?;

        let platform = request.platform;
        let endpoints = self.config.endpoints(platform, request.instance_url.as_deref())?;
        let client = self.secrets.client_credentials(platform).await?;
        let state = generate_state()?;

        let mut auth_state = AuthState {
            state: state.clone(),
            code_verifier: None,
            request_token: None,
            request_token_secret: None,
            user_id: request.user_id.clone(),
            platform,
            created_at: self.clock.now(),
            redirect_uri: request.redirect_uri.clone(),
            redirect_target: request.redirect_target.clone(),
            instance_url: platform.is_federated().then(|| endpoints.api_base_url.clone()),
        };

        let mut url = parse_absolute(&endpoints.authorize_url)
            .map_err(|_| invalid_endpoint(platform, &endpoints.authorize_url))?;

        match endpoints.descriptor.protocol {
            AuthProtocol::OAuth2 => {
                let scopes = request
                    .scopes
                    .as_ref()
                    .map_or_else(|| endpoints.scope_string(), |s| {
                        s.join(endpoints.descriptor.scope_separator)
                    });

                let mut query = url.query_pairs_mut();
                query
                    .append_pair("response_type", "code")
                    .append_pair(endpoints.descriptor.client_id_param, &client.client_id)
                    .append_pair("redirect_uri", &request.redirect_uri);
                if !scopes.is_empty() {
                    query.append_pair("scope", &scopes);
                }
                query.append_pair("state", &state);

                if endpoints.descriptor.uses_pkce {
                    let pkce = PkcePair::generate()?;
                    query
                        .append_pair("code_challenge", &pkce.code_challenge)
                        .append_pair("code_challenge_method", pkce.challenge_method());
                    auth_state.code_verifier = Some(pkce.code_verifier.clone());
                }

                for (key, value) in endpoints.descriptor.extra_authorize_params {
                    query.append_pair(key, value);
                }
            }
            AuthProtocol::OAuth1a => {
                let mut callback = redirect_uri;
                callback.query_pairs_mut().append_pair("state", &state);

                let temporary = self
                    .provider
                    .request_temporary_credentials(&endpoints, &client, callback.as_str())
                    .await?;

                url.query_pairs_mut().append_pair("oauth_token", &temporary.token);
                auth_state.request_token = Some(temporary.token.clone());
                auth_state.request_token_secret = Some(temporary.token_secret.clone());
            }
        }

        let encrypted_state = self.sealer.seal_state(&auth_state)?;

        info!(platform = %platform, user_id = %request.user_id, "Authorization flow started");

        Ok(AuthorizationRedirect { url: url.into(), encrypted_state, state })
    }

    /// Finish a connection from the provider callback.
    ///
    /// `code` is the authorization code, or `oauth_verifier` for OAuth 1.0a.
    /// The state token is consumed before any network call, so a replayed
    /// callback fails even while the first one is still exchanging.
    pub async fn complete_authorization(
        &self,
        platform: Platform,
        code: &str,
        returned_state: &str,
        encrypted_state: &str,
    ) -> Result<CompletedAuthorization> {
        let sealed = self.sealer.open_state(encrypted_state).inspect_err(|err| {
            warn!(platform = %platform, error_kind = err.kind(), "Rejected authorization state");
        })?;

        self.verify_state(platform, returned_state, &sealed).inspect_err(|err| {
            warn!(platform = %platform, error_kind = err.kind(), "Rejected authorization state");
        })?;

        if !self.consume(&sealed.state).await? {
            warn!(platform = %platform, "Authorization state replayed");
            return Err(IntegrationError::state(StateRejection::Replayed));
        }

        if code.trim().is_empty() {
            return Err(IntegrationError::InvalidRequest("authorization code is missing".into()));
        }

        let endpoints = self.config.endpoints(platform, sealed.instance_url.as_deref())?;
        let request_token = self.sealed_request_token(&endpoints, &sealed)?;
        if endpoints.descriptor.uses_pkce && sealed.code_verifier.is_none() {
            return Err(IntegrationError::state(StateRejection::Incomplete));
        }

        let client = self.secrets.client_credentials(platform).await?;
        let instance_url = platform.is_federated().then(|| endpoints.api_base_url.clone());

        debug!(platform = %platform, "Exchanging authorization code");
        let mut credential = self
            .provider
            .exchange_code(CodeExchange {
                endpoints,
                client,
                code: code.to_string(),
                redirect_uri: sealed.redirect_uri.clone(),
                code_verifier: sealed.code_verifier.clone(),
                request_token,
            })
            .await
            .inspect_err(|err| {
                warn!(platform = %platform, error_kind = err.kind(), "Code exchange failed");
            })?;

        if credential.instance_url.is_none() {
            credential.instance_url = instance_url;
        }

        info!(platform = %platform, user_id = %sealed.user_id, "Authorization completed");

        Ok(CompletedAuthorization {
            platform,
            user_id: sealed.user_id,
            credential,
            redirect_target: sealed.redirect_target,
        })
    }

    async fn consume(&self, state: &str) -> Result<bool> {
        let ttl = self.config.oauth.state_max_age() + self.config.oauth.max_clock_skew();
        self.ledger.consume(state, ttl.to_std().unwrap_or_default()).await
    }

    fn verify_state(&self, platform: Platform, returned: &str, sealed: &AuthState) -> Result<()> {
        if sealed.platform != platform {
            return Err(IntegrationError::state(StateRejection::PlatformMismatch));
        }
        if !validate_state(&sealed.state, returned) {
            return Err(IntegrationError::state(StateRejection::TokenMismatch));
        }

        let now = self.clock.now();
        if sealed.created_at > now + self.config.oauth.max_clock_skew() {
            return Err(IntegrationError::state(StateRejection::NotYetValid));
        }
        if now - sealed.created_at > self.config.oauth.state_max_age() {
            return Err(IntegrationError::state(StateRejection::Expired));
        }
        Ok(())
    }

    fn sealed_request_token(
        &self,
        endpoints: &ProviderEndpoints,
        sealed: &AuthState,
    ) -> Result<Option<TemporaryCredentials>> {
        match endpoints.descriptor.protocol {
            AuthProtocol::OAuth2 => Ok(None),
            AuthProtocol::OAuth1a => match (&sealed.request_token, &sealed.request_token_secret) {
                (Some(token), Some(token_secret)) => Ok(Some(TemporaryCredentials {
                    token: token.clone(),
                    token_secret: token_secret.clone(),
                })),
                _ => Err(IntegrationError::state(StateRejection::Incomplete)),
            },
        }
    }
}

fn parse_absolute(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|err| IntegrationError::InvalidRequest(format!("invalid URL '{raw}': {err}")))?;
    if url.cannot_be_a_base() {
        return Err(IntegrationError::InvalidRequest(format!("invalid URL '{raw}'")));
    }
    Ok(url)
}

fn invalid_endpoint(platform: Platform, url: &str) -> IntegrationError {
    IntegrationError::Configuration(format!("{platform} authorize URL '{url}' is not absolute"))
}
