//! Integration tests for the OAuth flow builder
//!
//! Covers URL construction per provider, the sealed state round trip, and
//! every way a callback can be rejected before the code is exchanged.

mod support;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use postbridge_common::auth::generate_code_challenge;
use postbridge_core::{IntegrationService, MockClock};
use postbridge_domain::{
    AuthorizationRedirect, AuthorizationRequest, IntegrationConfig, IntegrationError, Platform,
    StateRejection,
};
use support::Harness;
use url::Url;

const REDIRECT_URI: &str = "https://app.example.com/oauth/callback";

async fn service(harness: &Harness, clock: &MockClock) -> IntegrationService {
    IntegrationService::with_clock(
        IntegrationConfig::default(),
        harness.ports(),
        Arc::new(clock.clone()),
    )
    .await
        .expect("service builds")
}

fn query(redirect: &AuthorizationRedirect) -> HashMap<String, String> {
    Url::parse(&redirect.url).unwrap().query_pairs().into_owned().collect()
}

fn tampered(blob: &str) -> String {
    let mut chars: Vec<char> = blob.chars().collect();
    let last = chars.len() - 1;
    chars[last] = if chars[last] == 'A' { 'B' } else { 'A' };
    chars.into_iter().collect()
}

// ============================================================================
// Authorization URL
// ============================================================================

/// LinkedIn: plain authorization code flow without PKCE
#[tokio::test]
async fn test_linkedin_authorization_url() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;

    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::LinkedIn, "u1", REDIRECT_URI))
        .await
        .unwrap();

    assert!(redirect.url.starts_with("https://www.linkedin.com/oauth/v2/authorization?"));
    let params = query(&redirect);
    assert_eq!(params["client_id"], "linkedin-client");
    assert_eq!(params["redirect_uri"], REDIRECT_URI);
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["state"], redirect.state);
    assert_eq!(params["scope"], "openid profile w_member_social");
    assert!(!params.contains_key("code_challenge"));

    let sealed = harness.sealer().open_state(&redirect.encrypted_state).unwrap();
    assert_eq!(sealed.state, redirect.state);
    assert_eq!(sealed.platform, Platform::LinkedIn);
    assert_eq!(sealed.user_id, "u1");
    assert!(sealed.code_verifier.is_none());
    assert_eq!(harness.authorization.temporary_count(), 0);
}

/// TikTok: PKCE with the provider's `client_key` parameter name
#[tokio::test]
async fn test_tiktok_uses_client_key_and_pkce() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;

    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::TikTok, "u1", REDIRECT_URI))
        .await
        .unwrap();

    let params = query(&redirect);
    assert_eq!(params["client_key"], "tiktok-client");
    assert!(!params.contains_key("client_id"));
    assert_eq!(params["code_challenge_method"], "S256");
    assert_eq!(params["scope"], "user.info.basic,user.info.stats,video.publish,video.list");

    let sealed = harness.sealer().open_state(&redirect.encrypted_state).unwrap();
    let verifier = sealed.code_verifier.expect("verifier sealed");
    assert_eq!(params["code_challenge"], generate_code_challenge(&verifier));
}

/// YouTube: provider extra parameters for offline access
#[tokio::test]
async fn test_youtube_requests_offline_access() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;

    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::YouTube, "u1", REDIRECT_URI))
        .await
        .unwrap();

    let params = query(&redirect);
    assert_eq!(params["access_type"], "offline");
    assert_eq!(params["prompt"], "consent");
}

/// Explicit scopes override the configured defaults
#[tokio::test]
async fn test_scope_override() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;

    let request = AuthorizationRequest::new(Platform::Reddit, "u1", REDIRECT_URI)
        .with_scopes(vec!["identity".into(), "submit".into()]);
    let redirect = service.build_authorization_url(&request).await.unwrap();

    let params = query(&redirect);
    assert_eq!(params["scope"], "identity submit");
    assert_eq!(params["duration"], "permanent");
}

/// X: OAuth 1.0a obtains a request token and seals it
#[tokio::test]
async fn test_x_uses_request_token() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;

    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::X, "u1", REDIRECT_URI))
        .await
        .unwrap();

    assert_eq!(harness.authorization.temporary_count(), 1);
    assert_eq!(query(&redirect)["oauth_token"], "request-token");

    let sealed = harness.sealer().open_state(&redirect.encrypted_state).unwrap();
    assert_eq!(sealed.request_token.as_deref(), Some("request-token"));
    assert_eq!(sealed.request_token_secret.as_deref(), Some("request-secret"));
}

/// Mastodon: endpoints resolve against the instance, which is mandatory
#[tokio::test]
async fn test_mastodon_requires_instance() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;

    let missing = AuthorizationRequest::new(Platform::Mastodon, "u1", REDIRECT_URI);
    assert!(matches!(
        service.build_authorization_url(&missing).await,
        Err(IntegrationError::InvalidRequest(_))
    ));

    let request = missing.with_instance_url("mastodon.social");
    let redirect = service.build_authorization_url(&request).await.unwrap();
    assert!(redirect.url.starts_with("https://mastodon.social/oauth/authorize?"));

    let sealed = harness.sealer().open_state(&redirect.encrypted_state).unwrap();
    assert_eq!(sealed.instance_url.as_deref(), Some("https://mastodon.social"));
}

/// Relative redirect URIs are rejected
#[tokio::test]
async fn test_relative_redirect_uri_rejected() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;

    let request = AuthorizationRequest::new(Platform::LinkedIn, "u1", "/callback");
    assert!(matches!(
        service.build_authorization_url(&request).await,
        Err(IntegrationError::InvalidRequest(_))
    ));
}

// ============================================================================
// Callback
// ============================================================================

/// Happy path: code exchanged once, identity resolved, connection stored
#[tokio::test]
async fn test_complete_authorization_stores_connection() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;
    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::LinkedIn, "u1", REDIRECT_URI))
        .await
        .unwrap();

    let connection = service
        .complete_authorization(
            Platform::LinkedIn,
            "code-1",
            &redirect.state,
            &redirect.encrypted_state,
        )
        .await
        .unwrap();

    assert!(connection.active);
    assert_eq!(connection.account_id, "acct-1");
    assert_eq!(connection.user_id, "u1");
    assert_eq!(harness.authorization.exchange_count(), 1);

    let exchange = harness.authorization.last_exchange().unwrap();
    assert_eq!(exchange.code, "code-1");
    assert_eq!(exchange.redirect_uri, REDIRECT_URI);
    assert!(exchange.code_verifier.is_none());

    let stored = harness.store.snapshot(connection.id).unwrap();
    let credential = harness.sealer().open_credential(&stored.credential).unwrap();
    assert_eq!(credential.access_token, "exchanged-access");
}

/// PKCE verifier from the sealed state reaches the token exchange
#[tokio::test]
async fn test_pkce_verifier_forwarded() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;
    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::YouTube, "u1", REDIRECT_URI))
        .await
        .unwrap();
    let sealed = harness.sealer().open_state(&redirect.encrypted_state).unwrap();

    service
        .complete_authorization(
            Platform::YouTube,
            "code",
            &redirect.state,
            &redirect.encrypted_state,
        )
        .await
        .unwrap();

    assert_eq!(harness.authorization.last_exchange().unwrap().code_verifier, sealed.code_verifier);
}

/// Returned state differing from the sealed one is a CSRF attempt
#[tokio::test]
async fn test_state_mismatch_rejected() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;
    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::LinkedIn, "u1", REDIRECT_URI))
        .await
        .unwrap();

    let err = service
        .complete_authorization(
            Platform::LinkedIn,
            "code",
            "forged-state",
            &redirect.encrypted_state,
        )
        .await
        .unwrap_err();

    assert_eq!(err, IntegrationError::state(StateRejection::TokenMismatch));
    assert_eq!(harness.authorization.exchange_count(), 0);
    assert!(harness.store.all().is_empty());
}

/// A state minted for one platform cannot complete another
#[tokio::test]
async fn test_platform_mismatch_rejected() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;
    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::LinkedIn, "u1", REDIRECT_URI))
        .await
        .unwrap();

    let err = service
        .complete_authorization(
            Platform::Reddit,
            "code",
            &redirect.state,
            &redirect.encrypted_state,
        )
        .await
        .unwrap_err();

    assert_eq!(err, IntegrationError::state(StateRejection::PlatformMismatch));
}

/// Any modification of the sealed blob is detected
#[tokio::test]
async fn test_tampered_state_rejected() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;
    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::LinkedIn, "u1", REDIRECT_URI))
        .await
        .unwrap();

    let err = service
        .complete_authorization(
            Platform::LinkedIn,
            "code",
            &redirect.state,
            &tampered(&redirect.encrypted_state),
        )
        .await
        .unwrap_err();

    assert_eq!(err, IntegrationError::state(StateRejection::Tampered));
    assert_eq!(harness.authorization.exchange_count(), 0);
}

/// The same state cannot be used twice
#[tokio::test]
async fn test_replayed_state_rejected() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;
    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::LinkedIn, "u1", REDIRECT_URI))
        .await
        .unwrap();

    service
        .complete_authorization(
            Platform::LinkedIn,
            "code",
            &redirect.state,
            &redirect.encrypted_state,
        )
        .await
        .unwrap();
    let err = service
        .complete_authorization(
            Platform::LinkedIn,
            "code",
            &redirect.state,
            &redirect.encrypted_state,
        )
        .await
        .unwrap_err();

    assert_eq!(err, IntegrationError::state(StateRejection::Replayed));
    assert_eq!(harness.authorization.exchange_count(), 1);
}

/// State older than the freshness bound is rejected
#[tokio::test]
async fn test_stale_state_rejected() {
    let harness = Harness::new();
    let clock = MockClock::new();
    let service = service(&harness, &clock).await;
    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::LinkedIn, "u1", REDIRECT_URI))
        .await
        .unwrap();

    clock.advance(Duration::seconds(601));

    let err = service
        .complete_authorization(
            Platform::LinkedIn,
            "code",
            &redirect.state,
            &redirect.encrypted_state,
        )
        .await
        .unwrap_err();

    assert_eq!(err, IntegrationError::state(StateRejection::Expired));
    assert_eq!(harness.authorization.exchange_count(), 0);
}

/// State dated beyond the allowed clock skew is rejected
#[tokio::test]
async fn test_future_dated_state_rejected() {
    let harness = Harness::new();
    let clock = MockClock::new();
    let service = service(&harness, &clock).await;
    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::LinkedIn, "u1", REDIRECT_URI))
        .await
        .unwrap();

    clock.advance(Duration::seconds(-120));

    let err = service
        .complete_authorization(
            Platform::LinkedIn,
            "code",
            &redirect.state,
            &redirect.encrypted_state,
        )
        .await
        .unwrap_err();

    assert_eq!(err, IntegrationError::state(StateRejection::NotYetValid));
}

/// Provider refusal surfaces as `ProviderExchange` and stores nothing
#[tokio::test]
async fn test_provider_rejection_surfaces() {
    let harness = Harness::new();
    harness
        .authorization
        .set_exchange(Err(IntegrationError::exchange(Platform::LinkedIn, "invalid_grant")));
    let service = service(&harness, &MockClock::new()).await;
    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::LinkedIn, "u1", REDIRECT_URI))
        .await
        .unwrap();

    let err = service
        .complete_authorization(
            Platform::LinkedIn,
            "code",
            &redirect.state,
            &redirect.encrypted_state,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, IntegrationError::ProviderExchange { .. }));
    assert!(harness.store.all().is_empty());
}

/// Reconnecting the same account updates it instead of duplicating it
#[tokio::test]
async fn test_reconnect_updates_existing_connection() {
    let harness = Harness::new();
    let service = service(&harness, &MockClock::new()).await;

    let mut ids = Vec::new();
    for _ in 0..2 {
        let redirect = service
            .build_authorization_url(&AuthorizationRequest::new(
                Platform::LinkedIn,
                "u1",
                REDIRECT_URI,
            ))
            .await
            .unwrap();
        let connection = service
            .complete_authorization(
                Platform::LinkedIn,
                "code",
                &redirect.state,
                &redirect.encrypted_state,
            )
            .await
            .unwrap();
        ids.push(connection.id);
    }

    assert_eq!(ids[0], ids[1]);
    assert_eq!(harness.store.all().len(), 1);
}

/// Members of an organization connect on the organization's behalf
#[tokio::test]
async fn test_connection_owned_by_organization() {
    let harness = Harness::new();
    harness.directory.add("u1", "org-9");
    let service = service(&harness, &MockClock::new()).await;
    let redirect = service
        .build_authorization_url(&AuthorizationRequest::new(Platform::LinkedIn, "u1", REDIRECT_URI))
        .await
        .unwrap();

    let connection = service
        .complete_authorization(
            Platform::LinkedIn,
            "code",
            &redirect.state,
            &redirect.encrypted_state,
        )
        .await
        .unwrap();

    assert_eq!(connection.organization_id.as_deref(), Some("org-9"));
}
