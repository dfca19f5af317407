//! Integration tests for the platform catalog
//!
//! Exercises capability tables, handshake descriptors and endpoint resolution
//! together, the way the flow builder and negotiator consume them.

use postbridge_domain::{
    AuthProtocol, Capability, IntegrationConfig, MediaCategory, Platform, PlatformRequest,
    PostDraft, RefreshStyle,
};

// ============================================================================
// Capability table
// ============================================================================

/// Scheduling is only declared where the provider has a native scheduler
#[test]
fn test_schedule_support_matrix() {
    let schedulable: Vec<Platform> =
        Platform::ALL.into_iter().filter(|p| p.capabilities().can_schedule).collect();
    assert_eq!(schedulable, vec![Platform::Facebook, Platform::YouTube, Platform::Mastodon]);
}

/// Video-only platforms refuse still images
#[test]
fn test_video_only_platforms() {
    for platform in [Platform::TikTok, Platform::YouTube] {
        let caps = platform.capabilities();
        assert!(caps.requires_media, "{platform}");
        assert!(caps.accepts_media(MediaCategory::Video), "{platform}");
        assert!(!caps.accepts_media(MediaCategory::Image), "{platform}");
    }
}

/// X text limit is 280 characters with up to four attachments
#[test]
fn test_x_limits() {
    let caps = Platform::X.capabilities();
    assert_eq!(caps.max_text_length, 280);
    assert_eq!(caps.max_media_attachments, 4);
    assert!(caps.supports_threading);
    assert!(!caps.can_upload_video);
}

// ============================================================================
// Handshake descriptors
// ============================================================================

/// Every platform resolves endpoints from the default config, given an
/// instance for federated ones
#[test]
fn test_every_platform_resolves_endpoints() {
    let config = IntegrationConfig::default();
    for platform in Platform::ALL {
        let instance = platform.is_federated().then_some("https://mastodon.example");
        let endpoints = config.endpoints(platform, instance).unwrap();
        assert_eq!(endpoints.platform(), platform);
        assert!(endpoints.authorize_url.starts_with("https://"), "{platform}");
        assert!(endpoints.token_url.starts_with("https://"), "{platform}");
    }
}

/// Only OAuth 2 providers may have a refresh style other than unsupported
#[test]
fn test_oauth1_tokens_never_refresh() {
    let descriptor = Platform::X.provider();
    assert_eq!(descriptor.protocol, AuthProtocol::OAuth1a);
    assert_eq!(descriptor.refresh, RefreshStyle::Unsupported);
}

// ============================================================================
// Requests
// ============================================================================

/// Requests serialize with an operation tag for queue payloads
#[test]
fn test_request_serialization_is_tagged() {
    let request = PlatformRequest::CreatePost { draft: PostDraft::text("hello") };
    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["operation"], "create_post");
    assert_eq!(json["draft"]["text"], "hello");

    let back: PlatformRequest = serde_json::from_value(json).unwrap();
    assert_eq!(back.operation().capability(), Capability::Post);
}
