//! Helpers shared by the platform adapters

use std::future::Future;
use std::time::Duration;

use postbridge_core::DispatchTarget;
use postbridge_domain::{IntegrationError, Platform, PostDraft, Result};
use reqwest::RequestBuilder;
use serde_json::Value;
use tracing::debug;

/// Attach the credential as a bearer token.
pub(crate) fn bearer(builder: RequestBuilder, target: &DispatchTarget) -> RequestBuilder {
    builder.bearer_auth(&target.credential.access_token)
}

/// Account id the request acts for; required for account-scoped endpoints.
pub(crate) fn require_account(target: &DispatchTarget) -> Result<&str> {
    target.account_id.as_deref().ok_or_else(|| {
        IntegrationError::InvalidRequest(format!(
            "{} request needs a resolved account id",
            target.platform
        ))
    })
}

/// Account id, or the provider's "current user" alias during identity
/// resolution.
pub(crate) fn account_or_me(target: &DispatchTarget) -> &str {
    target.account_id.as_deref().unwrap_or("me")
}

/// String at `pointer`, accepting numeric ids.
pub(crate) fn id_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Like [`id_at`], but a missing value is a malformed provider response.
pub(crate) fn required_id(platform: Platform, value: &Value, pointer: &str) -> Result<String> {
    id_at(value, pointer).ok_or_else(|| {
        let field = pointer.trim_start_matches('/');
        IntegrationError::exchange(platform, format!("response missing {field}"))
    })
}

/// Counter at `pointer`; numbers or numeric strings. Absent stays `None`.
pub(crate) fn count_at(value: &Value, pointer: &str) -> Option<u64> {
    match value.pointer(pointer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub(crate) fn text_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Base URL without a trailing slash.
pub(crate) fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}

/// Title for platforms that require one: the draft title, else the first
/// line of the text cut to `max` characters.
pub(crate) fn title_for(draft: &PostDraft, max: usize) -> String {
    let source = draft
        .title
        .as_deref()
        .unwrap_or_else(|| draft.text.lines().next().unwrap_or_default());
    source.chars().take(max).collect()
}

/// Poll settings for providers that process media asynchronously.
#[derive(Debug, Clone, Copy)]
pub struct ContainerPolling {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for ContainerPolling {
    fn default() -> Self {
        Self { interval: Duration::from_secs(3), max_attempts: 20 }
    }
}

impl ContainerPolling {
    /// Poll `status` until it reports `finished`, or fail once attempts run
    /// out. `status` returns the provider's status code string.
    pub(crate) async fn wait<F, Fut>(&self, platform: Platform, mut status: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<String>>>,
    {
        for attempt in 1..=self.max_attempts {
            match status().await?.as_deref() {
                Some("FINISHED") | Some("PUBLISHED") => return Ok(()),
                Some("ERROR") | Some("EXPIRED") => {
                    return Err(IntegrationError::exchange(platform, "media processing failed"));
                }
                other => {
                    debug!(
                        platform = %platform,
                        attempt,
                        status = ?other,
                        "Media container not ready"
                    );
                }
            }
            tokio::time::sleep(self.interval).await;
        }
        Err(IntegrationError::transient(platform, "media processing did not finish in time"))
    }
}
