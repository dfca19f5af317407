//! Configuration structures
//!
//! Every section has defaults so an empty file (or no file at all) yields a
//! working configuration that talks to the real provider endpoints.
//! Per-platform overrides exist mainly for staging endpoints and tests.

use std::collections::BTreeMap;
use std::time::Duration;

use postbridge_common::CommonError;
use serde::{Deserialize, Serialize};

use crate::errors::{IntegrationError, Result};
use crate::types::platform::Platform;
use crate::types::provider::ProviderEndpoints;

/// Root configuration for the integration layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    pub http: HttpConfig,
    pub tokens: TokenConfig,
    pub oauth: OAuthConfig,
    pub platforms: BTreeMap<Platform, PlatformSettings>,
}

/// Outbound HTTP behaviour shared by every provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Total attempts including the first (2 = one retry).
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_attempts: 2,
            base_backoff_ms: 250,
            user_agent: concat!("postbridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }
}

/// Token lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Refresh this many seconds before the provider-reported expiry.
    pub refresh_buffer_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { refresh_buffer_secs: 300 }
    }
}

impl TokenConfig {
    pub fn refresh_buffer(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.refresh_buffer_secs).unwrap_or(i64::MAX))
    }
}

/// Authorization round-trip settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Oldest sealed state accepted on the callback.
    pub state_max_age_secs: u64,
    /// How far in the future a state's creation time may be.
    pub max_clock_skew_secs: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self { state_max_age_secs: 600, max_clock_skew_secs: 60 }
    }
}

impl OAuthConfig {
    pub fn state_max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.state_max_age_secs).unwrap_or(i64::MAX))
    }

    pub fn max_clock_skew(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.max_clock_skew_secs).unwrap_or(i64::MAX))
    }
}

/// Optional per-platform overrides of the built-in descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub request_token_url: Option<String>,
    pub refresh_url: Option<String>,
    pub api_base_url: Option<String>,
    pub upload_base_url: Option<String>,
    pub scopes: Option<Vec<String>>,
    /// Default instance for federated platforms.
    pub instance_url: Option<String>,
}

impl IntegrationConfig {
    /// Overrides for `platform`, or empty settings.
    pub fn settings(&self, platform: Platform) -> PlatformSettings {
        self.platforms.get(&platform).cloned().unwrap_or_default()
    }

    /// Resolve every endpoint for `platform`.
    ///
    /// Federated platforms resolve relative descriptor paths against
    /// `instance_url`, falling back to the configured default instance.
    pub fn endpoints(
        &self,
        platform: Platform,
        instance_url: Option<&str>,
    ) -> Result<ProviderEndpoints> {
        let descriptor = platform.provider();
        let settings = self.settings(platform);

        let instance = if platform.is_federated() {
            let instance = instance_url
                .map(str::to_string)
                .or_else(|| settings.instance_url.clone())
                .ok_or_else(|| {
                    IntegrationError::InvalidRequest(format!(
                        "{platform} requires an instance URL"
                    ))
                })?;
            Some(normalize_instance(&instance)?)
        } else {
            None
        };

        let resolve = |configured: Option<String>, built_in: &str| -> String {
            configured.unwrap_or_else(|| match &instance {
                Some(base) => format!("{base}{built_in}"),
                None => built_in.to_string(),
            })
        };

        Ok(ProviderEndpoints {
            descriptor,
            authorize_url: resolve(settings.authorize_url, descriptor.authorize_url),
            token_url: resolve(settings.token_url, descriptor.token_url),
            request_token_url: settings
                .request_token_url
                .or_else(|| descriptor.request_token_url.map(str::to_string)),
            refresh_url: settings
                .refresh_url
                .or_else(|| descriptor.refresh_url.map(str::to_string)),
            api_base_url: resolve(settings.api_base_url, descriptor.api_base_url),
            upload_base_url: settings
                .upload_base_url
                .or_else(|| descriptor.upload_base_url.map(str::to_string)),
            scopes: settings.scopes.unwrap_or_else(|| {
                descriptor.default_scopes.iter().map(|s| (*s).to_string()).collect()
            }),
        })
    }

    /// Reject settings that would make every call fail.
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(CommonError::config("http.timeout_secs", "must be > 0").into());
        }
        if self.http.max_attempts == 0 {
            return Err(CommonError::config("http.max_attempts", "must be >= 1").into());
        }
        if self.oauth.state_max_age_secs == 0 {
            return Err(CommonError::config("oauth.state_max_age_secs", "must be > 0").into());
        }
        Ok(())
    }
}

fn normalize_instance(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        Ok(trimmed.to_string())
    } else if trimmed.is_empty() || trimmed.contains('/') {
        Err(IntegrationError::InvalidRequest(format!("invalid instance URL '{raw}'")))
    } else {
        Ok(format!("https://{trimmed}"))
    }
}
