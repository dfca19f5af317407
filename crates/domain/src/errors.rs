//! Error types used throughout the integration layer

use std::time::Duration;

use postbridge_common::{CommonError, CryptoError, ErrorClassification, ErrorSeverity};
use thiserror::Error;

use crate::types::connection::ConnectionId;
use crate::types::platform::{Capability, Platform};

/// Why a returned authorization state was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateRejection {
    /// The sealed blob failed integrity verification or did not decode.
    Tampered,
    /// The returned state token differs from the sealed one.
    TokenMismatch,
    /// The callback names a different platform than the sealed state.
    PlatformMismatch,
    /// Older than the configured freshness bound.
    Expired,
    /// Dated further in the future than the allowed clock skew.
    NotYetValid,
    /// The state token has already been consumed.
    Replayed,
    /// Required fields are missing from the sealed state.
    Incomplete,
}

crate::impl_slug_conversions!(StateRejection {
    Tampered => "tampered",
    TokenMismatch => "token_mismatch",
    PlatformMismatch => "platform_mismatch",
    Expired => "expired",
    NotYetValid => "not_yet_valid",
    Replayed => "replayed",
    Incomplete => "incomplete",
});

/// Which payload limit was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadDimension {
    TextLength,
    MediaCount,
}

crate::impl_slug_conversions!(PayloadDimension {
    TextLength => "text_length",
    MediaCount => "media_count",
});

/// Closed set of failures surfaced by the integration layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrationError {
    /// Cryptographic verification failed.
    #[error("integrity verification failed")]
    Integrity,

    /// Possible CSRF, replay or stale attempt. Never retried.
    #[error("authorization state rejected: {reason}")]
    StateMismatch { reason: StateRejection },

    /// The provider rejected a code or token request.
    #[error("{platform} rejected the token request: {message}")]
    ProviderExchange { platform: Platform, message: String },

    /// The connection cannot be used until the user reconnects it.
    #[error("connection {connection_id} must be reauthorized")]
    ReauthorizationRequired { connection_id: ConnectionId },

    /// The platform does not declare a capability the request needs.
    #[error("{platform} does not support {capability}")]
    UnsupportedOperation { platform: Platform, capability: Capability },

    /// The payload exceeds a declared limit.
    #[error("payload {dimension} {actual} exceeds limit {limit}")]
    PayloadTooLarge { dimension: PayloadDimension, limit: usize, actual: usize },

    /// Timeout, 5xx or rate limiting from the provider.
    #[error("transient failure from {platform}: {message}")]
    TransientProvider { platform: Platform, message: String, retry_after: Option<Duration> },

    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for integration operations
pub type Result<T> = std::result::Result<T, IntegrationError>;

impl IntegrationError {
    /// Stable snake_case code for logs and API responses.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Integrity => "integrity",
            Self::StateMismatch { .. } => "state_mismatch",
            Self::ProviderExchange { .. } => "provider_exchange",
            Self::ReauthorizationRequired { .. } => "reauthorization_required",
            Self::UnsupportedOperation { .. } => "unsupported_operation",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::TransientProvider { .. } => "transient_provider",
            Self::NotFound { .. } => "not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Storage(_) => "storage",
            Self::Configuration(_) => "configuration",
            Self::Internal(_) => "internal",
        }
    }

    pub fn state(reason: StateRejection) -> Self {
        Self::StateMismatch { reason }
    }

    pub fn unsupported(platform: Platform, capability: Capability) -> Self {
        Self::UnsupportedOperation { platform, capability }
    }

    pub fn exchange(platform: Platform, message: impl Into<String>) -> Self {
        Self::ProviderExchange { platform, message: message.into() }
    }

    pub fn transient(platform: Platform, message: impl Into<String>) -> Self {
        Self::TransientProvider { platform, message: message.into(), retry_after: None }
    }

    pub fn connection_not_found(id: ConnectionId) -> Self {
        Self::NotFound { resource: "connection", id: id.to_string() }
    }
}

impl ErrorClassification for IntegrationError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientProvider { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Integrity | Self::Internal(_) => ErrorSeverity::Critical,
            Self::StateMismatch { .. }
            | Self::ProviderExchange { .. }
            | Self::Storage(_)
            | Self::Configuration(_) => ErrorSeverity::Error,
            Self::ReauthorizationRequired { .. } | Self::TransientProvider { .. } => {
                ErrorSeverity::Warning
            }
            Self::UnsupportedOperation { .. }
            | Self::PayloadTooLarge { .. }
            | Self::NotFound { .. }
            | Self::InvalidRequest(_) => ErrorSeverity::Info,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Integrity | Self::Internal(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::TransientProvider { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<CommonError> for IntegrationError {
    fn from(err: CommonError) -> Self {
        match err {
            CommonError::Config { .. } => Self::Configuration(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<CryptoError> for IntegrationError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Integrity => Self::Integrity,
            CryptoError::InvalidKey(message) => Self::Configuration(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        let transient = IntegrationError::TransientProvider {
            platform: Platform::Reddit,
            message: "503".into(),
            retry_after: Some(Duration::from_secs(2)),
        };
        assert!(transient.is_retryable());
        assert_eq!(transient.retry_after(), Some(Duration::from_secs(2)));

        for err in [
            IntegrationError::Integrity,
            IntegrationError::state(StateRejection::TokenMismatch),
            IntegrationError::exchange(Platform::LinkedIn, "invalid_grant"),
            IntegrationError::ReauthorizationRequired { connection_id: ConnectionId::new() },
            IntegrationError::unsupported(Platform::X, Capability::Schedule),
        ] {
            assert!(!err.is_retryable(), "{}", err.kind());
        }
    }

    #[test]
    fn integrity_is_critical() {
        assert!(IntegrationError::Integrity.is_critical());
        assert_eq!(IntegrationError::Integrity.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn crypto_errors_convert() {
        assert_eq!(IntegrationError::from(CryptoError::Integrity), IntegrationError::Integrity);
        assert!(matches!(
            IntegrationError::from(CryptoError::InvalidKey("short".into())),
            IntegrationError::Configuration(_)
        ));
    }

    #[test]
    fn messages_name_the_problem() {
        let err = IntegrationError::unsupported(Platform::LinkedIn, Capability::Schedule);
        assert_eq!(err.to_string(), "linkedin does not support schedule");

        let err = IntegrationError::PayloadTooLarge {
            dimension: PayloadDimension::TextLength,
            limit: 280,
            actual: 300,
        };
        assert_eq!(err.to_string(), "payload text_length 300 exceeds limit 280");
        assert_eq!(
            IntegrationError::state(StateRejection::Replayed).to_string(),
            "authorization state rejected: replayed"
        );
    }
}
