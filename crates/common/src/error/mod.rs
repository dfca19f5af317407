//! Common error types and classification shared by every Postbridge crate.
//!
//! Two pieces live here:
//!
//! 1. **`CommonError`**: configuration, serialization and invariant failures
//!    raised below the domain layer. The domain converts it into its own
//!    closed error type.
//! 2. **`ErrorClassification`**: a uniform way to ask an error whether it is
//!    retryable, how severe it is and how long to wait before retrying.
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Resource not found |
//! | **Warning** | Degraded but operational | Rate limiting, provider timeouts |
//! | **Error** | Failure requiring attention | Rejected token exchange, bad config |
//! | **Critical** | Integrity at risk | Tampered ciphertext, invariant violations |

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Failures shared by more than one layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// A configuration value is missing or out of range.
    #[error("configuration error in '{field}': {message}")]
    Config { field: String, message: String },

    /// A payload could not be encoded or decoded.
    #[error("{format} serialization error: {message}")]
    Serialization { format: &'static str, message: String },

    /// Something that should not happen did.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        false
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config { .. } | Self::Serialization { .. } => ErrorSeverity::Error,
            Self::Internal(_) => ErrorSeverity::Critical,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal(_))
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl CommonError {
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config { field: field.into(), message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable snake_case name of the variant, for an `error_type` log field.
    pub const fn error_type_name(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Serialization { .. } => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

/// Trait for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient issues that may succeed if attempted
    /// again, such as provider timeouts or HTTP 5xx responses.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    ///
    /// Critical errors typically indicate tampered data or broken internal
    /// invariants.
    fn is_critical(&self) -> bool;

    /// Suggested retry delay, usually taken from a `Retry-After` header.
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization { format: "JSON", message: err.to_string() }
    }
}

impl From<toml::de::Error> for CommonError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization { format: "TOML", message: err.to_string() }
    }
}
