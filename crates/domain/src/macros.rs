//! Macro for implementing Display and FromStr for slug-named enums
//!
//! Unit-variant enums that appear in logs, config or storage columns share a
//! single snake_case spelling for both directions.
//!
//! # Example
//!
//! ```rust
//! use postbridge_domain::impl_slug_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum SyncStatus {
//!     Pending,
//!     Done,
//! }
//!
//! impl_slug_conversions!(SyncStatus {
//!     Pending => "pending",
//!     Done => "done",
//! });
//!
//! assert_eq!("DONE".parse::<SyncStatus>().unwrap(), SyncStatus::Done);
//! ```

/// Implements Display and FromStr traits for slug-named enums
///
/// - Display writes the slug
/// - FromStr parses it case-insensitively and fails with
///   `IntegrationError::InvalidRequest`
#[macro_export]
macro_rules! impl_slug_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::errors::IntegrationError;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err($crate::errors::IntegrationError::InvalidRequest(format!(
                        "invalid {}: {}",
                        stringify!($enum_name),
                        s
                    ))),
                }
            }
        }
    };
}
