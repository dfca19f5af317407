//! Infrastructure error conversions

pub mod conversions;

pub use conversions::{retry_after, status_error, InfraError};
