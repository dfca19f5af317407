//! # Postbridge Domain
//!
//! Domain types for the platform integration layer.
//!
//! This crate contains:
//! - The platform catalog (capabilities and OAuth handshake descriptors)
//! - Connection, credential and authorization-state models
//! - Post, analytics and profile request/response types
//! - The integration error taxonomy and configuration structures
//!
//! ## Architecture
//! - Depends only on `postbridge-common` among internal crates
//! - No I/O; every type here is plain data

pub mod config;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
