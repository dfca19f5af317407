//! Configuration loading
//!
//! Reads [`postbridge_domain::IntegrationConfig`] from files and
//! environment variables.

pub mod loader;

pub use loader::{discover_config_path, load, load_from_env, load_from_file, ConfigError};
