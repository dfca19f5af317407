//! Configuration loader
//!
//! Loads [`IntegrationConfig`] from a file and environment variables.
//!
//! ## Loading Strategy
//! 1. `POSTBRIDGE_CONFIG` names the file explicitly; otherwise standard
//!    locations are searched
//! 2. With no file, built-in defaults are used
//! 3. `POSTBRIDGE_*` environment variables override individual values
//! 4. The result is validated
//!
//! ## Environment Variables
//! - `POSTBRIDGE_HTTP_TIMEOUT_SECS`: Per-request timeout
//! - `POSTBRIDGE_HTTP_MAX_ATTEMPTS`: Attempts per request including the first
//! - `POSTBRIDGE_HTTP_BASE_BACKOFF_MS`: Backoff before the first retry
//! - `POSTBRIDGE_HTTP_USER_AGENT`: User agent sent to providers
//! - `POSTBRIDGE_REFRESH_BUFFER_SECS`: Refresh this long before expiry
//! - `POSTBRIDGE_STATE_MAX_AGE_SECS`: Oldest accepted authorization state
//! - `POSTBRIDGE_MAX_CLOCK_SKEW_SECS`: Tolerated future skew of a state
//! - `POSTBRIDGE_MASTODON_INSTANCE_URL`: Default Mastodon instance
//!
//! ## File Locations
//! The loader searches the following paths (in order):
//! 1. `./postbridge.toml` or `./postbridge.json` (current working directory)
//! 2. `./config/postbridge.toml` or `./config/postbridge.json`
//! 3. Relative to executable location

use std::path::{Path, PathBuf};
use std::str::FromStr;

use postbridge_domain::{IntegrationConfig, IntegrationError, Platform, Result};
use thiserror::Error;

const CONFIG_PATH_VAR: &str = "POSTBRIDGE_CONFIG";
const FILE_STEM: &str = "postbridge";

/// Configuration loading failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid {format} in {path}: {message}")]
    Parse { format: &'static str, path: PathBuf, message: String },

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl From<ConfigError> for IntegrationError {
    fn from(err: ConfigError) -> Self {
        IntegrationError::Configuration(err.to_string())
    }
}

/// Load configuration from the first file found plus environment overrides
///
/// # Errors
/// Returns `IntegrationError::Configuration` if a file is named but missing,
/// cannot be parsed, an override is malformed or the result is invalid.
pub fn load() -> Result<IntegrationConfig> {
    let explicit = std::env::var(CONFIG_PATH_VAR).ok().map(PathBuf::from);
    let base = match explicit.or_else(discover_config_path) {
        Some(path) => read_file(&path)?,
        None => {
            tracing::debug!("No config file found, using defaults");
            IntegrationConfig::default()
        }
    };

    let config = apply_overrides(base, env_lookup)?;
    config.validate()?;
    tracing::info!(
        timeout_secs = config.http.timeout_secs,
        max_attempts = config.http.max_attempts,
        refresh_buffer_secs = config.tokens.refresh_buffer_secs,
        "Integration configuration loaded"
    );
    Ok(config)
}

/// Defaults with environment overrides applied
///
/// # Errors
/// Returns `IntegrationError::Configuration` if an override is malformed or
/// the result is invalid.
pub fn load_from_env() -> Result<IntegrationConfig> {
    let config = apply_overrides(IntegrationConfig::default(), env_lookup)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, searches the standard locations. Format is detected by
/// extension (`.toml` or `.json`). Environment overrides are not applied.
///
/// # Errors
/// Returns `IntegrationError::Configuration` if no file is found, the format
/// is unsupported or parsing fails.
pub fn load_from_file(path: Option<PathBuf>) -> Result<IntegrationConfig> {
    let config_path = match path {
        Some(p) => p,
        None => discover_config_path().ok_or_else(|| {
            IntegrationError::Configuration(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    let config = read_file(&config_path)?;
    config.validate()?;
    Ok(config)
}

/// Search the standard locations for a configuration file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn discover_config_path() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join("config"));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.into_iter()
        .flat_map(|dir| ["toml", "json"].map(|ext| dir.join(format!("{FILE_STEM}.{ext}"))))
        .find(|path| path.exists())
}

fn read_file(path: &Path) -> std::result::Result<IntegrationConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    tracing::info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;

    parse_config(&contents, path)
}

/// Parse configuration; format is detected by file extension.
fn parse_config(
    contents: &str,
    path: &Path,
) -> std::result::Result<IntegrationConfig, ConfigError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| ConfigError::Parse {
            format: "TOML",
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        "json" => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
            format: "JSON",
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Apply `POSTBRIDGE_*` overrides read through `lookup`.
pub(crate) fn apply_overrides<F>(
    mut config: IntegrationConfig,
    lookup: F,
) -> std::result::Result<IntegrationConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = parse_var(&lookup, "POSTBRIDGE_HTTP_TIMEOUT_SECS")? {
        config.http.timeout_secs = v;
    }
    if let Some(v) = parse_var(&lookup, "POSTBRIDGE_HTTP_MAX_ATTEMPTS")? {
        config.http.max_attempts = v;
    }
    if let Some(v) = parse_var(&lookup, "POSTBRIDGE_HTTP_BASE_BACKOFF_MS")? {
        config.http.base_backoff_ms = v;
    }
    if let Some(agent) = lookup("POSTBRIDGE_HTTP_USER_AGENT") {
        config.http.user_agent = agent;
    }
    if let Some(v) = parse_var(&lookup, "POSTBRIDGE_REFRESH_BUFFER_SECS")? {
        config.tokens.refresh_buffer_secs = v;
    }
    if let Some(v) = parse_var(&lookup, "POSTBRIDGE_STATE_MAX_AGE_SECS")? {
        config.oauth.state_max_age_secs = v;
    }
    if let Some(v) = parse_var(&lookup, "POSTBRIDGE_MAX_CLOCK_SKEW_SECS")? {
        config.oauth.max_clock_skew_secs = v;
    }
    if let Some(instance) = lookup("POSTBRIDGE_MASTODON_INSTANCE_URL") {
        config.platforms.entry(Platform::Mastodon).or_default().instance_url = Some(instance);
    }
    Ok(config)
}

fn parse_var<T, F>(lookup: &F, key: &str) -> std::result::Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::{Builder, NamedTempFile};

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    fn temp_config(extension: &str, contents: &str) -> NamedTempFile {
        let mut file = Builder::new().suffix(&format!(".{extension}")).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let config = apply_overrides(
            IntegrationConfig::default(),
            lookup_from(&[
                ("POSTBRIDGE_HTTP_TIMEOUT_SECS", "10"),
                ("POSTBRIDGE_HTTP_MAX_ATTEMPTS", "3"),
                ("POSTBRIDGE_REFRESH_BUFFER_SECS", "120"),
                ("POSTBRIDGE_STATE_MAX_AGE_SECS", "300"),
                ("POSTBRIDGE_MASTODON_INSTANCE_URL", "mastodon.social"),
            ]),
        )
        .unwrap();

        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.http.max_attempts, 3);
        assert_eq!(config.http.base_backoff_ms, 250);
        assert_eq!(config.tokens.refresh_buffer_secs, 120);
        assert_eq!(config.oauth.state_max_age_secs, 300);
        assert_eq!(
            config.settings(Platform::Mastodon).instance_url.as_deref(),
            Some("mastodon.social")
        );
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = apply_overrides(
            IntegrationConfig::default(),
            lookup_from(&[("POSTBRIDGE_HTTP_TIMEOUT_SECS", "soon")]),
        )
        .unwrap_err();

        assert!(err.to_string().contains("POSTBRIDGE_HTTP_TIMEOUT_SECS"));
    }

    #[test]
    fn test_load_from_env_rejects_invalid_result() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("POSTBRIDGE_HTTP_MAX_ATTEMPTS", "0");
        let result = load_from_env();
        std::env::remove_var("POSTBRIDGE_HTTP_MAX_ATTEMPTS");

        assert!(matches!(result, Err(IntegrationError::Configuration(_))));
    }

    #[test]
    fn test_load_from_env_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        let config = load_from_env().unwrap();
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file_toml() {
        let file = temp_config(
            "toml",
            r#"
[http]
timeout_secs = 15

[tokens]
refresh_buffer_secs = 600

[platforms.linkedin]
api_base_url = "http://127.0.0.1:9000"
scopes = ["openid", "w_member_social"]

[platforms.mastodon]
instance_url = "https://fosstodon.org"
"#,
        );

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.http.timeout_secs, 15);
        assert_eq!(config.http.max_attempts, 2);
        assert_eq!(config.tokens.refresh_buffer_secs, 600);

        let linkedin = config.endpoints(Platform::LinkedIn, None).unwrap();
        assert_eq!(linkedin.api_base_url, "http://127.0.0.1:9000");
        assert_eq!(linkedin.scopes, vec!["openid", "w_member_social"]);

        let mastodon = config.endpoints(Platform::Mastodon, None).unwrap();
        assert_eq!(mastodon.token_url, "https://fosstodon.org/oauth/token");
    }

    #[test]
    fn test_load_from_file_json() {
        let file = temp_config("json", r#"{ "oauth": { "state_max_age_secs": 900 } }"#);

        let config = load_from_file(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.oauth.state_max_age_secs, 900);
        assert_eq!(config.oauth.max_clock_skew_secs, 60);
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/postbridge.toml")));
        assert!(matches!(result, Err(IntegrationError::Configuration(_))));
    }

    #[test]
    fn test_load_from_file_invalid_json() {
        let file = temp_config("json", r#"{ "this is": "not valid json" "#);
        let result = load_from_file(Some(file.path().to_path_buf()));
        assert!(matches!(result, Err(IntegrationError::Configuration(_))));
    }

    #[test]
    fn test_unknown_platform_key_is_rejected() {
        let result = parse_config("[platforms.myspace]\n", Path::new("postbridge.toml"));
        assert!(matches!(result, Err(ConfigError::Parse { format: "TOML", .. })));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("some content", Path::new("postbridge.yaml"));
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "yaml"));
    }
}
