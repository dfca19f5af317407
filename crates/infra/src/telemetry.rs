//! Tracing subscriber setup for binaries and integration harnesses

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "POSTBRIDGE_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber. `json` switches to structured JSON lines.
///
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing(json: bool) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter()).with_target(true);
    let installed =
        if json { builder.json().try_init().is_ok() } else { builder.try_init().is_ok() };
    if installed {
        tracing::debug!(json, "Tracing initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_a_no_op() {
        init_tracing(false);
        assert!(!init_tracing(true));
    }
}
