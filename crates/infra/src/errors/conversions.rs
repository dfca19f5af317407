//! Conversions from external infrastructure errors into domain errors.

use std::time::Duration;

use keyring::Error as KeyringError;
use postbridge_domain::{IntegrationError, Platform};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Error as HttpError, StatusCode};
use serde_json::Value;

/// Longest provider message carried into an error.
const MAX_PROVIDER_MESSAGE: usize = 200;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub IntegrationError);

impl From<InfraError> for IntegrationError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<IntegrationError> for InfraError {
    fn from(value: IntegrationError) -> Self {
        InfraError(value)
    }
}

impl InfraError {
    /// Classify a transport failure for `platform`.
    pub fn http(platform: Platform, err: HttpError) -> Self {
        InfraError(err.into_integration(platform))
    }
}

/// Conversions that need to know which provider was being called.
trait IntoIntegrationError {
    fn into_integration(self, platform: Platform) -> IntegrationError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → IntegrationError */
/* -------------------------------------------------------------------------- */

impl IntoIntegrationError for HttpError {
    fn into_integration(self, platform: Platform) -> IntegrationError {
        if self.is_timeout() {
            return IntegrationError::transient(platform, "HTTP request timed out");
        }

        if self.is_connect() {
            return IntegrationError::transient(platform, "HTTP connection failure");
        }

        if self.is_builder() {
            return IntegrationError::Internal(format!("invalid HTTP request: {self}"));
        }

        if self.is_decode() {
            return IntegrationError::exchange(platform, "unexpected response body");
        }

        if let Some(status) = self.status() {
            return status_error(platform, status, None, "");
        }

        IntegrationError::transient(platform, self.to_string())
    }
}

/// Map a non-success status and its body to a domain error.
///
/// 429, 408 and 5xx are transient; every other status is a provider refusal.
pub fn status_error(
    platform: Platform,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> IntegrationError {
    let detail = provider_message(body);
    let message = match &detail {
        Some(detail) => format!("HTTP {}: {detail}", status.as_u16()),
        None => format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status")
        ),
    };

    if status == StatusCode::TOO_MANY_REQUESTS {
        return IntegrationError::TransientProvider { platform, message, retry_after };
    }
    if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        return IntegrationError::TransientProvider { platform, message, retry_after: None };
    }
    IntegrationError::exchange(platform, message)
}

/// `Retry-After` as delta-seconds or an HTTP date.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = chrono::DateTime::parse_from_rfc2822(raw).ok()?;
    (at.with_timezone(&chrono::Utc) - chrono::Utc::now()).to_std().ok()
}

/// Best-effort human message from the error shapes providers use.
fn provider_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let message = match serde_json::from_str::<Value>(body) {
        Ok(json) => {
            let text = |v: &Value| v.as_str().map(str::to_string);
            // OAuth: {"error": "invalid_grant", "error_description": "..."}
            let oauth = json.get("error").and_then(text).map(|code| {
                match json.get("error_description").and_then(text) {
                    Some(description) => format!("{code}: {description}"),
                    None => code,
                }
            });
            oauth
                // Graph API: {"error": {"message": "..."}}
                .or_else(|| json.pointer("/error/message").and_then(text))
                .or_else(|| json.get("detail").and_then(text))
                .or_else(|| json.get("message").and_then(text))
                .or_else(|| json.pointer("/errors/0/message").and_then(text))
                .unwrap_or_else(|| body.to_string())
        }
        Err(_) => body.to_string(),
    };

    Some(message.chars().take(MAX_PROVIDER_MESSAGE).collect())
}

/* -------------------------------------------------------------------------- */
/* keyring::Error → IntegrationError */
/* -------------------------------------------------------------------------- */

impl From<KeyringError> for InfraError {
    fn from(value: KeyringError) -> Self {
        let description = value.to_string();

        InfraError(match value {
            KeyringError::NoEntry => {
                IntegrationError::Configuration("keychain entry not found".into())
            }
            KeyringError::BadEncoding(_) => {
                IntegrationError::Configuration("secret in keychain is not valid UTF-8".into())
            }
            KeyringError::PlatformFailure(err) => {
                IntegrationError::Storage(format!("keychain platform error: {err}"))
            }
            KeyringError::NoStorageAccess(err) => {
                IntegrationError::Storage(format!("unable to access secure storage: {err}"))
            }
            _ => IntegrationError::Storage(description),
        })
    }
}

/* -------------------------------------------------------------------------- */
/* serde / toml → IntegrationError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(IntegrationError::Internal(format!("JSON serialization failed: {value}")))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(IntegrationError::Configuration(format!("invalid TOML: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;
    use reqwest::Client;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn rate_limit_is_transient_with_retry_after() {
        let err = status_error(
            Platform::Reddit,
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(30)),
            "",
        );
        assert_eq!(
            err,
            IntegrationError::TransientProvider {
                platform: Platform::Reddit,
                message: "HTTP 429 Too Many Requests".into(),
                retry_after: Some(Duration::from_secs(30)),
            }
        );
    }

    #[test]
    fn invalid_grant_is_a_provider_refusal() {
        let body = r#"{"error":"invalid_grant","error_description":"Token has been revoked"}"#;
        let err = status_error(Platform::YouTube, StatusCode::BAD_REQUEST, None, body);
        match err {
            IntegrationError::ProviderExchange { platform, message } => {
                assert_eq!(platform, Platform::YouTube);
                assert_eq!(message, "HTTP 400: invalid_grant: Token has been revoked");
            }
            other => panic!("expected provider exchange, got {other:?}"),
        }
    }

    #[test]
    fn graph_api_errors_surface_their_message() {
        let body = r#"{"error":{"message":"Invalid OAuth access token.","code":190}}"#;
        let err = status_error(Platform::Facebook, StatusCode::UNAUTHORIZED, None, body);
        assert_eq!(
            err,
            IntegrationError::exchange(Platform::Facebook, "HTTP 401: Invalid OAuth access token.")
        );
    }

    #[test]
    fn server_errors_are_transient() {
        let err = status_error(Platform::X, StatusCode::BAD_GATEWAY, None, "<html>oops</html>");
        assert!(matches!(err, IntegrationError::TransientProvider { retry_after: None, .. }));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(1_000);
        let IntegrationError::ProviderExchange { message, .. } =
            status_error(Platform::X, StatusCode::FORBIDDEN, None, &body)
        else {
            panic!("expected provider exchange");
        };
        assert!(message.len() < 220);
    }

    #[test]
    fn retry_after_parses_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("120"));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(120)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn keyring_no_entry_maps_to_configuration() {
        let mapped: IntegrationError = InfraError::from(KeyringError::NoEntry).into();
        match mapped {
            IntegrationError::Configuration(msg) => assert!(msg.contains("keychain")),
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_status_error_maps_through_status_table() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::SERVICE_UNAVAILABLE))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: IntegrationError = InfraError::http(Platform::Mastodon, error).into();
        assert!(matches!(
            mapped,
            IntegrationError::TransientProvider { platform: Platform::Mastodon, .. }
        ));
    }
}
