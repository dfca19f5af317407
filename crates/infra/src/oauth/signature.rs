//! OAuth 1.0a request signing (HMAC-SHA1, RFC 5849 §3.4)

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use postbridge_domain::{IntegrationError, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha1::Sha1;
use url::Url;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const NONCE_LEN: usize = 32;

/// RFC 3986 percent-encoding: everything except `A-Z a-z 0-9 - . _ ~`.
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Signs requests on behalf of a consumer and, once obtained, a token.
#[derive(Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: String,
    token: Option<String>,
    token_secret: Option<String>,
    include_version: bool,
}

impl std::fmt::Debug for OAuth1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Signer")
            .field("consumer_key", &self.consumer_key)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl OAuth1Signer {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token: None,
            token_secret: None,
            include_version: true,
        }
    }

    /// Sign as `token`, keyed with its secret.
    pub fn with_token(mut self, token: impl Into<String>, token_secret: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self.token_secret = Some(token_secret.into());
        self
    }

    /// Omit the optional `oauth_version` parameter.
    pub fn without_version(mut self) -> Self {
        self.include_version = false;
        self
    }

    /// `Authorization` header value with a fresh nonce and the current time.
    ///
    /// `oauth_extra` carries protocol parameters such as `oauth_callback` or
    /// `oauth_verifier`; `form` is the urlencoded body, which is part of the
    /// signature.
    pub fn authorization(
        &self,
        method: &str,
        url: &str,
        oauth_extra: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<String> {
        let nonce: String =
            rand::thread_rng().sample_iter(&Alphanumeric).take(NONCE_LEN).map(char::from).collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();
        self.authorization_with(method, url, oauth_extra, form, &nonce, &timestamp)
    }

    /// Deterministic variant of [`Self::authorization`].
    pub fn authorization_with(
        &self,
        method: &str,
        url: &str,
        oauth_extra: &[(&str, &str)],
        form: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String> {
        let mut oauth: Vec<(&str, &str)> = vec![
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", SIGNATURE_METHOD),
            ("oauth_timestamp", timestamp),
        ];
        if let Some(token) = self.token.as_deref() {
            oauth.push(("oauth_token", token));
        }
        if self.include_version {
            oauth.push(("oauth_version", "1.0"));
        }
        oauth.extend_from_slice(oauth_extra);

        let mut signed: Vec<(&str, &str)> = oauth.clone();
        signed.extend_from_slice(form);
        let base = signature_base_string(method, url, &signed)?;
        let signature = self.sign(&base)?;

        oauth.push(("oauth_signature", signature.as_str()));
        oauth.sort_unstable();

        let fields: Vec<String> = oauth
            .iter()
            .map(|(key, value)| format!("{}=\"{}\"", percent_encode(key), percent_encode(value)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }

    /// Base64 HMAC-SHA1 of `base_string` keyed with
    /// `consumer_secret&token_secret`.
    pub fn sign(&self, base_string: &str) -> Result<String> {
        let key = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(self.token_secret.as_deref().unwrap_or_default())
        );
        let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
            .map_err(|_| IntegrationError::Internal("invalid OAuth signing key".into()))?;
        mac.update(base_string.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }
}

/// Signature base string: `METHOD&enc(base URL)&enc(normalized params)`.
///
/// Query parameters of `url` are merged with `params`; everything is
/// encoded, then sorted by name and value.
pub fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|err| IntegrationError::Internal(format!("invalid OAuth URL '{url}': {err}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| IntegrationError::Internal(format!("OAuth URL '{url}' has no host")))?;
    let base_url = match parsed.port() {
        Some(port) => format!("{}://{host}:{port}{}", parsed.scheme(), parsed.path()),
        None => format!("{}://{host}{}", parsed.scheme(), parsed.path()),
    };

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(key, value)| (percent_encode(&key), percent_encode(&value)))
        .collect();
    pairs.extend(params.iter().map(|(key, value)| (percent_encode(key), percent_encode(value))));
    pairs.sort_unstable();

    let normalized =
        pairs.iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join("&");

    Ok(format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&base_url),
        percent_encode(&normalized)
    ))
}
