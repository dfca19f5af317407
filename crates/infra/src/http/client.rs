use std::time::Duration;

use postbridge_domain::{HttpConfig, IntegrationError, Platform, Result};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::{retry_after, status_error, InfraError};

/// HTTP client with built-in retry and timeout support.
///
/// Every call names the platform it talks to so failures can be classified
/// as provider refusals or transient errors.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client configured from the `http` config section.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        Self::builder()
            .timeout(config.timeout())
            .max_attempts(usize::try_from(config.max_attempts).unwrap_or(usize::MAX))
            .base_backoff(config.base_backoff())
            .user_agent(config.user_agent.clone())
            .build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder with retry semantics.
    ///
    /// Timeouts, connection failures and 5xx responses are retried with
    /// exponential backoff. The last response is returned whatever its status.
    pub async fn send(&self, platform: Platform, builder: RequestBuilder) -> Result<Response> {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                IntegrationError::Internal(
                    "request body cannot be cloned; use send_once for streaming bodies".into(),
                )
            })?;

            let request = cloned_builder
                .build()
                .map_err(|err| IntegrationError::from(InfraError::http(platform, err)))?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(
                platform = %platform,
                attempt = attempt + 1,
                %method,
                url = %url.path(),
                "sending HTTP request"
            );

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(
                        platform = %platform,
                        attempt = attempt + 1,
                        %method,
                        %status,
                        "received HTTP response"
                    );

                    if status.is_server_error() && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(err) => {
                    debug!(
                        platform = %platform,
                        attempt = attempt + 1,
                        %method,
                        error = %err,
                        "HTTP request failed"
                    );

                    if attempt + 1 < attempts && should_retry_error(&err) {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Err(InfraError::http(platform, err).into());
                }
            }
        }

        Err(IntegrationError::Internal(
            "http client exhausted retries without producing a result".into(),
        ))
    }

    /// Execute once without retry, for bodies that cannot be replayed.
    pub async fn send_once(&self, platform: Platform, builder: RequestBuilder) -> Result<Response> {
        builder.send().await.map_err(|err| InfraError::http(platform, err).into())
    }

    /// Send and require a 2xx status.
    pub async fn execute(&self, platform: Platform, builder: RequestBuilder) -> Result<Response> {
        let response = self.send(platform, builder).await?;
        ensure_success(platform, response).await
    }

    /// Send, require a 2xx status and decode the JSON body.
    pub async fn json<T>(&self, platform: Platform, builder: RequestBuilder) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(platform, builder).await?;
        decode_json(platform, response).await
    }

    /// Send, require a 2xx status and decode a form-encoded body.
    pub async fn form(
        &self,
        platform: Platform,
        builder: RequestBuilder,
    ) -> Result<Vec<(String, String)>> {
        let response = self.execute(platform, builder).await?;
        let body = response.text().await.map_err(|err| InfraError::http(platform, err))?;
        Ok(url::form_urlencoded::parse(body.as_bytes()).into_owned().collect())
    }

    /// Download a media file; returns the bytes and the reported content type.
    pub async fn download(
        &self,
        platform: Platform,
        url: &str,
    ) -> Result<(Vec<u8>, Option<String>)> {
        let response = self.execute(platform, self.request(Method::GET, url)).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|err| InfraError::http(platform, err))?;
        Ok((bytes.to_vec(), content_type))
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Turn a non-2xx response into the matching domain error.
pub async fn ensure_success(platform: Platform, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    Err(status_error(platform, status, retry_after, &body))
}

/// Decode a JSON body; a malformed body is a provider fault.
pub async fn decode_json<T>(platform: Platform, response: Response) -> Result<T>
where
    T: DeserializeOwned,
{
    let body = response.bytes().await.map_err(|err| InfraError::http(platform, err))?;
    serde_json::from_slice(&body).map_err(|err| {
        IntegrationError::exchange(platform, format!("unexpected response body: {err}"))
    })
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 2,
            base_backoff: Duration::from_millis(250),
            user_agent: None,
        }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| {
            IntegrationError::Configuration(format!("failed to build HTTP client: {err}"))
        })?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
