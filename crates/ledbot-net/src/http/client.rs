//! Bearer-authenticated JSON POSTs over reqwest.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{NetworkError, Result};
use crate::tls::TlsConfig;

/// Content type sent with JSON request bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn default_user_agent() -> String {
    format!("ledbot/{}", env!("CARGO_PKG_VERSION"))
}

/// Builder for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientBuilder {
    timeout: Option<Duration>,
    connect_timeout: Duration,
    user_agent: String,
    tls: TlsConfig,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: default_user_agent(),
            tls: TlsConfig::default(),
        }
    }
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole-request deadline, 30 seconds unless changed. `None` waits forever.
    pub fn timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.timeout = timeout.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Trust roots and protocol floor, shared with the WebSocket side.
    pub fn tls_config(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(self.user_agent.as_str());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = self.tls.apply_to(builder).build()?;

        Ok(HttpClient {
            client,
            timeout: self.timeout,
            user_agent: self.user_agent,
        })
    }
}

/// A JSON-over-HTTP client with bearer-token authentication.
///
/// Clones share one connection pool.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Option<Duration>,
    user_agent: String,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// POST without a body and decode the JSON response.
    pub async fn post<T>(&self, url: &str, bearer_token: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.send(self.authorized(url, bearer_token), url).await
    }

    /// POST `body` as JSON and decode the JSON response.
    pub async fn post_json<B, T>(&self, url: &str, bearer_token: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .authorized(url, bearer_token)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(serde_json::to_vec(body)?);
        self.send(request, url).await
    }

    fn authorized(&self, url: &str, bearer_token: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {bearer_token}"))
    }

    /// Non-2xx statuses become [`NetworkError::Api`]; bodies are decoded with serde_json.
    async fn send<T>(&self, request: reqwest::RequestBuilder, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(target: "ledbot_net::http", %url, "POST");

        let response = request.send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            tracing::warn!(target: "ledbot_net::http", %url, status, "non-success status");
            return Err(NetworkError::Api(format!("HTTP {status}")));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::TlsVersion;

    #[test]
    fn test_builder_defaults() {
        let builder = HttpClientBuilder::new();
        assert_eq!(builder.timeout, Some(DEFAULT_TIMEOUT));
        assert_eq!(builder.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(builder.user_agent.starts_with("ledbot/"));
        assert!(builder.tls.is_default());
    }

    #[test]
    fn test_built_client_keeps_settings() {
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .user_agent("probe/1.0")
            .tls_config(TlsConfig::new().with_min_version(TlsVersion::Tls1_3))
            .build()
            .unwrap();

        assert_eq!(client.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(client.user_agent(), "probe/1.0");
    }

    #[test]
    fn test_timeout_can_be_disabled() {
        let client = HttpClient::builder().timeout(None).build().unwrap();
        assert_eq!(client.timeout(), None);
    }
}
