//! Slack Web API calls used by the bot.

use ledbot_net::http::HttpClient;
use ledbot_net::{NetworkError, Result};
use serde::{Deserialize, Serialize};

use crate::dispatch::MessagePoster;
use crate::logging::targets;

/// Default Web API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

/// Method that opens a Socket Mode session and returns its WebSocket URL.
pub const CONNECTIONS_OPEN: &str = "apps.connections.open";
/// Method that posts a message to a channel.
pub const CHAT_POST_MESSAGE: &str = "chat.postMessage";

/// Common response envelope: `{"ok": bool, "error"?: string, ...}`.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

impl ApiResponse {
    fn into_result(self, method: &str) -> Result<Self> {
        if self.ok {
            return Ok(self);
        }
        let error = self.error.unwrap_or_else(|| "unknown_error".to_string());
        tracing::warn!(target: targets::WEB_API, method, %error, "call failed");
        Err(NetworkError::Api(error))
    }
}

#[derive(Debug, Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

/// Client for the two Web API methods the bot calls.
///
/// Cheap to clone; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct WebApi {
    http: HttpClient,
    base_url: String,
    app_token: String,
    bot_token: String,
}

impl WebApi {
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        app_token: impl Into<String>,
        bot_token: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            http,
            base_url,
            app_token: app_token.into(),
            bot_token: bot_token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// Ask for a fresh Socket Mode WebSocket URL.
    pub async fn open_connection(&self) -> Result<String> {
        let response: ApiResponse = self
            .http
            .post(&self.method_url(CONNECTIONS_OPEN), &self.app_token)
            .await?;

        response
            .into_result(CONNECTIONS_OPEN)?
            .url
            .ok_or_else(|| NetworkError::Api(format!("{CONNECTIONS_OPEN} returned no url")))
    }

    /// Post `text` to `channel` as the bot.
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        let body = PostMessage { channel, text };
        let response: ApiResponse = self
            .http
            .post_json(&self.method_url(CHAT_POST_MESSAGE), &self.bot_token, &body)
            .await?;

        response.into_result(CHAT_POST_MESSAGE)?;
        tracing::debug!(target: targets::WEB_API, channel, "message posted");
        Ok(())
    }
}

impl MessagePoster for WebApi {
    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        WebApi::post_message(self, channel, text).await
    }
}

impl std::fmt::Debug for WebApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebApi")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
