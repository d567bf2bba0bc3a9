//! Socket Mode session: one lazily (re)opened WebSocket connection.

use ledbot_net::websocket::{ConnectionState, Opcode, WebSocketConfig, WebSocketConnection};
use ledbot_net::{NetworkError, Result};
use url::Url;

use crate::dispatch::Acknowledge;
use crate::envelope::{Acknowledgement, Envelope};
use crate::logging::targets;
use crate::web_api::WebApi;

/// Query flag that asks the server to reconnect clients more often.
pub const DEBUG_RECONNECTS: (&str, &str) = ("debug_reconnects", "true");

/// Owns the single live connection and turns its frames into envelopes.
///
/// The connection is opened on the first [`poll`](Self::poll) and replaced
/// whenever a poll finds it closed. There is no backoff between attempts.
pub struct SocketModeSession {
    api: WebApi,
    ws_config: WebSocketConfig,
    debug_reconnects: bool,
    connection: Option<WebSocketConnection>,
}

impl SocketModeSession {
    pub fn new(api: WebApi, ws_config: WebSocketConfig) -> Self {
        Self {
            api,
            ws_config,
            debug_reconnects: true,
            connection: None,
        }
    }

    /// Whether to append `debug_reconnects=true` to session URLs (default on).
    pub fn debug_reconnects(mut self, enabled: bool) -> Self {
        self.debug_reconnects = enabled;
        self
    }

    /// State of the current connection, `Disconnected` if none was opened.
    pub fn state(&self) -> ConnectionState {
        self.connection
            .as_ref()
            .map_or(ConnectionState::Disconnected, WebSocketConnection::state)
    }

    /// Poll for the next envelope without waiting for one to arrive.
    ///
    /// Reconnects first if needed. Pings are answered here and never
    /// returned; a Close frame closes the connection so the next poll
    /// reconnects. Returns `Ok(None)` when there is nothing to hand out.
    pub async fn poll(&mut self) -> Result<Option<Envelope>> {
        if !self
            .connection
            .as_ref()
            .is_some_and(WebSocketConnection::is_open)
        {
            self.reconnect().await?;
        }

        let Some(conn) = self.connection.as_mut() else {
            return Ok(None);
        };

        let Some(frame) = conn.recv().await? else {
            return Ok(None);
        };

        match frame.opcode {
            Opcode::Ping => {
                conn.send(Opcode::Pong, &frame.payload).await?;
                tracing::trace!(
                    target: targets::SESSION,
                    len = frame.payload.len(),
                    "answered ping"
                );
                Ok(None)
            }
            Opcode::Close => {
                tracing::info!(
                    target: targets::SESSION,
                    code = close_code(&frame.payload),
                    "server closed the connection"
                );
                conn.mark_closed("close frame received");
                Ok(None)
            }
            Opcode::Text | Opcode::Binary => {
                let envelope: Envelope = serde_json::from_slice(&frame.payload)?;
                tracing::debug!(
                    target: targets::SESSION,
                    kind = %envelope.kind,
                    envelope_id = envelope.envelope_id.as_deref().unwrap_or("-"),
                    "envelope received"
                );
                Ok(Some(envelope))
            }
            other => {
                tracing::trace!(target: targets::SESSION, opcode = ?other, "ignoring frame");
                Ok(None)
            }
        }
    }

    /// Send an acknowledgement as one text frame on the live connection.
    pub async fn acknowledge(&mut self, ack: &Acknowledgement) -> Result<()> {
        let conn = self
            .connection
            .as_mut()
            .filter(|conn| conn.is_open())
            .ok_or_else(|| {
                NetworkError::Connection("no open connection to acknowledge on".to_string())
            })?;

        let text = serde_json::to_string(ack)?;
        conn.send_text(&text).await
    }

    async fn reconnect(&mut self) -> Result<()> {
        // Release the old socket before opening the next one.
        if let Some(old) = self.connection.take() {
            tracing::info!(target: targets::SESSION, state = %old.state(), "reconnecting");
            old.close().await;
        }

        let url = self.api.open_connection().await?;
        let url = session_url(&url, self.debug_reconnects)?;

        let conn = WebSocketConnection::connect(&url, &self.ws_config).await?;
        tracing::info!(target: targets::SESSION, tls = conn.is_tls(), "session connected");
        self.connection = Some(conn);
        Ok(())
    }
}

impl Acknowledge for SocketModeSession {
    async fn acknowledge(&mut self, ack: &Acknowledgement) -> Result<()> {
        SocketModeSession::acknowledge(self, ack).await
    }
}

impl std::fmt::Debug for SocketModeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketModeSession")
            .field("state", &self.state())
            .field("debug_reconnects", &self.debug_reconnects)
            .finish_non_exhaustive()
    }
}

/// Append the reconnect-diagnostics flag to a session URL when enabled.
pub fn session_url(url: &str, debug_reconnects: bool) -> Result<String> {
    let mut url = Url::parse(url)?;
    if debug_reconnects {
        let (key, value) = DEBUG_RECONNECTS;
        url.query_pairs_mut().append_pair(key, value);
    }
    Ok(url.into())
}

/// Status code from a Close frame payload, if present.
fn close_code(payload: &[u8]) -> Option<u16> {
    match payload {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}
