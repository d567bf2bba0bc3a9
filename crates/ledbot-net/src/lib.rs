//! Networking for ledbot.
//!
//! This crate provides the network plumbing behind the bot:
//!
//! - **WebSocket**: a single-socket client speaking the subset of the protocol
//!   a Socket Mode receiver needs, over plain TCP or TLS
//! - **HTTP**: a small JSON-over-HTTP client with bearer-token auth
//! - **TLS**: shared trust-root and protocol-version configuration
//!
//! # WebSocket
//!
//! ```ignore
//! use ledbot_net::websocket::{Opcode, WebSocketConfig, WebSocketConnection};
//!
//! let mut conn = WebSocketConnection::connect(&url, &WebSocketConfig::new()).await?;
//!
//! // Returns immediately with `None` when no frame header has arrived.
//! if let Some(frame) = conn.recv().await? {
//!     if frame.opcode == Opcode::Ping {
//!         conn.send(Opcode::Pong, &frame.payload).await?;
//!     }
//! }
//! ```
//!
//! # HTTP
//!
//! ```ignore
//! use ledbot_net::http::HttpClient;
//!
//! let client = HttpClient::builder().build()?;
//! let opened: serde_json::Value = client
//!     .post("https://slack.com/api/apps.connections.open", &app_token)
//!     .await?;
//! ```
//!
//! # TLS
//!
//! Call [`tls::install_crypto_provider`] once at startup, before any TLS
//! connection is made.

mod error;
pub mod http;
pub mod tls;
pub mod websocket;

pub use error::{NetworkError, Result};

// Re-export commonly used types at the crate root
pub use http::{HttpClient, HttpClientBuilder};
pub use tls::{CaBundle, TlsConfig, TlsVersion};
pub use websocket::{ConnectionState, Frame, Opcode, WebSocketConfig, WebSocketConnection};
