//! JSON-over-HTTP client.
//!
//! A thin wrapper over `reqwest` for token-authenticated JSON APIs:
//!
//! ```ignore
//! use ledbot_net::http::HttpClient;
//!
//! let client = HttpClient::builder()
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let reply: serde_json::Value = client
//!     .post_json("https://api.example.com/chat.postMessage", "xoxb-token", &body)
//!     .await?;
//! ```

mod client;

pub use client::{HttpClient, HttpClientBuilder, JSON_CONTENT_TYPE};
