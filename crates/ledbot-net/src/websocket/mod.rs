//! Minimal WebSocket client over a raw TCP or TLS socket.
//!
//! Only what a Socket Mode receiver needs is implemented: the HTTP/1.1
//! upgrade, single unfragmented frames with 7-bit or 16-bit lengths, and a
//! [`recv`](WebSocketConnection::recv) that never waits for a frame header
//! to arrive.
//!
//! # Example
//!
//! ```ignore
//! use ledbot_net::websocket::{Opcode, WebSocketConfig, WebSocketConnection};
//!
//! let mut conn = WebSocketConnection::connect("wss://example.com/link", &WebSocketConfig::new()).await?;
//!
//! loop {
//!     match conn.recv().await? {
//!         Some(frame) if frame.opcode == Opcode::Ping => {
//!             conn.send(Opcode::Pong, &frame.payload).await?;
//!         }
//!         Some(frame) => println!("{:?}", frame),
//!         None if conn.is_open() => tokio::task::yield_now().await,
//!         None => break,
//!     }
//! }
//! ```

mod connection;
mod endpoint;
mod frame;
mod handshake;
mod state;
mod stream;

pub use connection::{WebSocketConfig, WebSocketConnection};
pub use endpoint::WsUrl;
pub use frame::{
    FIN_BIT, Frame, FrameHeader, MASK_BIT, MAX_PAYLOAD_LEN, Opcode, PayloadLength, apply_mask,
    encode_frame,
};
pub use handshake::{SWITCHING_PROTOCOLS, build_request, generate_key, handshake};
pub use state::ConnectionState;
pub use stream::{MaybeTlsStream, open_stream};
