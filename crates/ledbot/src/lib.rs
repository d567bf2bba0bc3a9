//! ledbot: switch an LED from chat mentions.
//!
//! The bot opens a Socket Mode session, polls it for event envelopes, and
//! hands each one to the dispatcher:
//!
//! ```ignore
//! use ledbot::dispatch::EventDispatcher;
//! use ledbot::led::LogLed;
//! use ledbot::session::SocketModeSession;
//!
//! let mut session = SocketModeSession::new(api.clone(), WebSocketConfig::new());
//! let mut dispatcher = EventDispatcher::new(LogLed::new(), api);
//!
//! loop {
//!     match session.poll().await? {
//!         Some(envelope) => {
//!             dispatcher.dispatch(&envelope, &mut session).await?;
//!         }
//!         None => tokio::task::yield_now().await,
//!     }
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod led;
pub mod logging;
pub mod session;
pub mod web_api;

pub use config::{BotConfig, ConfigError, Credentials};
pub use dispatch::{DispatchOutcome, EventDispatcher, LedCommand};
pub use envelope::{Acknowledgement, Envelope};
pub use led::{Led, LedOutput, LedState};
pub use session::SocketModeSession;
pub use web_api::WebApi;
