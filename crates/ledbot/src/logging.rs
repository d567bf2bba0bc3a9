//! Logging setup.
//!
//! All crates log through `tracing` with explicit targets, so filtering by
//! subsystem works with plain `RUST_LOG` directives:
//!
//! ```text
//! RUST_LOG=ledbot=info,ledbot_net::websocket=trace ledbot
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Target names for log filtering.
pub mod targets {
    /// Application target.
    pub const APP: &str = "ledbot";
    /// Configuration loading.
    pub const CONFIG: &str = "ledbot::config";
    /// Session lifecycle and frame handling.
    pub const SESSION: &str = "ledbot::session";
    /// Envelope dispatch.
    pub const DISPATCH: &str = "ledbot::dispatch";
    /// LED output.
    pub const LED: &str = "ledbot::led";
    /// Web API calls.
    pub const WEB_API: &str = "ledbot::web_api";
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "ledbot=debug,ledbot_net=debug,warn"
    } else {
        "ledbot=info,ledbot_net=info,warn"
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `debug`.
pub fn init(debug: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();
}
