//! Bot configuration.
//!
//! Settings come from a TOML file; tokens given on the command line or in
//! the environment override the file.
//!
//! ```toml
//! app_token = "xapp-..."
//! bot_token = "xoxb-..."
//! api_base_url = "https://slack.com/api"
//! debug_reconnects = true
//! mask_frames = true
//!
//! [led]
//! kind = "sysfs"
//! path = "/sys/class/gpio/gpio25/value"
//! active_low = false
//!
//! [tls]
//! ca_file = "/etc/ledbot/ca.pem"
//! min_version = "1.2"
//!
//! [startup_message]
//! channel = "C0123456789"
//! text = "Hello Slack!"
//! ```

use std::path::{Path, PathBuf};

use ledbot_net::tls::{CaBundle, TlsConfig, TlsVersion};
use serde::Deserialize;

use crate::led::LedConfig;
use crate::web_api::DEFAULT_API_BASE_URL;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(#[from] toml::de::Error),
    #[error("missing {0}; set it in the config file, on the command line, or in the environment")]
    MissingToken(&'static str),
    #[error("led.path is required when led.kind = \"sysfs\"")]
    MissingLedPath,
    #[error("failed to open LED at {}: {source}", path.display())]
    Led {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to load CA file {}: {source}", path.display())]
    CaFile {
        path: PathBuf,
        source: ledbot_net::NetworkError,
    },
}

/// Contents of the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// App-level token (`xapp-`) for opening Socket Mode connections.
    #[serde(default)]
    pub app_token: Option<String>,
    /// Bot token (`xoxb-`) for posting messages.
    #[serde(default)]
    pub bot_token: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Append `debug_reconnects=true` to every session URL.
    #[serde(default = "default_true")]
    pub debug_reconnects: bool,
    #[serde(default = "default_true")]
    pub mask_frames: bool,
    #[serde(default)]
    pub led: LedConfig,
    #[serde(default)]
    pub tls: TlsSettings,
    #[serde(default)]
    pub startup_message: Option<StartupMessage>,
}

/// `[tls]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TlsSettings {
    /// Extra PEM-encoded CA certificates to trust.
    #[serde(default)]
    pub ca_file: Option<PathBuf>,
    #[serde(default)]
    pub min_version: TlsVersion,
}

/// `[startup_message]` section: posted once when the bot starts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartupMessage {
    pub channel: String,
    #[serde(default = "default_greeting")]
    pub text: String,
}

/// Validated tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub app_token: String,
    pub bot_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_token", &"<redacted>")
            .field("bot_token", &"<redacted>")
            .finish()
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_greeting() -> String {
    "Hello Slack!".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            app_token: None,
            bot_token: None,
            api_base_url: default_api_base_url(),
            debug_reconnects: true,
            mask_frames: true,
            led: LedConfig::default(),
            tls: TlsSettings::default(),
            startup_message: None,
        }
    }
}

impl BotConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Replace tokens with those given explicitly, where present.
    pub fn with_token_overrides(
        mut self,
        app_token: Option<String>,
        bot_token: Option<String>,
    ) -> Self {
        if app_token.is_some() {
            self.app_token = app_token;
        }
        if bot_token.is_some() {
            self.bot_token = bot_token;
        }
        self
    }

    /// Both tokens, or the name of the first one missing.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let app_token =
            non_empty(&self.app_token).ok_or(ConfigError::MissingToken("app_token"))?;
        let bot_token =
            non_empty(&self.bot_token).ok_or(ConfigError::MissingToken("bot_token"))?;
        Ok(Credentials {
            app_token,
            bot_token,
        })
    }

    /// Build the TLS configuration shared by HTTP and WebSocket connections.
    pub fn tls_config(&self) -> Result<TlsConfig, ConfigError> {
        let mut tls = TlsConfig::new().with_min_version(self.tls.min_version);
        if let Some(path) = &self.tls.ca_file {
            let bundle = CaBundle::load(path).map_err(|source| ConfigError::CaFile {
                path: path.clone(),
                source,
            })?;
            tls = tls.with_ca_bundle(bundle);
        }
        Ok(tls)
    }
}

fn non_empty(token: &Option<String>) -> Option<String> {
    token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
