//! LED output.
//!
//! [`LogLed`] stands in on hosts without GPIO. [`SysfsLed`] drives a pin
//! through the kernel's sysfs GPIO `value` file, which must already be
//! exported and configured as an output.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::ConfigError;
use crate::logging::targets;

/// Logical LED state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedState {
    #[default]
    Off,
    On,
}

impl LedState {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::On => write!(f, "on"),
        }
    }
}

/// A hardware output that can be switched on and off.
pub trait LedOutput {
    fn set(&mut self, state: LedState) -> io::Result<()>;
}

/// An LED that only logs and remembers its state.
#[derive(Debug, Default)]
pub struct LogLed {
    state: LedState,
}

impl LogLed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LedState {
        self.state
    }
}

impl LedOutput for LogLed {
    fn set(&mut self, state: LedState) -> io::Result<()> {
        tracing::info!(target: targets::LED, %state, "LED switched");
        self.state = state;
        Ok(())
    }
}

/// An LED on a sysfs GPIO `value` file.
#[derive(Debug)]
pub struct SysfsLed {
    path: PathBuf,
    active_low: bool,
}

impl SysfsLed {
    /// Open the `value` file at `path`. Fails if it does not exist.
    pub fn open(path: impl Into<PathBuf>, active_low: bool) -> io::Result<Self> {
        let path = path.into();
        std::fs::metadata(&path)?;
        Ok(Self { path, active_low })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn level(&self, state: LedState) -> &'static [u8] {
        // Active-low wiring lights the LED when the pin is driven low.
        if state.is_on() != self.active_low {
            b"1"
        } else {
            b"0"
        }
    }
}

impl LedOutput for SysfsLed {
    fn set(&mut self, state: LedState) -> io::Result<()> {
        std::fs::write(&self.path, self.level(state))?;
        tracing::info!(
            target: targets::LED,
            %state,
            path = %self.path.display(),
            "LED switched"
        );
        Ok(())
    }
}

/// Which LED backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedKind {
    #[default]
    Log,
    Sysfs,
}

/// `[led]` section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedConfig {
    #[serde(default)]
    pub kind: LedKind,
    /// GPIO `value` file, required for `sysfs`.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub active_low: bool,
}

/// The LED selected by configuration.
#[derive(Debug)]
pub enum Led {
    Log(LogLed),
    Sysfs(SysfsLed),
}

impl Led {
    pub fn from_config(config: &LedConfig) -> Result<Self, ConfigError> {
        match config.kind {
            LedKind::Log => Ok(Self::Log(LogLed::new())),
            LedKind::Sysfs => {
                let path = config.path.clone().ok_or(ConfigError::MissingLedPath)?;
                SysfsLed::open(&path, config.active_low)
                    .map(Self::Sysfs)
                    .map_err(|source| ConfigError::Led { path, source })
            }
        }
    }
}

impl LedOutput for Led {
    fn set(&mut self, state: LedState) -> io::Result<()> {
        match self {
            Self::Log(led) => led.set(state),
            Self::Sysfs(led) => led.set(state),
        }
    }
}
