//! Connection configuration for one relay board

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{RelayError, Result};

/// Default serial device of the board's USB CDC interface
pub const DEFAULT_DEVICE: &str = "/dev/ttyACM0";

/// Default serial baud rate
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default read/write timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Default pause between writing a command and reading the reply
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

/// Relay board connection settings
///
/// `device` and `baud_rate` are the only values the board itself cares
/// about; the timing fields tune how long a single exchange may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Serial device path (e.g. "/dev/ttyACM0")
    pub device: String,

    /// Serial baud rate
    pub baud_rate: u32,

    /// Read/write timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Delay between write and read in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

impl RelayConfig {
    /// Configuration for a device with default timing
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Reject settings no serial port can be opened with
    pub fn validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            return Err(RelayError::Config("Device path must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(RelayError::Config("Baud rate must be positive".to_string()));
        }
        if self.timeout_ms == 0 {
            return Err(RelayError::Config("Timeout must be positive".to_string()));
        }
        Ok(())
    }

    /// Parse RelayConfig from TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RelayError::Config(e.to_string()))
    }

    /// Serialize RelayConfig to TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RelayError::Serialization(e.to_string()))
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }
}
