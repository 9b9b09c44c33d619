//! CLI configuration resolution
//!
//! Builds the [`RelayConfig`] used to open the board from several sources.

use anyhow::{Context, Result};
use librelay_core::{default_config_path, RelayConfig};
use std::path::{Path, PathBuf};

/// Builder for the relay configuration with priority chain support
///
/// Priority chain (lowest to highest):
/// 1. Defaults
/// 2. Config file
/// 3. Environment variables
/// 4. CLI arguments
///
/// Setters are applied highest priority first; a value that is already set
/// is never overwritten by a lower-priority source.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    device: Option<String>,
    baud_rate: Option<u32>,
    timeout_ms: Option<u64>,
    settle_delay_ms: Option<u64>,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set serial device path
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Set baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    /// Set read/write timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Load configuration from file
    ///
    /// A missing file is not an error; a file that exists but can't be
    /// parsed is.
    pub fn with_config_file(self, path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(self);
        }

        let config = RelayConfig::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;

        // Only use file values if they weren't already set (preserving priority)
        Ok(Self {
            device: self.device.or(Some(config.device)),
            baud_rate: self.baud_rate.or(Some(config.baud_rate)),
            timeout_ms: self.timeout_ms.or(Some(config.timeout_ms)),
            settle_delay_ms: self.settle_delay_ms.or(Some(config.settle_delay_ms)),
        })
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if self.device.is_none() {
            if let Ok(device) = std::env::var("LIBRELAY_DEVICE") {
                if !device.trim().is_empty() {
                    self.device = Some(device);
                }
            }
        }

        if self.baud_rate.is_none() {
            if let Ok(baud_rate) = std::env::var("LIBRELAY_BAUD") {
                if let Ok(baud_rate) = baud_rate.parse() {
                    self.baud_rate = Some(baud_rate);
                }
            }
        }

        if self.timeout_ms.is_none() {
            if let Ok(timeout_ms) = std::env::var("LIBRELAY_TIMEOUT_MS") {
                if let Ok(timeout_ms) = timeout_ms.parse() {
                    self.timeout_ms = Some(timeout_ms);
                }
            }
        }

        self
    }

    /// Build the final configuration with validation
    pub fn build(self) -> Result<RelayConfig> {
        let defaults = RelayConfig::default();

        let config = RelayConfig {
            device: self.device.unwrap_or(defaults.device),
            baud_rate: self.baud_rate.unwrap_or(defaults.baud_rate),
            timeout_ms: self.timeout_ms.unwrap_or(defaults.timeout_ms),
            settle_delay_ms: self.settle_delay_ms.unwrap_or(defaults.settle_delay_ms),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Config file path: explicit flag > `LIBRELAY_CONFIG` > default location
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit
        .map(PathBuf::from)
        .or_else(|| std::env::var("LIBRELAY_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(default_config_path)
}
