//! Configuration types for librelay
//!
//! A [`RelayConfig`] names the serial device and baud rate of one board plus
//! the exchange timing. It is stored as TOML, by default at
//! `~/.config/librelay/config.toml`.

mod paths;
mod relay_config;

pub use paths::default_config_path;
pub use relay_config::{
    RelayConfig, DEFAULT_BAUD_RATE, DEFAULT_DEVICE, DEFAULT_SETTLE_DELAY_MS, DEFAULT_TIMEOUT_MS,
};
