//! librelay core library
//!
//! Command model, byte codec, decoded responses, and configuration for a
//! two-contact relay board driven over a serial line. This crate does no
//! I/O besides reading and writing its configuration file; the serial side
//! lives in `librelay-hardware`.

pub mod codec;
pub mod command;
pub mod config;
pub mod error;
pub mod response;

// Re-export commonly used types
pub use codec::{decode, encode};
pub use command::{ActionKind, Command, CommandCode};
pub use config::{default_config_path, RelayConfig};
pub use error::*;
pub use response::{FirmwareVersion, RelayStatus, Response};
