//! Decoded replies from the relay board

use crate::{CommandCode, ErrorKind, RelayError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Firmware version reported by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Contact state of both relays
///
/// On the wire this is one byte: bit 0 is relay one, bit 1 is relay two,
/// the remaining bits are always clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStatus {
    pub relay_one: bool,
    pub relay_two: bool,
}

impl RelayStatus {
    pub const RELAY_ONE: u8 = 0b01;
    pub const RELAY_TWO: u8 = 0b10;

    /// Decode a status byte; `None` if any unknown bit is set
    pub fn from_byte(byte: u8) -> Option<Self> {
        if byte & !(Self::RELAY_ONE | Self::RELAY_TWO) != 0 {
            return None;
        }
        Some(Self {
            relay_one: byte & Self::RELAY_ONE != 0,
            relay_two: byte & Self::RELAY_TWO != 0,
        })
    }

    pub fn to_byte(&self) -> u8 {
        let mut byte = 0;
        if self.relay_one {
            byte |= Self::RELAY_ONE;
        }
        if self.relay_two {
            byte |= Self::RELAY_TWO;
        }
        byte
    }

    /// State after the board applies `code`; query codes leave it unchanged
    pub fn apply(self, code: CommandCode) -> Self {
        match code {
            CommandCode::AllOn => Self {
                relay_one: true,
                relay_two: true,
            },
            CommandCode::AllOff => Self {
                relay_one: false,
                relay_two: false,
            },
            CommandCode::OneOn => Self {
                relay_one: true,
                ..self
            },
            CommandCode::OneOff => Self {
                relay_one: false,
                ..self
            },
            CommandCode::TwoOn => Self {
                relay_two: true,
                ..self
            },
            CommandCode::TwoOff => Self {
                relay_two: false,
                ..self
            },
            CommandCode::Version | CommandCode::Status => self,
        }
    }
}

impl fmt::Display for RelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = |on: bool| if on { "on" } else { "off" };
        write!(
            f,
            "relay 1: {}, relay 2: {}",
            label(self.relay_one),
            label(self.relay_two)
        )
    }
}

/// Result of executing one command
///
/// Responses carry no request id; they correlate with commands by order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// State command written to the board
    Ack { code: CommandCode },
    /// Reply to a version query
    Version(FirmwareVersion),
    /// Reply to a status query
    Status(RelayStatus),
    /// The command failed; the worker carried on
    Error { kind: ErrorKind, message: String },
}

impl Response {
    /// Tag an error for delivery on the output queue
    pub fn from_error(err: &RelayError) -> Self {
        Response::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Response::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<RelayError> for Response {
    fn from(err: RelayError) -> Self {
        Response::from_error(&err)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ack { code } => write!(f, "{} ok", code),
            Response::Version(version) => write!(f, "version {}", version),
            Response::Status(status) => write!(f, "{}", status),
            Response::Error { kind, message } => write!(f, "error ({}): {}", kind, message),
        }
    }
}
