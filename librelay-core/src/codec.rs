//! Byte-level protocol for the relay board
//!
//! Every command is a single byte. State commands get no reply; the board
//! answers `VERSION` with two bytes (major, minor) and `STATUS` with one
//! bitfield byte.
//!
//! | code    | byte | reply bytes |
//! |---------|------|-------------|
//! | ALL_ON  | 100  | 0 |
//! | ONE_ON  | 101  | 0 |
//! | TWO_ON  | 102  | 0 |
//! | ALL_OFF | 110  | 0 |
//! | ONE_OFF | 111  | 0 |
//! | TWO_OFF | 112  | 0 |
//! | VERSION | 90   | 2 |
//! | STATUS  | 91   | 1 |

use crate::{Command, CommandCode, FirmwareVersion, RelayError, RelayStatus, Response, Result};

impl CommandCode {
    /// Byte sent to the board for this code
    pub fn to_byte(&self) -> u8 {
        match self {
            CommandCode::AllOn => 100,
            CommandCode::OneOn => 101,
            CommandCode::TwoOn => 102,
            CommandCode::AllOff => 110,
            CommandCode::OneOff => 111,
            CommandCode::TwoOff => 112,
            CommandCode::Version => 90,
            CommandCode::Status => 91,
        }
    }

    /// Code for a device byte, if it is one
    pub fn from_byte(byte: u8) -> Option<Self> {
        CommandCode::ALL
            .into_iter()
            .find(|code| code.to_byte() == byte)
    }

    /// Number of bytes the board sends back after this code
    pub fn reply_len(&self) -> usize {
        match self {
            CommandCode::Version => 2,
            CommandCode::Status => 1,
            _ => 0,
        }
    }
}

/// Translate a command into the byte the board expects
pub fn encode(command: &Command) -> Result<u8> {
    command.validate()?;
    Ok(command.content.to_byte())
}

/// Translate the board's reply to `command` into a [`Response`]
pub fn decode(command: &Command, raw: &[u8]) -> Result<Response> {
    command.validate()?;

    let expected = command.content.reply_len();
    if raw.len() != expected {
        return Err(RelayError::MalformedResponse(format!(
            "{} expects {} reply byte(s), got {} ({:02X?})",
            command.content,
            expected,
            raw.len(),
            raw
        )));
    }

    match command.content {
        CommandCode::Version => Ok(Response::Version(FirmwareVersion {
            major: raw[0],
            minor: raw[1],
        })),
        CommandCode::Status => RelayStatus::from_byte(raw[0])
            .map(Response::Status)
            .ok_or_else(|| {
                RelayError::MalformedResponse(format!("Invalid status byte: 0x{:02X}", raw[0]))
            }),
        code => Ok(Response::Ack { code }),
    }
}
