//! One command/reply round trip with the board

use crate::serial_driver::RelayTransport;
use librelay_core::{codec, Command, RelayConfig, Response, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Timing of a single exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeTiming {
    /// Upper bound for reading the reply
    pub read_timeout: Duration,
    /// Pause after the write before the board is read
    pub settle_delay: Duration,
}

impl Default for ExchangeTiming {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for ExchangeTiming {
    fn from(config: &RelayConfig) -> Self {
        Self {
            read_timeout: config.timeout(),
            settle_delay: config.settle_delay(),
        }
    }
}

/// Encode, write, wait, read, decode
///
/// Invalid commands fail before anything is written. State commands have no
/// reply, so no read is attempted for them.
pub async fn exchange<T: RelayTransport + ?Sized>(
    transport: &mut T,
    command: &Command,
    timing: &ExchangeTiming,
) -> Result<Response> {
    let byte = codec::encode(command)?;

    transport.clear_input_buffer()?;
    transport.write(&[byte]).await?;

    if !timing.settle_delay.is_zero() {
        sleep(timing.settle_delay).await;
    }

    let expected = command.content.reply_len();
    let reply = if expected == 0 {
        Vec::new()
    } else {
        transport.read(expected, timing.read_timeout).await?
    };

    debug!("Exchange {} -> {:02X?}", command, reply);
    codec::decode(command, &reply)
}
