//! Serial driver for low-level hardware communication
//!
//! Provides async serial I/O with the relay board.

use async_trait::async_trait;
use librelay_core::{RelayConfig, RelayError, Result};
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info, warn};

/// Trait for serial transport abstraction
///
/// The direct facade and the dispatcher only talk to the board through this
/// trait, so both can run against [`crate::MockTransport`] without hardware.
#[async_trait]
pub trait RelayTransport: Send {
    /// Write all bytes, returning how many were written
    async fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Read up to `max_bytes`, waiting at most `timeout`
    ///
    /// Returns fewer bytes than asked for if the device stops sending before
    /// the deadline, and `RelayError::Timeout` if nothing arrives at all.
    async fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Vec<u8>>;

    /// Discard stale bytes waiting in the input buffer
    fn clear_input_buffer(&mut self) -> Result<()>;

    /// Flush and release the port
    async fn close(&mut self) -> Result<()>;

    /// Get the port path, if the transport has one
    fn port_path(&self) -> Option<&str>;
}

/// Serial driver for hardware communication
pub struct SerialDriver {
    port: SerialStream,
    port_path: String,
    timeout_duration: Duration,
}

impl SerialDriver {
    /// Open the serial port described by `config`
    ///
    /// The line is configured 8N1 without flow control, as the board expects.
    pub fn open(config: &RelayConfig) -> Result<Self> {
        debug!(
            "Opening serial port: {} at {} baud",
            config.device, config.baud_rate
        );

        let port = tokio_serial::new(&config.device, config.baud_rate)
            .timeout(config.timeout())
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                error!("Failed to open serial port {}: {}", config.device, e);
                RelayError::Connection {
                    path: config.device.clone(),
                    reason: e.to_string(),
                }
            })?;

        info!("Serial port {} opened", config.device);

        Ok(Self {
            port,
            port_path: config.device.clone(),
            timeout_duration: config.timeout(),
        })
    }
}

#[async_trait]
impl RelayTransport for SerialDriver {
    async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        use tokio::io::AsyncWriteExt;

        debug!("TX: {:02X?}", bytes);

        timeout(self.timeout_duration, self.port.write_all(bytes))
            .await
            .map_err(|_| {
                error!("Write timeout");
                RelayError::Timeout("Write operation timed out".to_string())
            })?
            .map_err(|e| {
                error!("Write failed: {}", e);
                RelayError::Serial(format!("Write failed: {}", e))
            })?;

        // Flush to ensure data is sent
        timeout(self.timeout_duration, self.port.flush())
            .await
            .map_err(|_| RelayError::Timeout("Flush operation timed out".to_string()))?
            .map_err(|e| RelayError::Serial(format!("Flush failed: {}", e)))?;

        Ok(bytes.len())
    }

    async fn read(&mut self, max_bytes: usize, read_timeout: Duration) -> Result<Vec<u8>> {
        use tokio::io::AsyncReadExt;

        let mut buf = vec![0u8; max_bytes];
        let mut filled = 0;
        let deadline = Instant::now() + read_timeout;

        while filled < max_bytes {
            match timeout_at(deadline, self.port.read(&mut buf[filled..])).await {
                Ok(Ok(0)) => {
                    // EOF indicates device disconnection (USB unplugged, power loss, etc.)
                    warn!("Serial port returned EOF - device may have been disconnected");
                    return Err(RelayError::Serial(
                        "Serial port returned EOF - device may have been unplugged".to_string(),
                    ));
                }
                Ok(Ok(n)) => filled += n,
                Ok(Err(e)) => {
                    error!("Read error: {}", e);
                    return Err(RelayError::Serial(format!("Read error: {}", e)));
                }
                Err(_) => break,
            }
        }

        if filled == 0 && max_bytes > 0 {
            error!("Read timeout");
            return Err(RelayError::Timeout("Read operation timed out".to_string()));
        }

        buf.truncate(filled);
        debug!("RX: {:02X?}", buf);
        Ok(buf)
    }

    fn clear_input_buffer(&mut self) -> Result<()> {
        self.port
            .clear(tokio_serial::ClearBuffer::Input)
            .map_err(|e| {
                warn!("Failed to clear input buffer: {}", e);
                RelayError::Serial(format!("Failed to clear buffer: {}", e))
            })
    }

    async fn close(&mut self) -> Result<()> {
        use tokio::io::AsyncWriteExt;

        self.port
            .flush()
            .await
            .map_err(|e| RelayError::Serial(format!("Flush failed: {}", e)))?;
        // The file descriptor itself is released when the stream is dropped
        info!("Serial port {} closed", self.port_path);
        Ok(())
    }

    fn port_path(&self) -> Option<&str> {
        Some(&self.port_path)
    }
}

/// A serial port found on the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path usable as `RelayConfig::device`
    pub name: String,
    /// USB vendor and product id, for USB serial adapters
    pub usb_id: Option<(u16, u16)>,
    /// USB product string, when the device reports one
    pub product: Option<String>,
}

/// Enumerate serial ports the board could be attached to
pub fn list_serial_ports() -> Result<Vec<PortInfo>> {
    let ports = tokio_serial::available_ports().map_err(|e| {
        error!("Failed to enumerate serial ports: {}", e);
        RelayError::Serial(format!("Failed to enumerate ports: {}", e))
    })?;

    let ports = ports
        .into_iter()
        .map(|port| {
            debug!("Found port: {}", port.port_name);
            match port.port_type {
                tokio_serial::SerialPortType::UsbPort(info) => PortInfo {
                    name: port.port_name,
                    usb_id: Some((info.vid, info.pid)),
                    product: info.product,
                },
                _ => PortInfo {
                    name: port.port_name,
                    usb_id: None,
                    product: None,
                },
            }
        })
        .collect();

    Ok(ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_serial_ports() {
        // Depends on the host; just check that enumeration doesn't panic
        let _ = list_serial_ports();
    }

    #[tokio::test]
    async fn test_open_missing_device_is_connection_error() {
        let config = RelayConfig::new("/dev/librelay-does-not-exist", 115200);
        match SerialDriver::open(&config) {
            Err(RelayError::Connection { path, .. }) => {
                assert_eq!(path, "/dev/librelay-does-not-exist");
            }
            Err(e) => panic!("Expected Connection error, got {}", e),
            Ok(_) => panic!("Opening a missing device should fail"),
        }
    }
}
