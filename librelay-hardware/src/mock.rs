//! Simulated relay board
//!
//! `MockTransport` answers like real hardware: state bytes switch its
//! relays, `VERSION` and `STATUS` queue the matching reply. Faults can be
//! scripted for the next write or read. Clones share one board, so a test
//! can keep a handle while the transport itself is owned by a dispatcher.

use crate::serial_driver::RelayTransport;
use async_trait::async_trait;
use librelay_core::{CommandCode, FirmwareVersion, RelayError, RelayStatus, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

#[derive(Debug)]
struct BoardState {
    relays: RelayStatus,
    firmware: FirmwareVersion,
    written: Vec<u8>,
    reads: usize,
    pending: VecDeque<u8>,
    fail_writes: usize,
    timeout_reads: usize,
    garbage: VecDeque<Vec<u8>>,
    read_delay: Duration,
    closed: bool,
}

/// In-memory stand-in for the serial relay board
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<BoardState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Board with both relays off reporting firmware 1.0
    pub fn new() -> Self {
        Self::with_firmware(FirmwareVersion { major: 1, minor: 0 })
    }

    pub fn with_firmware(firmware: FirmwareVersion) -> Self {
        Self {
            state: Arc::new(Mutex::new(BoardState {
                relays: RelayStatus::default(),
                firmware,
                written: Vec::new(),
                reads: 0,
                pending: VecDeque::new(),
                fail_writes: 0,
                timeout_reads: 0,
                garbage: VecDeque::new(),
                read_delay: Duration::ZERO,
                closed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next write fail with an I/O error
    pub fn fail_next_write(&self) {
        self.lock().fail_writes += 1;
    }

    /// Make the next read time out even if a reply is pending
    pub fn time_out_next_read(&self) {
        self.lock().timeout_reads += 1;
    }

    /// Answer the next read with `bytes` instead of the real reply
    pub fn reply_next_with(&self, bytes: Vec<u8>) {
        self.lock().garbage.push_back(bytes);
    }

    /// Delay every read, simulating a slow board
    pub fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = delay;
    }

    /// Every byte written so far, in order
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Number of reads attempted so far
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    pub fn relays(&self) -> RelayStatus {
        self.lock().relays
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

#[async_trait]
impl RelayTransport for MockTransport {
    async fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut state = self.lock();
        if state.closed {
            return Err(RelayError::Serial("Port is closed".to_string()));
        }
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            return Err(RelayError::Serial("Write failed: broken pipe".to_string()));
        }

        for &byte in bytes {
            state.written.push(byte);
            match CommandCode::from_byte(byte) {
                Some(CommandCode::Version) => {
                    let FirmwareVersion { major, minor } = state.firmware;
                    state.pending.extend([major, minor]);
                }
                Some(CommandCode::Status) => {
                    let status = state.relays.to_byte();
                    state.pending.push_back(status);
                }
                Some(code) => state.relays = state.relays.apply(code),
                None => debug!("Mock board ignoring unknown byte {:02X}", byte),
            }
        }
        Ok(bytes.len())
    }

    async fn read(&mut self, max_bytes: usize, timeout: Duration) -> Result<Vec<u8>> {
        let delay = {
            let mut state = self.lock();
            state.reads += 1;
            state.read_delay
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay.min(timeout)).await;
            if delay > timeout {
                return Err(RelayError::Timeout("Read operation timed out".to_string()));
            }
        }

        let mut state = self.lock();
        if state.timeout_reads > 0 {
            state.timeout_reads -= 1;
            state.pending.clear();
            return Err(RelayError::Timeout("Read operation timed out".to_string()));
        }
        if let Some(bytes) = state.garbage.pop_front() {
            state.pending.clear();
            return Ok(bytes);
        }
        if state.pending.is_empty() {
            return Err(RelayError::Timeout("Read operation timed out".to_string()));
        }

        let take = max_bytes.min(state.pending.len());
        Ok(state.pending.drain(..take).collect())
    }

    fn clear_input_buffer(&mut self) -> Result<()> {
        self.lock().pending.clear();
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.lock().closed = true;
        Ok(())
    }

    fn port_path(&self) -> Option<&str> {
        None
    }
}
