//! Relay Board - direct-call interface
//!
//! Every method performs exactly one exchange with the board on the calling
//! task. There is no queue and no retry; for decoupled operation hand the
//! connection to a [`Dispatcher`] with [`RelayBoard::into_dispatcher`].

use crate::dispatcher::Dispatcher;
use crate::exchange::{exchange, ExchangeTiming};
use crate::serial_driver::{RelayTransport, SerialDriver};
use librelay_core::{
    Command, CommandCode, FirmwareVersion, RelayConfig, RelayError, RelayStatus, Response, Result,
};
use tracing::{debug, error, info};

type Opener<T> = Box<dyn Fn(&RelayConfig) -> Result<T> + Send + Sync>;

/// Direct interface to one relay board
///
/// Generic over the transport type, allowing real hardware (`SerialDriver`)
/// or mock transports for testing.
pub struct RelayBoard<T: RelayTransport = SerialDriver> {
    config: RelayConfig,
    timing: ExchangeTiming,
    opener: Opener<T>,
    transport: Option<T>,
}

impl RelayBoard<SerialDriver> {
    /// Board on `device`; nothing is opened until [`RelayBoard::setup`]
    pub fn new(device: &str, baud_rate: u32) -> Self {
        Self::from_config(RelayConfig::new(device, baud_rate))
    }

    pub fn from_config(config: RelayConfig) -> Self {
        Self::with_opener(config, SerialDriver::open)
    }
}

impl<T: RelayTransport> RelayBoard<T> {
    /// Board whose transport is produced by `opener` during setup
    ///
    /// This is primarily useful for testing with mock transports.
    pub fn with_opener<F>(config: RelayConfig, opener: F) -> Self
    where
        F: Fn(&RelayConfig) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            timing: ExchangeTiming::from(&config),
            config,
            opener: Box::new(opener),
            transport: None,
        }
    }

    /// Override the exchange timing taken from the configuration
    pub fn with_timing(mut self, timing: ExchangeTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Open the serial port
    ///
    /// Returns `true` on success. Failures are logged; until a setup succeeds
    /// every other call fails with `NotConnected`.
    pub fn setup(&mut self) -> bool {
        if self.transport.is_some() {
            debug!("Relay board {} already set up", self.config.device);
            return true;
        }

        let opened = self
            .config
            .validate()
            .and_then(|()| (self.opener)(&self.config));

        match opened {
            Ok(transport) => {
                info!(
                    "Relay board connected on {} ({} baud)",
                    self.config.device, self.config.baud_rate
                );
                self.transport = Some(transport);
                true
            }
            Err(e) => {
                error!("Relay board setup failed: {}", e);
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Run one command against the board
    pub async fn execute(&mut self, command: Command) -> Result<Response> {
        let transport = self.transport.as_mut().ok_or(RelayError::NotConnected)?;
        exchange(transport, &command, &self.timing).await
    }

    async fn set_state(&mut self, code: CommandCode) -> Result<Response> {
        self.execute(Command::set_state(code)).await
    }

    /// Switch both relays on
    pub async fn all_on(&mut self) -> Result<Response> {
        self.set_state(CommandCode::AllOn).await
    }

    /// Switch both relays off
    pub async fn all_off(&mut self) -> Result<Response> {
        self.set_state(CommandCode::AllOff).await
    }

    pub async fn one_on(&mut self) -> Result<Response> {
        self.set_state(CommandCode::OneOn).await
    }

    pub async fn one_off(&mut self) -> Result<Response> {
        self.set_state(CommandCode::OneOff).await
    }

    pub async fn two_on(&mut self) -> Result<Response> {
        self.set_state(CommandCode::TwoOn).await
    }

    pub async fn two_off(&mut self) -> Result<Response> {
        self.set_state(CommandCode::TwoOff).await
    }

    /// Get firmware version
    pub async fn version(&mut self) -> Result<FirmwareVersion> {
        match self.execute(Command::query(CommandCode::Version)).await? {
            Response::Version(version) => Ok(version),
            other => Err(unexpected(CommandCode::Version, &other)),
        }
    }

    /// Get the contact state of both relays
    pub async fn status(&mut self) -> Result<RelayStatus> {
        match self.execute(Command::query(CommandCode::Status)).await? {
            Response::Status(status) => Ok(status),
            other => Err(unexpected(CommandCode::Status, &other)),
        }
    }

    /// Release the serial port; later calls fail with `NotConnected`
    pub async fn close(&mut self) -> Result<()> {
        match self.transport.take() {
            Some(mut transport) => transport.close().await,
            None => Ok(()),
        }
    }

    /// Hand the open connection to a dispatcher
    ///
    /// Consumes the board, so the two modes can never touch the port at the
    /// same time.
    pub fn into_dispatcher(self) -> Result<Dispatcher<T>> {
        let transport = self.transport.ok_or(RelayError::NotConnected)?;
        Ok(Dispatcher::new(transport, self.timing))
    }
}

fn unexpected(code: CommandCode, response: &Response) -> RelayError {
    RelayError::MalformedResponse(format!("Unexpected reply to {}: {}", code, response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use librelay_core::ErrorKind;
    use std::time::Duration;

    fn test_timing() -> ExchangeTiming {
        ExchangeTiming {
            read_timeout: Duration::from_millis(50),
            settle_delay: Duration::ZERO,
        }
    }

    /// Create a test RelayBoard whose setup hands out `mock`
    fn create_mock_board(mock: &MockTransport) -> RelayBoard<MockTransport> {
        let mock = mock.clone();
        RelayBoard::with_opener(RelayConfig::default(), move |_| Ok(mock.clone()))
            .with_timing(test_timing())
    }

    #[tokio::test]
    async fn test_calls_before_setup_are_not_connected() {
        let mock = MockTransport::new();
        let mut board = create_mock_board(&mock);

        assert!(matches!(board.all_on().await, Err(RelayError::NotConnected)));
        assert!(matches!(board.all_off().await, Err(RelayError::NotConnected)));
        assert!(matches!(board.one_on().await, Err(RelayError::NotConnected)));
        assert!(matches!(board.one_off().await, Err(RelayError::NotConnected)));
        assert!(matches!(board.two_on().await, Err(RelayError::NotConnected)));
        assert!(matches!(board.two_off().await, Err(RelayError::NotConnected)));
        assert!(matches!(board.version().await, Err(RelayError::NotConnected)));
        assert!(matches!(board.status().await, Err(RelayError::NotConnected)));

        assert!(mock.written().is_empty());
        assert_eq!(mock.read_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_setup_keeps_board_disconnected() {
        let mut board: RelayBoard<MockTransport> =
            RelayBoard::with_opener(RelayConfig::default(), |config| {
                Err(RelayError::Connection {
                    path: config.device.clone(),
                    reason: "No such file or directory".to_string(),
                })
            });

        assert!(!board.setup());
        assert!(!board.is_connected());
        assert!(matches!(board.one_on().await, Err(RelayError::NotConnected)));
    }

    #[tokio::test]
    async fn test_setup_rejects_invalid_config_without_opening() {
        let mock = MockTransport::new();
        let handle = mock.clone();
        let mut board =
            RelayBoard::with_opener(RelayConfig::new("/dev/ttyACM0", 0), move |_| Ok(mock.clone()));

        assert!(!board.setup());
        assert!(handle.written().is_empty());
    }

    #[tokio::test]
    async fn test_state_calls_write_one_byte_each() {
        let mock = MockTransport::new();
        let mut board = create_mock_board(&mock);
        assert!(board.setup());

        let ack = board.all_on().await.unwrap();
        assert_eq!(
            ack,
            Response::Ack {
                code: CommandCode::AllOn
            }
        );
        board.one_off().await.unwrap();
        board.two_off().await.unwrap();
        board.two_on().await.unwrap();

        assert_eq!(mock.written(), vec![100, 111, 112, 102]);
        assert_eq!(mock.read_count(), 0);
        assert!(!mock.relays().relay_one);
        assert!(mock.relays().relay_two);
    }

    #[tokio::test]
    async fn test_version_and_status() {
        let mock = MockTransport::with_firmware(FirmwareVersion { major: 2, minor: 5 });
        let mut board = create_mock_board(&mock);
        assert!(board.setup());

        let version = board.version().await.unwrap();
        assert_eq!(version.to_string(), "2.5");

        board.one_on().await.unwrap();
        let status = board.status().await.unwrap();
        assert!(status.relay_one);
        assert!(!status.relay_two);
    }

    #[tokio::test]
    async fn test_execute_rejects_mismatch_without_io() {
        let mock = MockTransport::new();
        let mut board = create_mock_board(&mock);
        assert!(board.setup());

        let err = board
            .execute(Command::set_state(CommandCode::Version))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCommand);
        assert!(mock.written().is_empty());
    }

    #[tokio::test]
    async fn test_status_timeout_surfaces_to_caller() {
        let mock = MockTransport::new();
        let mut board = create_mock_board(&mock);
        assert!(board.setup());

        mock.time_out_next_read();
        assert!(matches!(board.status().await, Err(RelayError::Timeout(_))));

        // No retry: the next call is a fresh exchange
        assert!(board.status().await.is_ok());
        assert_eq!(mock.written(), vec![91, 91]);
    }

    #[tokio::test]
    async fn test_garbage_status_is_malformed() {
        let mock = MockTransport::new();
        let mut board = create_mock_board(&mock);
        assert!(board.setup());

        mock.reply_next_with(vec![0xF0]);
        let err = board.status().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_close_disconnects() {
        let mock = MockTransport::new();
        let mut board = create_mock_board(&mock);
        assert!(board.setup());

        board.close().await.unwrap();
        assert!(mock.is_closed());
        assert!(!board.is_connected());
        assert!(matches!(board.all_off().await, Err(RelayError::NotConnected)));
    }

    #[tokio::test]
    async fn test_into_dispatcher_requires_setup() {
        let mock = MockTransport::new();
        let board = create_mock_board(&mock);
        assert!(matches!(
            board.into_dispatcher(),
            Err(RelayError::NotConnected)
        ));
    }
}
