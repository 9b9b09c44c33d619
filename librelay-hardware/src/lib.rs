//! librelay-hardware
//!
//! Hardware crate that contains the serial driver, the direct-call relay
//! board interface, and the queue-driven command dispatcher.
//!
//! Public API:
//! - `relay_board::RelayBoard` - one exchange per call, on the caller's task
//! - `dispatcher::Dispatcher` - background worker fed through channels
//! - `serial_driver::SerialDriver` - low-level serial I/O driver
//! - `serial_driver::list_serial_ports` - helper to locate the device
//! - `mock::MockTransport` - simulated board for tests and `--mock` runs
//!
//! ```no_run
//! use librelay_hardware::{Dispatcher, RelayBoard};
//! use librelay_core::{Command, CommandCode};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> librelay_core::Result<()> {
//! let mut board = RelayBoard::new("/dev/ttyACM0", 115200);
//! if !board.setup() {
//!     return Err(librelay_core::RelayError::NotConnected);
//! }
//! board.all_off().await?;
//!
//! let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
//! let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
//! let mut dispatcher: Dispatcher = board.into_dispatcher()?;
//! dispatcher.set_input_queue(cmd_rx)?;
//! dispatcher.set_output_queue(resp_tx)?;
//! dispatcher.start()?;
//!
//! cmd_tx.send(Command::query(CommandCode::Status)).ok();
//! if let Some(response) = resp_rx.recv().await {
//!     println!("{}", response);
//! }
//! dispatcher.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod exchange;
pub mod mock;
pub mod relay_board;
pub mod serial_driver;

pub use dispatcher::{
    CommandReceiver, CommandSender, Dispatcher, DispatcherState, ReleasedQueues, ResponseReceiver,
    ResponseSender,
};
pub use exchange::ExchangeTiming;
pub use mock::MockTransport;
pub use relay_board::RelayBoard;
pub use serial_driver::{list_serial_ports, PortInfo, RelayTransport, SerialDriver};
