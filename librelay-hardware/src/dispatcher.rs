//! Command dispatcher
//!
//! A background worker that drains an input queue of [`Command`]s, runs each
//! one against the board, and publishes the [`Response`] on an output queue.
//!
//! # Lifecycle
//!
//! ```text
//!  Idle --(both queues set)--> Bound --start()--> Running --stop()--> Idle
//! ```
//!
//! The caller creates both channels and hands the dispatcher the receiving
//! end of the command queue and the sending end of the response queue.
//! While running, the transport and both queue ends are owned by the worker
//! task; `stop` gives them back. A worker whose command queue closed
//! exits on its own and the dispatcher falls back to `Idle`, keeping the
//! transport and the response queue for the next `start`.
//!
//! # Ordering
//!
//! There is exactly one worker and it handles one command at a time, so
//! responses come out in the order commands were taken from the queue.
//! Every popped command produces exactly one response: failures are sent
//! as [`Response::Error`] and never end the worker.

use crate::exchange::{exchange, ExchangeTiming};
use crate::serial_driver::{RelayTransport, SerialDriver};
use librelay_core::{Command, RelayError, Response, Result};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Sending side of the command queue
pub type CommandSender = mpsc::UnboundedSender<Command>;
/// Receiving side of the command queue, bound to the dispatcher
pub type CommandReceiver = mpsc::UnboundedReceiver<Command>;
/// Sending side of the response queue, bound to the dispatcher
pub type ResponseSender = mpsc::UnboundedSender<Response>;
/// Receiving side of the response queue
pub type ResponseReceiver = mpsc::UnboundedReceiver<Response>;

/// Dispatcher state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Constructed, at least one queue missing
    Idle,
    /// Both queues attached, worker not started
    Bound,
    /// Worker active
    Running,
}

impl DispatcherState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatcherState::Idle => "idle",
            DispatcherState::Bound => "bound",
            DispatcherState::Running => "running",
        }
    }
}

/// Queue ends handed back by [`Dispatcher::stop`]
///
/// Commands still buffered in `input` were never popped and are left for
/// the caller to resubmit or drop.
pub struct ReleasedQueues {
    pub input: CommandReceiver,
    pub output: ResponseSender,
}

/// Everything the worker owns while running
struct WorkerParts<T> {
    transport: T,
    input: CommandReceiver,
    output: ResponseSender,
}

struct Worker<T> {
    stop_tx: watch::Sender<bool>,
    parts_rx: oneshot::Receiver<WorkerParts<T>>,
    handle: JoinHandle<()>,
}

impl<T> Worker<T> {
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Single-worker dispatcher for one relay board
pub struct Dispatcher<T: RelayTransport + 'static = SerialDriver> {
    transport: Option<T>,
    timing: ExchangeTiming,
    input: Option<CommandReceiver>,
    output: Option<ResponseSender>,
    worker: Option<Worker<T>>,
}

impl<T: RelayTransport + 'static> Dispatcher<T> {
    /// Dispatcher taking exclusive ownership of an open transport
    pub fn new(transport: T, timing: ExchangeTiming) -> Self {
        Self {
            transport: Some(transport),
            timing,
            input: None,
            output: None,
            worker: None,
        }
    }

    pub fn state(&self) -> DispatcherState {
        if self.is_running() {
            DispatcherState::Running
        } else if self.worker.is_some() {
            // Exited on its own; the closed input queue is dropped on reap
            DispatcherState::Idle
        } else if self.input.is_some() && self.output.is_some() {
            DispatcherState::Bound
        } else {
            DispatcherState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Take back the parts of a worker that exited on its own
    fn reap_finished(&mut self) {
        let Some(worker) = self.worker.as_mut() else {
            return;
        };

        match worker.parts_rx.try_recv() {
            Ok(parts) => {
                // Every sender is gone, so the old input can never deliver again
                self.transport = Some(parts.transport);
                self.output.get_or_insert(parts.output);
            }
            Err(oneshot::error::TryRecvError::Empty) => return,
            Err(oneshot::error::TryRecvError::Closed) => {
                warn!("Dispatcher worker ended without handing back the transport");
            }
        }

        self.worker = None;
        debug!(
            "Dispatcher {} -> {}",
            DispatcherState::Running.as_str(),
            self.state().as_str()
        );
    }

    /// Attach the queue commands are read from
    ///
    /// Returns the previously bound receiver, if any.
    pub fn set_input_queue(&mut self, input: CommandReceiver) -> Result<Option<CommandReceiver>> {
        self.reap_finished();
        if self.is_running() {
            return Err(RelayError::AlreadyRunning);
        }
        Ok(self.input.replace(input))
    }

    /// Attach the queue responses are written to
    ///
    /// Returns the previously bound sender, if any.
    pub fn set_output_queue(&mut self, output: ResponseSender) -> Result<Option<ResponseSender>> {
        self.reap_finished();
        if self.is_running() {
            return Err(RelayError::AlreadyRunning);
        }
        Ok(self.output.replace(output))
    }

    /// Spawn the worker task
    ///
    /// Must be called from within a Tokio runtime. Fails with `NotConfigured`
    /// unless both queues are bound.
    pub fn start(&mut self) -> Result<()> {
        self.reap_finished();
        if self.worker.is_some() {
            return Err(RelayError::AlreadyRunning);
        }
        // Lost only if an earlier worker panicked
        if self.transport.is_none() {
            return Err(RelayError::NotConnected);
        }
        if self.input.is_none() {
            return Err(RelayError::NotConfigured(
                "input queue not bound".to_string(),
            ));
        }
        if self.output.is_none() {
            return Err(RelayError::NotConfigured(
                "output queue not bound".to_string(),
            ));
        }

        let (Some(transport), Some(input), Some(output)) =
            (self.transport.take(), self.input.take(), self.output.take())
        else {
            return Err(RelayError::NotConnected);
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let parts = WorkerParts {
            transport,
            input,
            output,
        };
        let (parts_tx, parts_rx) = oneshot::channel();
        let timing = self.timing;
        let handle = tokio::spawn(async move {
            let parts = run_worker(parts, timing, stop_rx).await;
            // Err only if the dispatcher itself was dropped
            let _ = parts_tx.send(parts);
        });

        info!("Dispatcher started");
        debug!(
            "Dispatcher {} -> {}",
            DispatcherState::Bound.as_str(),
            DispatcherState::Running.as_str()
        );
        self.worker = Some(Worker {
            stop_tx,
            parts_rx,
            handle,
        });
        Ok(())
    }

    /// Stop the worker and return to `Idle`
    ///
    /// The command in flight, if any, runs to completion and its response is
    /// delivered before the worker exits. The queues are returned untouched;
    /// returns `None` if the dispatcher was not running.
    pub async fn stop(&mut self) -> Result<Option<ReleasedQueues>> {
        let Some(worker) = self.worker.take() else {
            debug!("Dispatcher stop requested while not running");
            return Ok(None);
        };

        // Err means the worker already exited on its own
        let _ = worker.stop_tx.send(true);

        worker.handle.await.map_err(|e| {
            warn!("Dispatcher worker failed: {}", e);
            RelayError::Worker(e.to_string())
        })?;
        let parts = worker
            .parts_rx
            .await
            .map_err(|_| RelayError::Worker("worker did not hand back its parts".to_string()))?;

        self.transport = Some(parts.transport);
        info!("Dispatcher stopped");
        debug!(
            "Dispatcher {} -> {}",
            DispatcherState::Running.as_str(),
            self.state().as_str()
        );

        Ok(Some(ReleasedQueues {
            input: parts.input,
            output: parts.output,
        }))
    }

    /// Stop if running, then release the transport
    pub async fn close(mut self) -> Result<()> {
        self.stop().await?;
        match self.transport.take() {
            Some(mut transport) => transport.close().await,
            None => Ok(()),
        }
    }
}

async fn run_worker<T: RelayTransport>(
    mut parts: WorkerParts<T>,
    timing: ExchangeTiming,
    mut stop_rx: watch::Receiver<bool>,
) -> WorkerParts<T> {
    let mut processed: u64 = 0;

    loop {
        // Stop is polled first so a pending stop wins over queued commands
        let command = tokio::select! {
            biased;
            _ = stop_rx.changed() => {
                debug!("Dispatcher received stop signal");
                break;
            }
            command = parts.input.recv() => match command {
                Some(command) => command,
                None => {
                    info!("Command queue closed, dispatcher worker exiting");
                    break;
                }
            },
        };

        debug!("Dispatching {}", command);

        let response = match exchange(&mut parts.transport, &command, &timing).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Command {} failed: {}", command, e);
                Response::from_error(&e)
            }
        };

        processed += 1;
        if parts.output.send(response).is_err() {
            warn!("Response queue closed, dropping response to {}", command);
        }
    }

    debug!("Dispatcher worker processed {} command(s)", processed);
    parts
}
