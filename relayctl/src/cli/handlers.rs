//! Command execution handlers

use anyhow::{anyhow, Context, Result};
use librelay_core::{Command, CommandCode, RelayConfig, Response};
use librelay_hardware::{list_serial_ports, RelayBoard, RelayTransport};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::format::{format_ports, format_response, format_status, format_version};

use super::commands::*;

/// Open the board or explain why it couldn't be opened
pub fn connect<T: RelayTransport>(board: &mut RelayBoard<T>) -> Result<()> {
    if !board.setup() {
        return Err(anyhow!(
            "Cannot open relay board on {} ({} baud). Use --mock for testing without hardware.",
            board.config().device,
            board.config().baud_rate
        ));
    }
    Ok(())
}

/// Handle on/off commands
pub async fn handle_switch<T: RelayTransport>(
    board: &mut RelayBoard<T>,
    code: CommandCode,
    format: OutputFormat,
) -> Result<()> {
    let response = board.execute(Command::set_state(code)).await?;
    println!("{}", format_response(&response, format)?);
    Ok(())
}

/// Handle version command
pub async fn handle_version<T: RelayTransport>(
    board: &mut RelayBoard<T>,
    format: OutputFormat,
) -> Result<()> {
    let version = board.version().await?;
    println!("{}", format_version(&version, format)?);
    Ok(())
}

/// Handle status command
pub async fn handle_status<T: RelayTransport>(
    board: &mut RelayBoard<T>,
    format: OutputFormat,
) -> Result<()> {
    let status = board.status().await?;
    println!("{}", format_status(&status, format)?);
    Ok(())
}

/// Handle ports command
pub fn handle_ports(format: OutputFormat) -> Result<()> {
    let ports = list_serial_ports()?;
    println!("{}", format_ports(&ports, format)?);
    Ok(())
}

/// Feed JSON commands from `input` through a dispatcher
///
/// Returns one response per non-empty input line, in input order. Lines
/// that don't parse become `InvalidCommand` responses in their slot without
/// reaching the dispatcher.
pub async fn run_queue<T, R>(board: RelayBoard<T>, input: R) -> Result<Vec<Response>>
where
    T: RelayTransport + 'static,
    R: AsyncBufRead + Unpin,
{
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();

    let mut dispatcher = board.into_dispatcher()?;
    dispatcher.set_input_queue(cmd_rx)?;
    dispatcher.set_output_queue(resp_tx)?;
    dispatcher.start()?;

    // None marks a slot answered by the dispatcher
    let mut slots: Vec<Option<Response>> = Vec::new();
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::from_json(line) {
            Ok(command) => {
                debug!("Queueing {}", command);
                cmd_tx
                    .send(command)
                    .map_err(|_| anyhow!("Dispatcher stopped unexpectedly"))?;
                slots.push(None);
            }
            Err(e) => slots.push(Some(Response::from_error(&e))),
        }
    }
    drop(cmd_tx);

    let mut responses = Vec::with_capacity(slots.len());
    for slot in slots {
        let response = match slot {
            Some(rejected) => rejected,
            None => resp_rx
                .recv()
                .await
                .ok_or_else(|| anyhow!("Dispatcher exited before answering every command"))?,
        };
        responses.push(response);
    }

    dispatcher.close().await?;
    info!("Processed {} queued command(s)", responses.len());
    Ok(responses)
}

/// Handle queue command
pub async fn handle_queue<T: RelayTransport + 'static>(
    board: RelayBoard<T>,
    format: OutputFormat,
) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    for response in run_queue(board, stdin).await? {
        println!("{}", format_response(&response, format)?);
    }
    Ok(())
}

/// Handle config commands
pub fn handle_config(
    command: ConfigCommands,
    config: &RelayConfig,
    path: &std::path::Path,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show => match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
            OutputFormat::Text => print!("{}", config.to_toml()?),
        },
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Save => {
            config.save(path)?;
            println!("Configuration written to {}", path.display());
        }
    }
    Ok(())
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
