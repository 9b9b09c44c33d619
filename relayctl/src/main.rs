//! Relay board CLI
//!
//! Command-line interface for switching and querying a serial relay board.

use anyhow::Result;
use clap::Parser;
use librelay_hardware::{MockTransport, RelayBoard, RelayTransport};
use relayctl::cli::{
    connect, generate_completion, handle_config, handle_ports, handle_queue, handle_status,
    handle_switch, handle_version, Cli, Commands, OutputFormat,
};
use relayctl::config::{config_path, ConfigBuilder};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Build configuration using priority chain: defaults → file → env → CLI args
    let mut builder = ConfigBuilder::new();
    if let Some(ref device) = cli.device {
        builder = builder.with_device(device);
    }
    if let Some(baud) = cli.baud {
        builder = builder.with_baud_rate(baud);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        builder = builder.with_timeout_ms(timeout_ms);
    }
    builder = builder.with_env_overrides();

    let path = config_path(cli.config.as_deref());
    if !cli.no_config {
        debug!("Configuration file: {}", path.display());
        builder = builder.with_config_file(&path)?;
    }

    let config = match builder.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    debug!("Using {} at {} baud", config.device, config.baud_rate);

    let format = cli.format;
    let mock = cli.mock;
    let result = match cli.command {
        Commands::Ports => handle_ports(format),
        Commands::Config { command } => handle_config(command, &config, &path, format),
        Commands::Completion { shell } => {
            generate_completion(shell);
            Ok(())
        }
        command if mock => {
            let board = RelayBoard::with_opener(config, |_| Ok(MockTransport::new()));
            run_board_command(board, command, format).await
        }
        command => run_board_command(RelayBoard::from_config(config), command, format).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Run a command that needs the board
async fn run_board_command<T: RelayTransport + 'static>(
    mut board: RelayBoard<T>,
    command: Commands,
    format: OutputFormat,
) -> Result<()> {
    connect(&mut board)?;

    match command {
        Commands::Queue => return handle_queue(board, format).await,
        Commands::On { target } => handle_switch(&mut board, target.code(true), format).await?,
        Commands::Off { target } => handle_switch(&mut board, target.code(false), format).await?,
        Commands::Version => handle_version(&mut board, format).await?,
        Commands::Status => handle_status(&mut board, format).await?,
        Commands::Ports | Commands::Config { .. } | Commands::Completion { .. } => {}
    }

    board.close().await?;
    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
