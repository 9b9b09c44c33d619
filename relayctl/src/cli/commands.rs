//! CLI command and subcommand definitions

use clap::{Parser, Subcommand};
use librelay_core::CommandCode;

/// Relay board CLI
#[derive(Parser, Debug)]
#[command(name = "relayctl")]
#[command(version, about = "Serial relay board CLI", long_about = None)]
pub struct Cli {
    /// Serial device path (overrides config file)
    #[arg(short, long, global = true)]
    pub device: Option<String>,

    /// Baud rate (overrides config file)
    #[arg(short, long, global = true)]
    pub baud: Option<u32>,

    /// Read/write timeout in milliseconds (overrides config file)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Don't load config file
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Config file path (default: ~/.config/librelay/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Talk to a simulated board instead of a serial port
    #[arg(long, global = true)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Text,
    /// JSON output
    Json,
}

/// Which contacts a state command targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RelayTarget {
    All,
    One,
    Two,
}

impl RelayTarget {
    /// State code for switching this target on or off
    pub fn code(&self, on: bool) -> CommandCode {
        match (self, on) {
            (RelayTarget::All, true) => CommandCode::AllOn,
            (RelayTarget::All, false) => CommandCode::AllOff,
            (RelayTarget::One, true) => CommandCode::OneOn,
            (RelayTarget::One, false) => CommandCode::OneOff,
            (RelayTarget::Two, true) => CommandCode::TwoOn,
            (RelayTarget::Two, false) => CommandCode::TwoOff,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Switch relays on
    On {
        #[arg(value_enum)]
        target: RelayTarget,
    },

    /// Switch relays off
    Off {
        #[arg(value_enum)]
        target: RelayTarget,
    },

    /// Show firmware version
    Version,

    /// Show relay contact state
    Status,

    /// List serial ports
    Ports,

    /// Run JSON commands from stdin through the dispatcher
    ///
    /// One command per line, e.g. {"action": "SET_STATE", "content": "ALL_ON"}.
    /// Responses are printed in input order, one per line.
    Queue,

    /// Show CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show,

    /// Show the configuration file path
    Path,

    /// Write the resolved configuration to the configuration file
    Save,
}
