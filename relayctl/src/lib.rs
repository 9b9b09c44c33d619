//! relayctl library
//!
//! Command-line front end for the relay board. The binary in `main.rs` only
//! parses arguments and wires these modules together.

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// Configuration resolution for the CLI tool.
pub mod config;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;
