//! Output formatting utilities for the CLI
//!
//! Provides text and JSON formatting with colors.

use anyhow::Result;
use colored::*;
use librelay_core::{FirmwareVersion, RelayStatus, Response};
use librelay_hardware::PortInfo;
use serde_json::json;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::OutputFormat;

fn on_off(on: bool) -> ColoredString {
    if on {
        "ON".green()
    } else {
        "OFF".red()
    }
}

/// Format a single response
pub fn format_response(response: &Response, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(response)?),
        OutputFormat::Text => Ok(match response {
            Response::Ack { code } => format!("{} {}", code.to_string().cyan(), "ok".green()),
            Response::Version(version) => format!("Firmware: {}", version.to_string().cyan()),
            Response::Status(status) => format_status(status, format)?,
            Response::Error { kind, message } => {
                format!("{} ({}): {}", "Error".red().bold(), kind, message)
            }
        }),
    }
}

/// Format firmware version
pub fn format_version(version: &FirmwareVersion, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(version)?),
        OutputFormat::Text => Ok(format!("Firmware: {}", version.to_string().cyan())),
    }
}

/// Format relay contact state
pub fn format_status(status: &RelayStatus, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(status)?),
        OutputFormat::Text => Ok(format!(
            "Relay 1: {}\nRelay 2: {}",
            on_off(status.relay_one),
            on_off(status.relay_two)
        )),
    }
}

/// Format serial port listing
pub fn format_ports(ports: &[PortInfo], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let ports: Vec<_> = ports
                .iter()
                .map(|port| {
                    json!({
                        "name": port.name,
                        "vid": port.usb_id.map(|(vid, _)| vid),
                        "pid": port.usb_id.map(|(_, pid)| pid),
                        "product": port.product,
                    })
                })
                .collect();
            Ok(serde_json::to_string_pretty(&ports)?)
        }
        OutputFormat::Text => {
            if ports.is_empty() {
                return Ok("No serial ports found".dimmed().to_string());
            }

            #[derive(Tabled)]
            struct PortRow {
                #[tabled(rename = "Port")]
                name: String,
                #[tabled(rename = "USB ID")]
                usb_id: String,
                #[tabled(rename = "Product")]
                product: String,
            }

            let rows: Vec<PortRow> = ports
                .iter()
                .map(|port| PortRow {
                    name: port.name.clone(),
                    usb_id: port
                        .usb_id
                        .map(|(vid, pid)| format!("{:04X}:{:04X}", vid, pid))
                        .unwrap_or_else(|| "-".to_string()),
                    product: port.product.clone().unwrap_or_else(|| "-".to_string()),
                })
                .collect();

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "Serial Ports:".bold(), table))
        }
    }
}
