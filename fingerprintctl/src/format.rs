//! Output formatting utilities for the CLI
//!
//! Provides table and JSON formatting with colors.

use anyhow::Result;
use colored::*;
use fingerprint_core::api::{InfoResponse, PortDetailsResponse, PortsResponse, PushMessage};
use fingerprint_core::ConnectionStatus;

use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
}

fn yes_no(value: bool) -> ColoredString {
    if value {
        "Yes".green()
    } else {
        "No".red()
    }
}

/// Format info response
pub fn format_info(info: &InfoResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(info)?),
        OutputFormat::Table => {
            let mut output = String::new();
            output.push_str(&"Fingerprint Bridge Information".bold().to_string());
            output.push('\n');
            output.push_str(&format!("Version: {}", info.version.cyan()));
            output.push('\n');
            output.push_str(&format!(
                "Uptime: {} seconds",
                info.uptime.to_string().yellow()
            ));
            output.push('\n');
            output.push_str(&format!("Link State: {}", info.link_state.as_str().cyan()));
            output.push('\n');
            output.push_str(&format!(
                "Device Connected: {}",
                yes_no(info.connection.connected)
            ));

            if let Some(port) = &info.connection.port {
                output.push('\n');
                output.push_str(&format!(
                    "Device: {} @ {} baud",
                    port.cyan(),
                    info.connection.baud_rate
                ));
            }

            output.push('\n');
            output.push_str(&format!(
                "Push Subscribers: {}",
                info.subscribers.to_string().yellow()
            ));

            Ok(output)
        }
    }
}

/// Format connection status
pub fn format_status(status: &ConnectionStatus, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(status)?),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct StatusRow {
                #[tabled(rename = "Connected")]
                connected: String,
                #[tabled(rename = "Port")]
                port: String,
                #[tabled(rename = "Baud Rate")]
                baud_rate: String,
            }

            let row = StatusRow {
                connected: yes_no(status.connected).to_string(),
                port: match &status.port {
                    Some(port) => port.cyan().to_string(),
                    None => "-".dimmed().to_string(),
                },
                baud_rate: status.baud_rate.to_string(),
            };

            let table = Table::new([row]).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "Serial Link:".bold(), table))
        }
    }
}

/// Format serial port listing
pub fn format_ports(ports: &PortsResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(ports)?),
        OutputFormat::Table => {
            if ports.ports.is_empty() {
                return Ok("No serial ports found".yellow().to_string());
            }

            let mut output = "Serial Ports:".bold().to_string();
            for port in &ports.ports {
                output.push_str(&format!("\n  {}", port.cyan()));
            }
            Ok(output)
        }
    }
}

/// Format detailed serial port listing
pub fn format_port_details(ports: &PortDetailsResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(ports)?),
        OutputFormat::Table => {
            if ports.ports.is_empty() {
                return Ok("No serial ports found".yellow().to_string());
            }

            #[derive(Tabled)]
            struct PortRow {
                #[tabled(rename = "Port")]
                port: String,
                #[tabled(rename = "Type")]
                kind: String,
                #[tabled(rename = "VID:PID")]
                ids: String,
                #[tabled(rename = "Manufacturer")]
                manufacturer: String,
                #[tabled(rename = "Product")]
                product: String,
            }

            let rows: Vec<PortRow> = ports
                .ports
                .iter()
                .map(|details| PortRow {
                    port: details.port.cyan().to_string(),
                    kind: format!("{:?}", details.kind).to_lowercase(),
                    ids: match (details.vid, details.pid) {
                        (Some(vid), Some(pid)) => format!("{:04x}:{:04x}", vid, pid),
                        _ => "-".to_string(),
                    },
                    manufacturer: details.manufacturer.clone().unwrap_or_else(|| "-".into()),
                    product: details.product.clone().unwrap_or_else(|| "-".into()),
                })
                .collect();

            let table = Table::new(rows).with(Style::rounded()).to_string();
            Ok(format!("{}\n{}", "Serial Ports:".bold(), table))
        }
    }
}

/// Format one push message as a single output line
pub fn format_push_message(message: &PushMessage, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(message)?),
        OutputFormat::Table => Ok(match message {
            PushMessage::SerialData { timestamp, message } => {
                format!("{} {}", format!("[{}]", timestamp).dimmed(), message)
            }
            PushMessage::SerialConnected { port, baud_rate } => format!(
                "{} {} @ {} baud",
                "connected".green().bold(),
                port.cyan(),
                baud_rate
            ),
            PushMessage::SerialDisconnected => "disconnected".yellow().bold().to_string(),
            PushMessage::SerialError { message } => {
                format!("{} {}", "error".red().bold(), message)
            }
            PushMessage::CommandSent { command } => {
                format!("{} {}", "sent".blue().bold(), command)
            }
            PushMessage::SerialStatus {
                connected,
                port,
                baud_rate,
            } => match port {
                Some(port) if *connected => format!(
                    "{} connected to {} @ {} baud",
                    "status".bold(),
                    port.cyan(),
                    baud_rate
                ),
                _ => format!("{} not connected", "status".bold()),
            },
        }),
    }
}

/// Format success message
pub fn format_success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}
