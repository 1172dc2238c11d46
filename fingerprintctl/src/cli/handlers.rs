//! Command execution handlers

use anyhow::{Context, Result};
use fingerprint_core::api::AckResponse;
use fingerprint_core::FingerprintId;
use std::path::Path;
use std::time::Duration;

use crate::client::BridgeClient;
use crate::config::CliConfig;
use crate::format::{
    format_info, format_port_details, format_ports, format_push_message, format_status,
    format_success,
};

use super::commands::*;

/// Pause between push-channel reconnect attempts
const WATCH_RECONNECT_DELAY: Duration = Duration::from_secs(3);

fn print_ack(ack: &AckResponse, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(ack)?),
        OutputFormat::Table => println!("{}", format_success(&ack.message)),
    }
    Ok(())
}

/// Handle info command
pub async fn handle_info(client: &BridgeClient, format: &OutputFormat) -> Result<()> {
    let info = client.get_info().await?;
    println!("{}", format_info(&info, &format.into())?);
    Ok(())
}

/// Handle health command
pub async fn handle_health(client: &BridgeClient, format: &OutputFormat) -> Result<()> {
    let health = client.health_check().await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        OutputFormat::Table => {
            println!("Server Health Check:");
            println!("{:<20} Value", "Status");
            println!("{}", "-".repeat(40));

            let mut keys: Vec<_> = health.keys().collect();
            keys.sort();
            for key in keys {
                let value_str = match &health[key] {
                    serde_json::Value::Bool(b) => {
                        if *b { "✓".to_string() } else { "✗".to_string() }
                    }
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                println!("{:<20} {}", key, value_str);
            }
        }
    }

    Ok(())
}

/// Handle ports command
pub async fn handle_ports(client: &BridgeClient, details: bool, format: &OutputFormat) -> Result<()> {
    let output = if details {
        format_port_details(&client.list_port_details().await?, &format.into())?
    } else {
        format_ports(&client.list_ports().await?, &format.into())?
    };
    println!("{}", output);
    Ok(())
}

/// Handle status command
pub async fn handle_status(client: &BridgeClient, format: &OutputFormat) -> Result<()> {
    let status = client.get_status().await?;
    println!("{}", format_status(&status, &format.into())?);
    Ok(())
}

/// Handle connect command
pub async fn handle_connect(
    client: &BridgeClient,
    port: &str,
    baud_rate: Option<u32>,
    format: &OutputFormat,
) -> Result<()> {
    let response = client.connect(port, baud_rate).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Table => {
            println!("{}", format_success(&response.message));
            println!("{}", format_status(&response.status, &format.into())?);
        }
    }
    Ok(())
}

/// Handle the device command family: disconnect, register, verify, stop,
/// delete, delete-all and send
pub async fn handle_device_command(
    client: &BridgeClient,
    command: &Commands,
    format: &OutputFormat,
) -> Result<()> {
    let ack = match command {
        Commands::Disconnect => client.disconnect().await?,
        Commands::Register => client.register().await?,
        Commands::Verify => client.verify().await?,
        Commands::Stop => client.stop().await?,
        Commands::DeleteAll => client.delete_all().await?,
        Commands::Delete { id } => {
            let id: FingerprintId = id.parse()?;
            client.delete_fingerprint(id).await?
        }
        Commands::Send { text } => client.send_command(text).await?,
        other => return Err(anyhow::anyhow!("Not a device command: {:?}", other)),
    };

    print_ack(&ack, format)
}

/// Handle watch command
///
/// Prints one line per push message until the channel closes. With
/// `reconnect`, a dropped or refused channel is retried every 3 seconds.
pub async fn handle_watch(client: &BridgeClient, reconnect: bool, format: &OutputFormat) -> Result<()> {
    loop {
        match client.subscribe().await {
            Ok(mut stream) => {
                eprintln!("Watching {}/ws (Ctrl+C to stop)", client.base_url());
                while let Some(message) = stream.next_message().await {
                    match message {
                        Ok(message) => println!("{}", format_push_message(&message, &format.into())?),
                        Err(e) => {
                            eprintln!("{}", e);
                            break;
                        }
                    }
                }

                if !reconnect {
                    return Ok(());
                }
                eprintln!(
                    "Push channel closed, reconnecting in {}s...",
                    WATCH_RECONNECT_DELAY.as_secs()
                );
            }
            Err(e) if reconnect => {
                eprintln!(
                    "{:#}, retrying in {}s...",
                    e,
                    WATCH_RECONNECT_DELAY.as_secs()
                );
            }
            Err(e) => return Err(e),
        }

        tokio::time::sleep(WATCH_RECONNECT_DELAY).await;
    }
}

/// Handle config command
///
/// `config_file` is where `set` and `reset` write, and what `path` prints.
pub async fn handle_config(
    command: ConfigCommands,
    current_config: &CliConfig,
    config_file: &Path,
    format: &OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show => match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(current_config)?);
            }
            OutputFormat::Table => {
                println!("CLI Configuration:");
                println!("{:<20} Value", "Setting");
                println!("{}", "-".repeat(40));
                println!("{:<20} {}", "Server URL", current_config.server_url);
                println!("{:<20} {}", "Output Format", current_config.output_format);
                println!("{:<20} {}", "Verbose", current_config.verbose);
                println!("{:<20} {}s", "Timeout", current_config.timeout);
            }
        },
        ConfigCommands::Path => {
            println!("{}", config_file.display());
        }
        ConfigCommands::Set { key, value } => {
            let config = apply_setting(CliConfig::load_from(config_file)?, &key, &value)?;
            config.save_to(config_file)?;
            println!("{}", format_success(&format!("Set {} = {}", key, value)));
        }
        ConfigCommands::Reset => {
            CliConfig::default().save_to(config_file)?;
            println!("{}", format_success("Configuration reset to defaults"));
        }
    }

    Ok(())
}

/// Apply one `key = value` setting, validating it through the builder
fn apply_setting(config: CliConfig, key: &str, value: &str) -> Result<CliConfig> {
    let builder = CliConfig::builder()
        .with_server_url(config.server_url)?
        .with_output_format(config.output_format)?
        .with_verbose(config.verbose)
        .with_timeout(config.timeout)?;

    let builder = match key {
        "server_url" => builder.with_server_url(value)?,
        "output_format" => builder.with_output_format(value)?,
        "verbose" => builder.with_verbose(value.to_lowercase() == "true" || value == "1"),
        "timeout" => {
            let timeout = value
                .parse()
                .context("Invalid timeout value. Must be a number")?;
            builder.with_timeout(timeout)?
        }
        _ => return Err(anyhow::anyhow!("Unknown config key: {}", key)),
    };

    builder.build()
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
