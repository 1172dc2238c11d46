//! Fingerprint Bridge CLI
//!
//! Command-line interface for the fingerprint attendance bridge daemon.

use anyhow::Result;
use clap::Parser;
use fingerprintctl::cli::{
    generate_completion, handle_config, handle_connect, handle_device_command, handle_health,
    handle_info, handle_ports, handle_status, handle_watch, Cli, Commands, OutputFormat,
};
use fingerprintctl::client::BridgeClient;
use fingerprintctl::config::CliConfig;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_file = cli
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(CliConfig::config_path);

    // Priority chain: CLI args → env → file → defaults. Each source only
    // fills values the ones before it left unset.
    let config = match build_config(&cli, &config_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            if cli.verbose.unwrap_or(false) {
                eprintln!("Error details: {:?}", e);
            }
            std::process::exit(1);
        }
    };

    let output_format = match config.output_format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };
    let verbose = config.verbose;

    if verbose {
        eprintln!("Verbose mode enabled");
        eprintln!("Server URL: {}", config.server_url);
        eprintln!("Output format: {:?}", output_format);
        eprintln!("Config file: {}", config_file.display());
    }

    let result = if cli.command.needs_client() {
        let client = BridgeClient::with_config(
            config.server_url.clone(),
            config.timeout,
            3,
            std::time::Duration::from_millis(500),
        )?;
        run_remote(&client, &cli.command, &output_format).await
    } else {
        match cli.command {
            Commands::Config { command } => {
                handle_config(command, &config, &config_file, &output_format).await
            }
            Commands::Completion { shell } => {
                generate_completion(shell);
                Ok(())
            }
            _ => Ok(()),
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if verbose {
            eprintln!("Error details: {:?}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn build_config(cli: &Cli, config_file: &std::path::Path) -> Result<CliConfig> {
    let mut builder = CliConfig::builder();

    if let Some(ref server) = cli.server {
        builder = builder.with_server_url(server)?;
    }
    if let Some(ref format) = cli.format {
        builder = builder.with_output_format(format.as_str())?;
    }
    if let Some(verbose) = cli.verbose {
        builder = builder.with_verbose(verbose);
    }

    builder = builder.with_env_overrides();

    // Load config file (unless --no-config is specified)
    if !cli.no_config {
        builder = builder.with_config_from(config_file);
    }

    builder.build()
}

async fn run_remote(client: &BridgeClient, command: &Commands, format: &OutputFormat) -> Result<()> {
    match command {
        Commands::Info => handle_info(client, format).await,
        Commands::Health => handle_health(client, format).await,
        Commands::Ports { details } => handle_ports(client, *details, format).await,
        Commands::Status => handle_status(client, format).await,
        Commands::Connect { port, baud_rate } => {
            handle_connect(client, port, *baud_rate, format).await
        }
        Commands::Watch { reconnect } => handle_watch(client, *reconnect, format).await,
        other => handle_device_command(client, other, format).await,
    }
}
