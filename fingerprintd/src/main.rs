//! Fingerprint Bridge Server
//!
//! Bridges HTTP and WebSocket clients to a serial-connected fingerprint
//! attendance device.
//!
//! The daemon starts without a device link. Clients connect through
//! `POST /api/serial/connect`, or a device can be opened at startup with
//! `--device` (or `serial.auto_connect` in the config file). A failed startup
//! connect is logged and the server keeps running.

mod api;
mod bridge;
mod config;
mod shutdown;

use anyhow::Result;
use api::AppState;
use bridge::{Broadcaster, ConnectionManager, SerialSettings};
use clap::Parser;
use fingerprint_hardware::SerialPortOpener;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Fingerprint Bridge API Server
#[derive(Parser, Debug)]
#[command(name = "fingerprintd")]
#[command(version, about = "Fingerprint attendance serial bridge", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server bind address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Serial device to open at startup (e.g., /dev/ttyACM0, COM3)
    ///
    /// Takes precedence over `serial.auto_connect` in the config file.
    #[arg(long)]
    device: Option<String>,

    /// Baud rate for the startup device (defaults to `serial.default_baud_rate`)
    #[arg(long)]
    baud_rate: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.verbose);

    info!("Fingerprint Bridge Server starting...");

    let config_path = config::resolve_path(args.config);
    info!("Configuration file: {}", config_path.display());

    let static_config = config::load_static_config(&config_path).await?;
    info!("Configuration loaded successfully");

    let bind = args.bind.unwrap_or_else(|| static_config.server.bind.clone());
    let port = args.port.unwrap_or(static_config.server.port);
    let bind_addr = format!("{}:{}", bind, port);

    // Bridge services
    let manager = Arc::new(ConnectionManager::new(
        Arc::new(SerialPortOpener::new()),
        SerialSettings::from_config(&static_config),
    ));
    let broadcaster = Arc::new(Broadcaster::new(
        manager.clone(),
        static_config.broadcast.subscriber_queue,
    ));
    broadcaster.spawn();

    let startup_device = args
        .device
        .or_else(|| static_config.serial.auto_connect.clone());
    if let Some(device) = startup_device {
        let baud_rate = args
            .baud_rate
            .unwrap_or(static_config.serial.default_baud_rate);
        info!("Opening startup device {} at {} baud", device, baud_rate);
        if let Err(e) = manager.connect(&device, baud_rate).await {
            warn!("Startup connect to {} failed, continuing: {}", device, e);
        }
    }

    let app_state = AppState::new(
        manager.clone(),
        broadcaster,
        static_config.serial.default_baud_rate,
    );

    // Set up API router
    let app = api::create_router(app_state);

    // Start server
    info!("Starting server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Fingerprint Bridge listening on {}", bind_addr);
    info!("Push channel: ws://{}/ws", bind_addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await?;

    shutdown::close_serial_link(&manager).await;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
