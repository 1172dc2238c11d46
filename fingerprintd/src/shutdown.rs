//! Shutdown handling for graceful daemon termination
//!
//! Releases the serial device once the HTTP server has stopped, so the port
//! is free for the next process that wants it.

use crate::bridge::ConnectionManager;
use tokio::signal;
use tracing::{info, warn};

/// Close the serial link if one is open
pub async fn close_serial_link(manager: &ConnectionManager) {
    let status = manager.status();
    let Some(port) = status.port else {
        info!("No serial link open at shutdown");
        return;
    };

    info!("Closing serial link to {}...", port);
    match manager.disconnect().await {
        Ok(()) => info!("Serial link closed"),
        Err(e) => warn!("Failed to close serial link: {}", e),
    }
}

/// Wait for Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
