//! Command gateway
//!
//! Maps the dashboard's discrete operations onto device commands. Every
//! operation requires an open link and results in exactly one write.

use std::sync::Arc;

use fingerprint_core::{BridgeError, Command, FingerprintId, Result};
use tracing::info;

use super::ConnectionManager;

#[derive(Clone)]
pub struct CommandGateway {
    manager: Arc<ConnectionManager>,
}

impl CommandGateway {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// Start fingerprint enrollment
    pub async fn register(&self) -> Result<()> {
        self.dispatch(Command::Register).await
    }

    /// Start fingerprint verification
    pub async fn verify(&self) -> Result<()> {
        self.dispatch(Command::Verify).await
    }

    pub async fn delete_one(&self, id: FingerprintId) -> Result<()> {
        self.dispatch(Command::DeleteOne(id)).await
    }

    /// Parse `raw_id` and delete that template. A malformed id never reaches
    /// the device.
    pub async fn delete_one_str(&self, raw_id: &str) -> Result<FingerprintId> {
        let id: FingerprintId = raw_id.parse()?;
        self.delete_one(id).await?;
        Ok(id)
    }

    pub async fn delete_all(&self) -> Result<()> {
        self.dispatch(Command::DeleteAll).await
    }

    /// Leave enrollment or verification mode
    pub async fn stop(&self) -> Result<()> {
        self.dispatch(Command::Stop).await
    }

    /// Pass arbitrary single-line text through to the device
    pub async fn raw_command(&self, text: &str) -> Result<()> {
        let command = Command::raw(text)?;
        self.dispatch(command).await
    }

    async fn dispatch(&self, command: Command) -> Result<()> {
        if !self.manager.status().connected {
            return Err(BridgeError::NotConnected);
        }

        info!("Sending command: {}", command);
        self.manager.send(&command).await
    }
}
