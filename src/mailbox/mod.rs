pub mod command;

pub use command::WateringCommand;

use crate::config::Mailbox as MailboxCfg;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MailboxError {
    #[error("Invalid command: {0}")]
    Invalid(String),
    #[error("Command already present: {0}")]
    Pending(WateringCommand),
}

/// Single-slot handoff between the dashboard (producer) and the field device (consumer).
///
/// At most one command is pending at any time. A submit while occupied is rejected and
/// leaves the stored command untouched; a poll takes the command out and empties the slot.
/// Every transition happens under the slot lock, so concurrent polls can never observe the
/// same command twice.
#[derive(Debug)]
pub struct CommandMailbox {
    slot: Mutex<Option<WateringCommand>>,
    cfg: MailboxCfg,
}

impl CommandMailbox {
    /// Starts empty.
    pub fn new(cfg: MailboxCfg) -> Self {
        Self { slot: Mutex::new(None), cfg }
    }

    pub async fn submit(&self, cmd: WateringCommand) -> Result<WateringCommand, MailboxError> {
        cmd.validate(&self.cfg)?;

        let mut slot = self.slot.lock().await;
        if let Some(pending) = *slot {
            debug!(pending = %pending, rejected = %cmd, "Mailbox occupied.");
            return Err(MailboxError::Pending(pending));
        }
        *slot = Some(cmd);
        info!(command = %cmd, "Command stored.");
        Ok(cmd)
    }

    /// Validates an untyped request body before touching the slot.
    pub async fn submit_json(&self, body: &Value) -> Result<WateringCommand, MailboxError> {
        let cmd = WateringCommand::from_json(body, &self.cfg)?;
        self.submit(cmd).await
    }

    pub async fn poll(&self) -> Option<WateringCommand> {
        let cmd = self.slot.lock().await.take();
        if let Some(cmd) = cmd {
            info!(command = %cmd, "Command handed to device.");
        }
        cmd
    }

    pub async fn is_pending(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}
