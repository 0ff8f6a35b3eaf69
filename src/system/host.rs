// src/system/host.rs

use crate::core::interrupt::InterruptSlot;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum HostError {
    /// The host refused or could not deliver a notification.
    #[error("Host did not accept the '{signal}' notification: {reason}")]
    Notification { signal: &'static str, reason: String },
}

/// The environment hosting the session.
///
/// Notifications carry no payload and expect no acknowledgement; hosts use
/// them to, for instance, disable UI affordances while a command runs.
pub trait Host: Send + Sync {
    /// Sent right before the command engine is invoked.
    fn execution_start(&self) -> Result<(), HostError>;

    /// Sent once per command after the engine returned or was cancelled.
    fn execution_end(&self) -> Result<(), HostError>;

    /// Current terminal width, when the host knows it.
    fn terminal_columns(&self) -> Option<u16>;
}

/// A host backed by the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalHost;

impl Host for TerminalHost {
    fn execution_start(&self) -> Result<(), HostError> {
        log::debug!("Execution started.");
        Ok(())
    }

    fn execution_end(&self) -> Result<(), HostError> {
        log::debug!("Execution ended.");
        Ok(())
    }

    fn terminal_columns(&self) -> Option<u16> {
        match crossterm::terminal::size() {
            Ok((columns, _rows)) if columns > 0 => Some(columns),
            Ok(_) => None,
            Err(e) => {
                log::debug!("Terminal size unavailable: {}", e);
                None
            }
        }
    }
}

/// Forwards every Ctrl+C the process receives to the live interrupt handle.
///
/// Installing the listener replaces the default "terminate the process"
/// behaviour for SIGINT, so an interrupt only ever aborts the running command.
pub fn listen_for_interrupts(slot: Arc<InterruptSlot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::warn!("Could not listen for Ctrl+C: {}", e);
                return;
            }
            if !slot.trigger() {
                log::debug!("Ctrl+C received while no command was running.");
            }
        }
    })
}
