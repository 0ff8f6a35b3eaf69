// src/core/scope.rs

use crate::{
    CancellationToken,
    core::interrupt::{InterruptHandle, InterruptSlot},
    models::{CommandEnv, CommandRecord},
    system::{
        executor::{CommandEngine, EngineError},
        host::{Host, HostError},
        sync::{PersistenceSync, SyncError},
    },
};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Which side of the scope a persistence failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Before the command, backing store to working state.
    Pull,
    /// After the command, working state to backing store.
    Push,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pull => f.write_str("sync from backing store"),
            Self::Push => f.write_str("sync to backing store"),
        }
    }
}

/// Why one pass through the execution scope did not succeed.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// The operator interrupted the command, or the command asked to stop.
    #[error("Command was cancelled.")]
    Cancelled,
    /// The command engine reported an error.
    #[error(transparent)]
    Command(EngineError),
    /// Pull or push failed.
    #[error("Persistence failed during {phase}")]
    Persistence {
        phase: SyncPhase,
        #[source]
        source: SyncError,
    },
    /// A host notification failed.
    #[error(transparent)]
    Host(#[from] HostError),
}

impl ScopeError {
    /// Cancellations are neither reported nor counted by the supervisor.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<EngineError> for ScopeError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::Stopped => Self::Cancelled,
            other => Self::Command(other),
        }
    }
}

enum Race {
    Finished(Result<(), EngineError>),
    Interrupted,
}

/// Wraps one command invocation with persistence sync, host notifications
/// and the interrupt race.
///
/// The interrupt handle is armed before the pull, so an interrupt that
/// arrives while the working state is being synced still cancels the command.
/// Once the pull has succeeded, "execution end" and the push run exactly once
/// on every exit path: success, command failure, cancellation, or a failed
/// "execution start".
pub struct ExecutionScope<'a> {
    engine: &'a dyn CommandEngine,
    sync: &'a dyn PersistenceSync,
    host: &'a dyn Host,
    interrupts: &'a Arc<InterruptSlot>,
}

impl fmt::Debug for ExecutionScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionScope")
            .field("interrupts", self.interrupts)
            .finish_non_exhaustive()
    }
}

impl<'a> ExecutionScope<'a> {
    /// Borrows the collaborators for one command. The scope itself holds no state.
    pub fn new(
        engine: &'a dyn CommandEngine,
        sync: &'a dyn PersistenceSync,
        host: &'a dyn Host,
        interrupts: &'a Arc<InterruptSlot>,
    ) -> Self {
        Self {
            engine,
            sync,
            host,
            interrupts,
        }
    }

    /// Runs `record` through pull, start, race, end and push.
    pub async fn run(&self, record: &CommandRecord, env: &CommandEnv) -> Result<(), ScopeError> {
        let mut handle = scopeguard::guard(self.interrupts.arm(), InterruptHandle::release);

        // The guard is the only thing acquired so far, so a failed pull skips
        // the notifications and the push.
        self.sync
            .pull()
            .await
            .map_err(|source| ScopeError::Persistence {
                phase: SyncPhase::Pull,
                source,
            })?;

        let cancellation_token: CancellationToken = Arc::new(AtomicBool::new(false));

        let outcome = match self.host.execution_start() {
            Ok(()) => self.race(record, env, &mut handle, &cancellation_token).await,
            Err(e) => Err(ScopeError::Host(e)),
        };
        drop(handle);

        let ended = self.host.execution_end();
        if let Err(e) = &ended {
            log::warn!("{}", e);
        }
        let pushed = self.sync.push().await;

        outcome?;
        pushed.map_err(|source| ScopeError::Persistence {
            phase: SyncPhase::Push,
            source,
        })?;
        ended?;
        Ok(())
    }

    async fn race(
        &self,
        record: &CommandRecord,
        env: &CommandEnv,
        handle: &mut InterruptHandle,
        cancellation_token: &CancellationToken,
    ) -> Result<(), ScopeError> {
        if handle.take_fired() {
            log::debug!(
                "Command '{}' interrupted before it started (handle #{}).",
                record.line,
                handle.generation()
            );
            return Err(ScopeError::Cancelled);
        }

        let raced = tokio::select! {
            result = self.engine.execute(&record.argv, env, cancellation_token) => Race::Finished(result),
            () = handle.wait() => Race::Interrupted,
        };

        match raced {
            Race::Finished(result) => {
                handle.cancel_if_unresolved();
                result.map_err(ScopeError::from)
            }
            Race::Interrupted => {
                // The engine future was dropped by `select!`; the flag reaches
                // anything it handed off to other tasks or threads.
                cancellation_token.store(true, Ordering::SeqCst);
                log::debug!(
                    "Command '{}' interrupted by the host (handle #{}).",
                    record.line,
                    handle.generation()
                );
                Err(ScopeError::Cancelled)
            }
        }
    }
}
