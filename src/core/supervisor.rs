// src/core/supervisor.rs

//! The top-level read → execute → classify loop.
//!
//! Each iteration reads a line, splits it into a [`CommandRecord`], runs it
//! inside an [`ExecutionScope`], and classifies the result:
//!
//! | Outcome                         | Failure counter | Output                    |
//! |---------------------------------|-----------------|---------------------------|
//! | success                         | reset to 0      | nothing                   |
//! | cancellation (interrupt, stop)  | untouched       | blank line                |
//! | ordinary error                  | +1              | red diagnostic, blank line|
//! | end of input                    | n/a             | nothing, session ends     |
//!
//! When the counter reaches its budget the loop prints a fixed message and ends.

use crate::{
    constants::COLUMNS_VAR,
    core::{
        arg_parser::{TokenizeError, parse_command_line},
        interrupt::InterruptSlot,
        scope::{ExecutionScope, ScopeError},
    },
    models::{CommandEnv, SupervisorConfig},
    state::Session,
    system::{
        executor::CommandEngine,
        host::{Host, TerminalHost},
        input::{InputError, InputSource},
        sync::{NoSync, PersistenceSync},
    },
};
use colored::Colorize;
use std::fmt::Write as _;
use std::io::{self, Stderr, Write};
use std::sync::Arc;
use thiserror::Error;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The input source ran dry.
    EndOfInput,
    /// Too many consecutive ordinary failures.
    BudgetExhausted,
}

/// Any ordinary failure of one iteration. These are printed and counted.
#[derive(Error, Debug)]
pub enum IterationError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error(transparent)]
    Scope(#[from] ScopeError),
}

enum Outcome {
    Success,
    Cancelled,
    Failed(IterationError),
    EndOfInput,
}

/// Renders an error and its whole `source()` chain, one cause per line.
pub fn render_trace(error: &dyn std::error::Error) -> String {
    let mut trace = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(trace, "\n{}: {}", t!("shell.error.caused_by"), cause);
        source = cause.source();
    }
    trace
}

/// Drives one interactive session.
pub struct Supervisor<W = Stderr> {
    input: Box<dyn InputSource>,
    engine: Arc<dyn CommandEngine>,
    sync: Arc<dyn PersistenceSync>,
    host: Arc<dyn Host>,
    interrupts: Arc<InterruptSlot>,
    errors: W,
    program: String,
    prompt: String,
    colors_var: String,
    colors: String,
    session: Session,
}

impl<W> std::fmt::Debug for Supervisor<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("program", &self.program)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Supervisor<Stderr> {
    /// A supervisor with no persistence sync, a terminal host, a private
    /// interrupt slot, and diagnostics on stderr.
    pub fn new(
        config: &SupervisorConfig,
        input: Box<dyn InputSource>,
        engine: Arc<dyn CommandEngine>,
    ) -> Self {
        Self {
            input,
            engine,
            sync: Arc::new(NoSync),
            host: Arc::new(TerminalHost),
            interrupts: InterruptSlot::new(),
            errors: io::stderr(),
            program: config.program.clone(),
            prompt: config.rendered_prompt(),
            colors_var: config.colors_var_name(),
            colors: config.colors.clone(),
            session: Session::new(config.max_failures),
        }
    }
}

impl<W: Write> Supervisor<W> {
    pub fn with_sync(mut self, sync: Arc<dyn PersistenceSync>) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = host;
        self
    }

    /// Shares `interrupts` with whoever should be able to abort a running command.
    pub fn with_interrupts(mut self, interrupts: Arc<InterruptSlot>) -> Self {
        self.interrupts = interrupts;
        self
    }

    /// Redirects diagnostics, cancellation separators and the termination message.
    pub fn with_error_stream<W2: Write>(self, errors: W2) -> Supervisor<W2> {
        Supervisor {
            input: self.input,
            engine: self.engine,
            sync: self.sync,
            host: self.host,
            interrupts: self.interrupts,
            errors,
            program: self.program,
            prompt: self.prompt,
            colors_var: self.colors_var,
            colors: self.colors,
            session: self.session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn interrupts(&self) -> &Arc<InterruptSlot> {
        &self.interrupts
    }

    pub fn error_stream(&self) -> &W {
        &self.errors
    }

    /// Runs iterations until input ends or the failure budget is spent.
    ///
    /// Only a failure to write to the error stream is returned as `Err`.
    pub async fn run(&mut self) -> io::Result<SessionEnd> {
        loop {
            match self.iterate().await {
                Outcome::EndOfInput => {
                    log::debug!("Input exhausted after {} iteration(s).", self.session.iterations);
                    return Ok(SessionEnd::EndOfInput);
                }
                Outcome::Success => self.session.failures.reset(),
                Outcome::Cancelled => {
                    writeln!(self.errors)?;
                }
                Outcome::Failed(error) => {
                    self.report(&error)?;
                    let count = self.session.failures.record_failure();
                    log::debug!("Failure {}/{}.", count, self.session.failures.max());
                }
            }

            if self.session.failures.is_exhausted() {
                writeln!(self.errors, "\n{}", t!("shell.error.giving_up"))?;
                self.errors.flush()?;
                return Ok(SessionEnd::BudgetExhausted);
            }
        }
    }

    async fn iterate(&mut self) -> Outcome {
        let line = match self.input.next_line(&self.prompt).await {
            Ok(line) => line,
            Err(InputError::EndOfInput) => return Outcome::EndOfInput,
            Err(InputError::Interrupted) => return Outcome::Cancelled,
            Err(e) => return Outcome::Failed(e.into()),
        };

        let record = match parse_command_line(&line, &self.program) {
            Ok(record) => record,
            Err(e) => return Outcome::Failed(e.into()),
        };
        let env = self.command_env();
        self.session.iterations += 1;

        let scope = ExecutionScope::new(
            self.engine.as_ref(),
            self.sync.as_ref(),
            self.host.as_ref(),
            &self.interrupts,
        );
        match scope.run(&record, &env).await {
            Ok(()) => Outcome::Success,
            Err(e) if e.is_cancellation() => Outcome::Cancelled,
            Err(e) => Outcome::Failed(e.into()),
        }
    }

    fn command_env(&self) -> CommandEnv {
        let mut env = CommandEnv::new();
        if let Some(columns) = self.host.terminal_columns() {
            env.set(COLUMNS_VAR, columns.to_string());
        }
        if !self.colors.is_empty() {
            env.set(&self.colors_var, &self.colors);
        }
        env
    }

    fn report(&mut self, error: &IterationError) -> io::Result<()> {
        let trace = render_trace(error);
        writeln!(self.errors, "\n{}", trace.red().bold())?;
        writeln!(self.errors)?;
        self.errors.flush()
    }
}
