// src/system/input.rs

//! Sources of command lines for the supervisor.
//!
//! - [`PlainInput`] reads lines from any async reader with no memory of past entries.
//! - [`HistoryInput`] wraps a line editor and persists every accepted line to a
//!   [`HistoryLog`] before handing it to the supervisor.

use async_trait::async_trait;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

#[derive(Error, Debug)]
pub enum InputError {
    #[error("No more input.")]
    EndOfInput,
    #[error("Input was interrupted.")]
    Interrupted,
    #[error("Failed to read from the terminal")]
    Io(#[from] std::io::Error),
    #[error("Line editor failed")]
    Readline(#[source] ReadlineError),
    #[error("Could not read history log '{path}'")]
    HistoryLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not append to history log '{path}'")]
    HistoryAppend {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything that can hand the supervisor its next command line.
///
/// Sources are driven from the session's single thread, so the returned
/// future is not required to be `Send`. A read may block that thread.
#[async_trait(?Send)]
pub trait InputSource {
    /// Returns the next raw line without its line terminator.
    ///
    /// Fails with [`InputError::EndOfInput`] once input is exhausted.
    async fn next_line(&mut self, prompt: &str) -> Result<String, InputError>;
}

// --- Plain input ---

/// Line-by-line reader over an async byte stream.
#[derive(Debug)]
pub struct PlainInput<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> PlainInput<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl PlainInput<BufReader<Stdin>, Stdout> {
    /// Reads from the process's stdin and prompts on its stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

#[async_trait(?Send)]
impl<R, W> InputSource for PlainInput<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn next_line(&mut self, prompt: &str) -> Result<String, InputError> {
        self.writer.write_all(prompt.as_bytes()).await?;
        self.writer.flush().await?;

        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(InputError::EndOfInput);
        }
        Ok(strip_line_ending(line))
    }
}

fn strip_line_ending(mut line: String) -> String {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    line
}

// --- History log ---

/// Append-only, line-oriented record of accepted commands.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every persisted entry in order.
    ///
    /// A log that does not exist yet is an empty log. Any other failure,
    /// including a log that is not valid UTF-8, is returned.
    pub fn load(&self) -> Result<Vec<String>, InputError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No history log at '{}' yet.", self.path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(InputError::HistoryLoad {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    /// Appends one entry, creating the log (and its directory) on first use.
    pub fn append(&self, line: &str) -> Result<(), InputError> {
        let to_append_error = |source| InputError::HistoryAppend {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(to_append_error)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(to_append_error)?;
        writeln!(file, "{}", line).map_err(to_append_error)
    }
}

// --- History-aware input ---

/// The editing front end used by [`HistoryInput`].
pub trait LineEditor {
    /// Reads one line, blocking until the operator submits it.
    fn read_line(&mut self, prompt: &str) -> Result<String, InputError>;

    /// Makes `line` available for recall in later reads.
    fn remember(&mut self, line: &str);
}

impl LineEditor for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> Result<String, InputError> {
        self.readline(prompt).map_err(|e| match e {
            ReadlineError::Eof => InputError::EndOfInput,
            ReadlineError::Interrupted => InputError::Interrupted,
            ReadlineError::Io(io) => InputError::Io(io),
            other => InputError::Readline(other),
        })
    }

    fn remember(&mut self, line: &str) {
        if let Err(e) = self.add_history_entry(line) {
            log::warn!("Line editor rejected history entry: {}", e);
        }
    }
}

/// Line editor input whose accepted lines are persisted to a [`HistoryLog`].
///
/// Every line is logged verbatim, blank ones included; only non-blank lines
/// are offered for recall.
#[derive(Debug)]
pub struct HistoryInput<E = DefaultEditor> {
    editor: E,
    log: HistoryLog,
}

impl HistoryInput<DefaultEditor> {
    /// Opens a `rustyline` editor backed by the log at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, InputError> {
        let editor = DefaultEditor::new().map_err(|e| match e {
            ReadlineError::Io(io) => InputError::Io(io),
            other => InputError::Readline(other),
        })?;
        Self::with_editor(editor, HistoryLog::new(path))
    }
}

impl<E: LineEditor> HistoryInput<E> {
    /// Wraps `editor` and preloads it with whatever `history` already holds.
    pub fn with_editor(mut editor: E, history: HistoryLog) -> Result<Self, InputError> {
        let entries = history.load()?;
        log::debug!(
            "Loaded {} history entries from '{}'.",
            entries.len(),
            history.path().display()
        );
        for entry in entries.iter().filter(|e| !e.trim().is_empty()) {
            editor.remember(entry);
        }
        Ok(Self {
            editor,
            log: history,
        })
    }

    pub fn log(&self) -> &HistoryLog {
        &self.log
    }
}

#[async_trait(?Send)]
impl<E: LineEditor> InputSource for HistoryInput<E> {
    async fn next_line(&mut self, prompt: &str) -> Result<String, InputError> {
        let line = self.editor.read_line(prompt)?;
        // Persisted before the command runs, so a crash mid-command keeps the entry.
        self.log.append(&line)?;
        if !line.trim().is_empty() {
            self.editor.remember(&line);
        }
        Ok(line)
    }
}
