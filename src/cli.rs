// src/cli.rs

use crate::models::SupervisorConfig;
use clap::Parser;
use std::path::PathBuf;

/// shellward: keeps an interactive session with a command-line tool alive.
///
/// Every line you type is split like a shell would split it and handed to the
/// wrapped program. Failures are reported and the prompt comes back; after too
/// many consecutive failures the session gives up. Ctrl+C interrupts the
/// running command, Ctrl+D ends the session.
///
/// Settings are read from `shellward.toml` in the user config directory.
/// Flags given here take precedence over the file.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Program to supervise. Also used as `argv[0]` for every command.
    #[arg(short, long)]
    pub program: Option<String>,

    /// Use this config file instead of the default one.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Backing store that is pulled before and pushed after every command.
    #[arg(long, value_name = "DIR")]
    pub backing_dir: Option<String>,

    /// Directory the program runs in and the backing store is mirrored into.
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<String>,

    /// Read plain lines without line editing or a history log.
    #[arg(long)]
    pub no_history: bool,

    /// Consecutive failures tolerated before the session ends.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_failures: Option<u32>,

    /// Prompt shown before each command. `{program}` is replaced.
    #[arg(long)]
    pub prompt: Option<String>,
}

impl Cli {
    /// Layers the flags that were given on top of `config`.
    pub fn apply_to(&self, config: &mut SupervisorConfig) {
        if let Some(program) = &self.program {
            config.program = program.clone();
        }
        if let Some(dir) = &self.backing_dir {
            config.backing_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.working_dir {
            config.working_dir = Some(dir.clone());
        }
        if self.no_history {
            config.history = false;
        }
        if let Some(max) = self.max_failures {
            config.max_failures = max;
        }
        if let Some(prompt) = &self.prompt {
            config.prompt = prompt.clone();
        }
    }
}
