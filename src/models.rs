// src/models.rs

use crate::constants::{DEFAULT_COLORS, DEFAULT_PROGRAM, DEFAULT_PROMPT, HISTORY_FILENAME, MAX_FAILURES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// --- Per-iteration values ---

/// One accepted input line and the argument vector derived from it.
///
/// `argv[0]` is always the configured program name; the rest are the
/// shell-split words of `line`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    pub line: String,
    pub argv: Vec<String>,
}

impl CommandRecord {
    /// The words the operator actually typed, without the program placeholder.
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }
}

/// Environment variables handed to the command engine for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandEnv {
    vars: BTreeMap<String, String>,
}

impl CommandEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// --- Configuration ---

/// The deserialized form of `shellward.toml`.
///
/// Every field has a default, so a partial file (or none at all) is valid.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Program name used as `argv[0]` and, for `ProcessEngine`, the executable to spawn.
    pub program: String,
    /// Prompt template. `{program}` is substituted.
    pub prompt: String,
    /// Consecutive ordinary failures tolerated before giving up.
    pub max_failures: u32,
    /// Styling directive, `LEVEL=code:LEVEL=code`.
    pub colors: String,
    /// Variable name for `colors`. Derived from `program` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colors_var: Option<String>,
    /// Whether to use the history-aware line editor.
    pub history: bool,
    pub history_file: String,
    /// Backing store for the persistence mirror. No sync when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backing_dir: Option<String>,
    /// Working directory the engine runs in and the mirror syncs into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            max_failures: MAX_FAILURES,
            colors: DEFAULT_COLORS.to_string(),
            colors_var: None,
            history: true,
            history_file: HISTORY_FILENAME.to_string(),
            backing_dir: None,
            working_dir: None,
        }
    }
}

impl SupervisorConfig {
    /// The rendered prompt shown before each read.
    pub fn rendered_prompt(&self) -> String {
        self.prompt.replace("{program}", &self.program)
    }

    /// The variable the styling directive is exported under, e.g. `GLASGOW_COLORS`.
    pub fn colors_var_name(&self) -> String {
        if let Some(var) = &self.colors_var {
            return var.clone();
        }
        let stem: String = self
            .program
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}_COLORS", stem)
    }

    /// Resolved working directory, if configured.
    pub fn working_path(&self) -> Option<PathBuf> {
        self.working_dir.as_ref().map(PathBuf::from)
    }

    /// Resolved backing directory, if configured.
    pub fn backing_path(&self) -> Option<PathBuf> {
        self.backing_dir.as_ref().map(PathBuf::from)
    }
}
