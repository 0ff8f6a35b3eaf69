// src/core/paths.rs

use crate::constants::{APP_DIR_NAME, CONFIG_FILENAME};
use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

lazy_static! {
    static ref CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not find a directory for persistent state.")]
    StateDirNotFound,
    #[error("Could not create directory at '{path}': {source}")]
    DirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn ensure_dir(path: &Path) -> Result<(), PathError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| PathError::DirCreation {
            path: path.display().to_string(),
            source: e,
        })?;
    }
    Ok(())
}

/// Returns `~/.config/shellward` (or the platform equivalent), creating it if needed.
///
/// Memoized: only the first call touches the filesystem.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    let mut cached = CONFIG_DIR.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(path) = &*cached {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join(APP_DIR_NAME);
    ensure_dir(&config_path)?;

    *cached = Some(config_path.clone());
    Ok(config_path)
}

/// Returns the default location of `shellward.toml`.
pub fn get_config_path() -> Result<PathBuf, PathError> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Returns the per-application state directory, creating it if needed.
///
/// Uses the XDG state directory where the platform has one and falls back to
/// the local data directory elsewhere (macOS, Windows).
pub fn get_state_dir() -> Result<PathBuf, PathError> {
    let state_path = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .ok_or(PathError::StateDirNotFound)?
        .join(APP_DIR_NAME);
    ensure_dir(&state_path)?;
    Ok(state_path)
}

/// Resolves the history log path. Absolute names are used as-is; anything
/// else lives in the state directory.
pub fn get_history_path(file_name: &str) -> Result<PathBuf> {
    let expanded = expand_path(file_name)?;
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    Ok(get_state_dir()?.join(expanded))
}

/// Expands `~` and `$VAR` / `${VAR}` in a path setting.
pub fn expand_path(template: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(template)
        .map_err(|e| anyhow!("Failed to expand path '{}': {}", template, e))?;
    Ok(PathBuf::from(expanded.into_owned()))
}
