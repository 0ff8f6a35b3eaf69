//! # Config Loader
//!
//! Loads `shellward.toml`, writing a default file on first run, and validates
//! the settings that would otherwise only fail once a command runs.
use crate::{
    core::{color, paths},
    models::SupervisorConfig,
};
use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};

/// The outcome of [`load_or_create`].
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: SupervisorConfig,
    pub path: PathBuf,
    /// `true` when the file did not exist and defaults were written.
    pub created: bool,
}

/// Loads the config at `path`, or at the default location when `None`.
///
/// A missing file is created with the default settings, the same way a
/// first run would find it.
pub fn load_or_create(path: Option<&Path>) -> Result<LoadedConfig> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => paths::get_config_path()?,
    };

    if !path.exists() {
        let config = SupervisorConfig::default();
        write_config(&path, &config)?;
        log::debug!("Wrote default config to '{}'.", path.display());
        return Ok(LoadedConfig {
            config,
            path,
            created: true,
        });
    }

    let config = load_config(&path)?;
    Ok(LoadedConfig {
        config,
        path,
        created: false,
    })
}

/// Parses and validates an existing config file.
pub fn load_config(path: &Path) -> Result<SupervisorConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    let config: SupervisorConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))?;
    validate(&config)?;
    Ok(config)
}

pub fn write_config(path: &Path, config: &SupervisorConfig) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory '{}'", parent.display()))?;
    }
    let toml_string = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, toml_string)
        .with_context(|| format!("Failed to write config file '{}'", path.display()))
}

/// Rejects settings the supervisor cannot honour.
pub fn validate(config: &SupervisorConfig) -> Result<()> {
    if config.max_failures == 0 {
        return Err(anyhow!(t!("config.error.zero_failures")));
    }
    if config.program.trim().is_empty() {
        return Err(anyhow!("'program' must not be empty."));
    }
    if config.backing_dir.is_some() && config.working_dir.is_none() {
        return Err(anyhow!(t!("config.error.backing_without_working")));
    }
    color::parse_directive(&config.colors)?;
    Ok(())
}

/// Expands `~` and environment variables in the directory settings.
pub fn expand_dirs(config: &mut SupervisorConfig) -> Result<()> {
    for dir in [&mut config.backing_dir, &mut config.working_dir].into_iter().flatten() {
        *dir = paths::expand_path(dir)?.display().to_string();
    }
    Ok(())
}
