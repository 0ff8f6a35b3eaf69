// src/system/sync.rs

//! Persistence sync around each command.
//!
//! The execution scope calls [`PersistenceSync::pull`] before a command may
//! observe any state and [`PersistenceSync::push`] after it finishes.
//! [`MirrorSync`] implements both as a directory mirror between a backing
//! store and the working directory the engine runs in.

use async_trait::async_trait;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Filesystem error at '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to walk directory tree")]
    Walk(#[from] walkdir::Error),
    #[error("Path '{0}' escaped the directory being synced.")]
    OutsideRoot(PathBuf),
    #[error("Backing store '{0}' does not exist.")]
    MissingBacking(PathBuf),
    #[error("Sync task failed to complete")]
    Task(#[from] tokio::task::JoinError),
}

fn io_error(path: &Path) -> impl Fn(std::io::Error) -> SyncError + '_ {
    move |source| SyncError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// The backing persistence layer seen by the execution scope.
#[async_trait]
pub trait PersistenceSync: Send + Sync {
    /// Brings the working state up to date with the backing store.
    async fn pull(&self) -> Result<(), SyncError>;

    /// Writes the working state back to the backing store.
    async fn push(&self) -> Result<(), SyncError>;
}

/// Used when no backing store is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSync;

#[async_trait]
impl PersistenceSync for NoSync {
    async fn pull(&self) -> Result<(), SyncError> {
        Ok(())
    }

    async fn push(&self) -> Result<(), SyncError> {
        Ok(())
    }
}

/// What one mirror pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MirrorStats {
    pub copied: usize,
    pub unchanged: usize,
    pub removed: usize,
}

/// Mirrors a backing directory into a working directory and back.
#[derive(Debug, Clone)]
pub struct MirrorSync {
    backing: PathBuf,
    working: PathBuf,
}

impl MirrorSync {
    pub fn new(backing: impl Into<PathBuf>, working: impl Into<PathBuf>) -> Self {
        Self {
            backing: backing.into(),
            working: working.into(),
        }
    }

    /// Synchronous pull, backing → working.
    pub fn pull_blocking(&self) -> Result<MirrorStats, SyncError> {
        if !self.backing.is_dir() {
            return Err(SyncError::MissingBacking(self.backing.clone()));
        }
        mirror(&self.backing, &self.working)
    }

    /// Synchronous push, working → backing.
    pub fn push_blocking(&self) -> Result<MirrorStats, SyncError> {
        fs::create_dir_all(&self.working).map_err(io_error(&self.working))?;
        mirror(&self.working, &self.backing)
    }
}

#[async_trait]
impl PersistenceSync for MirrorSync {
    async fn pull(&self) -> Result<(), SyncError> {
        let this = self.clone();
        let stats = tokio::task::spawn_blocking(move || this.pull_blocking()).await??;
        log::debug!("Pulled from '{}': {:?}", self.backing.display(), stats);
        Ok(())
    }

    async fn push(&self) -> Result<(), SyncError> {
        let this = self.clone();
        let stats = tokio::task::spawn_blocking(move || this.push_blocking()).await??;
        log::debug!("Pushed to '{}': {:?}", self.backing.display(), stats);
        Ok(())
    }
}

/// Makes `to` an exact copy of `from`. Files whose content already matches
/// are left alone; entries missing from `from` are deleted from `to`.
fn mirror(from: &Path, to: &Path) -> Result<MirrorStats, SyncError> {
    let mut stats = MirrorStats::default();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    fs::create_dir_all(to).map_err(io_error(to))?;

    for entry in WalkDir::new(from).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|_| SyncError::OutsideRoot(entry.path().to_path_buf()))?
            .to_path_buf();
        let target = to.join(&relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_error(&target))?;
        } else if same_content(entry.path(), &target)? {
            stats.unchanged += 1;
        } else {
            if target.is_dir() {
                fs::remove_dir_all(&target).map_err(io_error(&target))?;
            }
            fs::copy(entry.path(), &target).map_err(io_error(&target))?;
            stats.copied += 1;
        }
        seen.insert(relative);
    }

    // Children are visited before their parents, so directories are empty when removed.
    for entry in WalkDir::new(to).min_depth(1).contents_first(true) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(to)
            .map_err(|_| SyncError::OutsideRoot(entry.path().to_path_buf()))?;
        if seen.contains(relative) {
            continue;
        }
        if entry.file_type().is_dir() {
            fs::remove_dir(entry.path()).map_err(io_error(entry.path()))?;
        } else {
            fs::remove_file(entry.path()).map_err(io_error(entry.path()))?;
        }
        stats.removed += 1;
    }

    Ok(stats)
}

fn same_content(source: &Path, target: &Path) -> Result<bool, SyncError> {
    let target_meta = match fs::metadata(target) {
        Ok(meta) if meta.is_file() => meta,
        _ => return Ok(false),
    };
    let source_meta = fs::metadata(source).map_err(io_error(source))?;
    if source_meta.len() != target_meta.len() {
        return Ok(false);
    }
    Ok(content_hash(source)? == content_hash(target)?)
}

fn content_hash(path: &Path) -> Result<String, SyncError> {
    let content = fs::read(path).map_err(io_error(path))?;
    Ok(hex::encode(blake3::hash(&content).as_bytes()))
}
