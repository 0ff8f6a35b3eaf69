// src/system/executor.rs

use crate::{CancellationToken, models::CommandEnv};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::Ordering;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};

/// How often a running child is checked against its cancellation token.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[cfg(unix)]
const SIGINT: i32 = 2;

/// `STATUS_CONTROL_C_EXIT` (`0xC000013A`), the exit code of a console process closed by Ctrl+C.
#[cfg(windows)]
const STATUS_CONTROL_C_EXIT: i32 = -1_073_741_510;

/// Whether the child ended because of the operator's Ctrl+C.
///
/// The terminal delivers the interrupt to the whole foreground process group,
/// so the child usually exits before the supervisor's own listener fires.
#[cfg(unix)]
fn interrupted_by_operator(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(SIGINT)
}

#[cfg(windows)]
fn interrupted_by_operator(status: &ExitStatus) -> bool {
    status.code() == Some(STATUS_CONTROL_C_EXIT)
}

#[cfg(not(any(unix, windows)))]
fn interrupted_by_operator(_status: &ExitStatus) -> bool {
    false
}

#[derive(Error, Debug)]
pub enum EngineError {
    /// The command asked to stop, observed its cancellation token, or was
    /// interrupted from the terminal.
    #[error("Command was stopped before it finished.")]
    Stopped,
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Program '{program}' could not be started")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Program '{program}' exited with a non-zero code ({code}).")]
    NonZeroExitStatus { program: String, code: i32 },
    #[error("Program '{program}' was terminated by a signal.")]
    Terminated { program: String },
    #[error("Lost track of program '{program}'")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// The wrapped command-line tool, invoked once per accepted line.
///
/// `argv[0]` is the program name placeholder. Implementations should check
/// `cancellation_token` at convenient points; the caller may also drop the
/// returned future at any `.await`.
#[async_trait]
pub trait CommandEngine: Send + Sync {
    async fn execute(
        &self,
        argv: &[String],
        env: &CommandEnv,
        cancellation_token: &CancellationToken,
    ) -> Result<(), EngineError>;
}

/// Returns `Err(EngineError::Stopped)` once cancellation has been requested.
pub fn check_for_cancellation(cancellation_token: &CancellationToken) -> Result<(), EngineError> {
    if cancellation_token.load(Ordering::Relaxed) {
        Err(EngineError::Stopped)
    } else {
        Ok(())
    }
}

/// Runs an external program with the tokenized arguments, inheriting the terminal.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    executable: PathBuf,
    cwd: Option<PathBuf>,
}

impl ProcessEngine {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            cwd: None,
        }
    }

    /// Runs every invocation inside `cwd` instead of the supervisor's own directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    fn build(&self, program: &Path, args: &[String], env: &CommandEnv) -> Command {
        let mut command = Command::new(program);
        command
            .args(args)
            .envs(env.iter())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(dunce::simplified(cwd));
        }
        command
    }

    fn spawn(&self, args: &[String], env: &CommandEnv) -> Result<Child, EngineError> {
        let program_name = self.executable.display().to_string();
        match self.build(&self.executable, args, env).spawn() {
            Ok(child) => Ok(child),
            // Built-ins like `echo` only exist inside `cmd.exe` on Windows.
            Err(e) if e.kind() == ErrorKind::NotFound && cfg!(target_os = "windows") => {
                log::debug!("Program '{}' not found. Retrying with cmd /C.", program_name);
                let mut cmd_args = vec!["/C".to_string(), program_name.clone()];
                cmd_args.extend_from_slice(args);
                self.build(Path::new("cmd"), &cmd_args, env)
                    .spawn()
                    .map_err(|source| EngineError::Spawn {
                        program: program_name,
                        source,
                    })
            }
            Err(source) => Err(EngineError::Spawn {
                program: program_name,
                source,
            }),
        }
    }
}

#[async_trait]
impl CommandEngine for ProcessEngine {
    async fn execute(
        &self,
        argv: &[String],
        env: &CommandEnv,
        cancellation_token: &CancellationToken,
    ) -> Result<(), EngineError> {
        if self.executable.as_os_str().is_empty() {
            return Err(EngineError::EmptyCommand);
        }
        check_for_cancellation(cancellation_token)?;

        let args = argv.get(1..).unwrap_or(&[]);
        let program = self.executable.display().to_string();
        let mut child = self.spawn(args, env)?;
        log::debug!("Spawned '{}' with {} argument(s), pid {:?}.", program, args.len(), child.id());

        loop {
            tokio::select! {
                status = child.wait() => {
                    let status = status.map_err(|source| EngineError::Wait {
                        program: program.clone(),
                        source,
                    })?;
                    if interrupted_by_operator(&status) {
                        log::debug!("'{}' was interrupted by the operator.", program);
                        return Err(EngineError::Stopped);
                    }
                    return match status.code() {
                        Some(0) => Ok(()),
                        Some(code) => Err(EngineError::NonZeroExitStatus { program, code }),
                        None => Err(EngineError::Terminated { program }),
                    };
                }
                () = tokio::time::sleep(CANCEL_POLL_INTERVAL) => {
                    if check_for_cancellation(cancellation_token).is_err() {
                        log::debug!("Cancellation requested, killing '{}' (pid {:?}).", program, child.id());
                        if let Err(e) = child.kill().await {
                            log::warn!("Failed to kill '{}': {}", program, e);
                        }
                        return Err(EngineError::Stopped);
                    }
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::time::Instant;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn token() -> CancellationToken {
        Arc::new(AtomicBool::new(false))
    }

    #[tokio::test]
    async fn test_successful_program() {
        let engine = ProcessEngine::new("sh");
        let result = engine
            .execute(&argv(&["sh", "-c", "exit 0"]), &CommandEnv::new(), &token())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_reported() {
        let engine = ProcessEngine::new("sh");
        let err = engine
            .execute(&argv(&["sh", "-c", "exit 3"]), &CommandEnv::new(), &token())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NonZeroExitStatus { code: 3, .. }));
    }

    #[tokio::test]
    async fn test_sigint_exit_is_a_stop_request() {
        let engine = ProcessEngine::new("sh");
        let err = engine
            .execute(&argv(&["sh", "-c", "kill -INT $$"]), &CommandEnv::new(), &token())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Stopped));
    }

    #[tokio::test]
    async fn test_other_signals_are_reported() {
        let engine = ProcessEngine::new("sh");
        let err = engine
            .execute(&argv(&["sh", "-c", "kill -TERM $$"]), &CommandEnv::new(), &token())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Terminated { .. }));
    }

    #[tokio::test]
    async fn test_environment_is_forwarded() {
        let engine = ProcessEngine::new("sh");
        let mut env = CommandEnv::new();
        env.set("COLUMNS", "132");
        let result = engine
            .execute(&argv(&["sh", "-c", "test \"$COLUMNS\" = 132"]), &env, &token())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_working_directory_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker"), "x").unwrap();
        let engine = ProcessEngine::new("sh").with_cwd(dir.path());
        let result = engine
            .execute(&argv(&["sh", "-c", "test -f marker"]), &CommandEnv::new(), &token())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_spawn() {
        let engine = ProcessEngine::new("definitely-not-a-real-program-4f1c");
        let err = engine
            .execute(&argv(&["x"]), &CommandEnv::new(), &token())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_kills_child() {
        let engine = ProcessEngine::new("sleep");
        let cancel = token();
        let flag = Arc::clone(&cancel);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            flag.store(true, Ordering::Relaxed);
        });

        let started = Instant::now();
        let err = engine
            .execute(&argv(&["sleep", "10"]), &CommandEnv::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Stopped));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_never_spawns() {
        let engine = ProcessEngine::new("definitely-not-a-real-program-4f1c");
        let cancel = token();
        cancel.store(true, Ordering::Relaxed);
        let err = engine
            .execute(&argv(&["x"]), &CommandEnv::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Stopped));
    }
}
