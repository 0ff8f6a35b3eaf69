// tests/supervisor.rs

use async_trait::async_trait;
use shellward::{
    CancellationToken,
    core::supervisor::{SessionEnd, Supervisor},
    models::{CommandEnv, SupervisorConfig},
    system::{
        executor::{CommandEngine, EngineError, ProcessEngine},
        host::{Host, HostError},
        input::{HistoryInput, HistoryLog, InputError, InputSource, LineEditor},
        sync::{PersistenceSync, SyncError},
    },
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Journal = Arc<Mutex<Vec<String>>>;

fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().unwrap().clone()
}

// --- Fakes ---

struct ScriptedInput {
    lines: VecDeque<Result<String, InputError>>,
}

impl ScriptedInput {
    fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| Ok(l.to_string())).collect(),
        }
    }

    fn from_results(lines: Vec<Result<String, InputError>>) -> Self {
        Self { lines: lines.into() }
    }
}

#[async_trait(?Send)]
impl InputSource for ScriptedInput {
    async fn next_line(&mut self, _prompt: &str) -> Result<String, InputError> {
        self.lines.pop_front().unwrap_or(Err(InputError::EndOfInput))
    }
}

/// Succeeds for every command except `badcmd`; `hang` waits forever.
struct FakeEngine {
    journal: Journal,
    envs: Arc<Mutex<Vec<CommandEnv>>>,
}

#[async_trait]
impl CommandEngine for FakeEngine {
    async fn execute(
        &self,
        argv: &[String],
        env: &CommandEnv,
        _cancellation_token: &CancellationToken,
    ) -> Result<(), EngineError> {
        self.journal.lock().unwrap().push(format!("run {}", argv.join(" ")));
        self.envs.lock().unwrap().push(env.clone());
        match argv.get(1).map(String::as_str) {
            Some("badcmd") => Err(EngineError::NonZeroExitStatus {
                program: "glasgow".to_string(),
                code: 2,
            }),
            Some("hang") => {
                std::future::pending::<()>().await;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

struct FakeSync {
    journal: Journal,
    fail_push: bool,
}

#[async_trait]
impl PersistenceSync for FakeSync {
    async fn pull(&self) -> Result<(), SyncError> {
        self.journal.lock().unwrap().push("pull".to_string());
        Ok(())
    }

    async fn push(&self) -> Result<(), SyncError> {
        self.journal.lock().unwrap().push("push".to_string());
        if self.fail_push {
            return Err(SyncError::MissingBacking("/srv/backing".into()));
        }
        Ok(())
    }
}

struct FakeHost {
    journal: Journal,
}

impl Host for FakeHost {
    fn execution_start(&self) -> Result<(), HostError> {
        self.journal.lock().unwrap().push("start".to_string());
        Ok(())
    }

    fn execution_end(&self) -> Result<(), HostError> {
        self.journal.lock().unwrap().push("end".to_string());
        Ok(())
    }

    fn terminal_columns(&self) -> Option<u16> {
        Some(132)
    }
}

struct Harness {
    journal: Journal,
    envs: Arc<Mutex<Vec<CommandEnv>>>,
    supervisor: Supervisor<Vec<u8>>,
}

impl Harness {
    fn new(input: impl InputSource + 'static) -> Self {
        Self::build(input, false)
    }

    fn build(input: impl InputSource + 'static, fail_push: bool) -> Self {
        let journal = Journal::default();
        let envs = Arc::new(Mutex::new(Vec::new()));
        let engine = FakeEngine {
            journal: Arc::clone(&journal),
            envs: Arc::clone(&envs),
        };
        let supervisor = Supervisor::new(&SupervisorConfig::default(), Box::new(input), Arc::new(engine))
            .with_sync(Arc::new(FakeSync {
                journal: Arc::clone(&journal),
                fail_push,
            }))
            .with_host(Arc::new(FakeHost {
                journal: Arc::clone(&journal),
            }))
            .with_error_stream(Vec::new());
        Self {
            journal,
            envs,
            supervisor,
        }
    }

    fn errors(&self) -> String {
        String::from_utf8_lossy(self.supervisor.error_stream()).into_owned()
    }

    fn runs(&self) -> Vec<String> {
        entries(&self.journal)
            .into_iter()
            .filter(|e| e.starts_with("run "))
            .collect()
    }
}

// --- Tests ---

#[tokio::test]
async fn test_successful_command_is_bracketed_and_silent() {
    let mut h = Harness::new(ScriptedInput::new(&["help"]));
    assert_eq!(h.supervisor.run().await.unwrap(), SessionEnd::EndOfInput);
    assert_eq!(entries(&h.journal), vec!["pull", "start", "run glasgow help", "end", "push"]);
    assert_eq!(h.supervisor.session().failures.count(), 0);
    assert!(h.errors().is_empty());
}

#[tokio::test]
async fn test_failure_is_reported_and_counted() {
    let mut h = Harness::new(ScriptedInput::new(&["badcmd"]));
    assert_eq!(h.supervisor.run().await.unwrap(), SessionEnd::EndOfInput);
    assert_eq!(h.supervisor.session().failures.count(), 1);
    let errors = h.errors();
    assert!(errors.contains("glasgow"));
    assert!(!errors.contains("Too many errors"));
}

#[tokio::test]
async fn test_three_failures_end_the_session() {
    let mut h = Harness::new(ScriptedInput::new(&["help", "badcmd", "badcmd", "badcmd", "help"]));
    assert_eq!(h.supervisor.run().await.unwrap(), SessionEnd::BudgetExhausted);
    assert_eq!(
        h.runs(),
        vec!["run glasgow help", "run glasgow badcmd", "run glasgow badcmd", "run glasgow badcmd"]
    );
    assert!(h.errors().ends_with("\nToo many errors, giving up.\n"));
}

#[tokio::test]
async fn test_success_resets_the_failure_count() {
    let mut h = Harness::new(ScriptedInput::new(&[
        "badcmd", "badcmd", "help", "badcmd", "badcmd",
    ]));
    assert_eq!(h.supervisor.run().await.unwrap(), SessionEnd::EndOfInput);
    assert_eq!(h.runs().len(), 5);
    assert_eq!(h.supervisor.session().failures.count(), 2);
}

#[tokio::test]
async fn test_interrupt_cancels_without_counting() {
    let mut h = Harness::new(ScriptedInput::new(&["badcmd", "hang", "badcmd"]));
    let slot = Arc::clone(h.supervisor.interrupts());
    let trigger = async move {
        while !slot.is_armed() || !slot.trigger() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };

    let (end, ()) = tokio::join!(h.supervisor.run(), trigger);
    assert_eq!(end.unwrap(), SessionEnd::EndOfInput);
    // Two failures around the cancellation, with no reset in between.
    assert_eq!(h.supervisor.session().failures.count(), 2);
    assert_eq!(
        entries(&h.journal)
            .iter()
            .filter(|e| *e == "end" || *e == "push")
            .count(),
        6
    );
    assert!(!h.supervisor.interrupts().is_armed());
}

#[tokio::test]
async fn test_interrupt_at_prompt_is_not_counted() {
    let input = ScriptedInput::from_results(vec![
        Ok("badcmd".to_string()),
        Err(InputError::Interrupted),
        Ok("badcmd".to_string()),
        Err(InputError::Interrupted),
        Ok("badcmd".to_string()),
    ]);
    let mut h = Harness::new(input);
    assert_eq!(h.supervisor.run().await.unwrap(), SessionEnd::BudgetExhausted);
    assert_eq!(h.runs().len(), 3);
}

#[tokio::test]
async fn test_unbalanced_quotes_count_as_failure() {
    let mut h = Harness::new(ScriptedInput::new(&["run 'uart"]));
    assert_eq!(h.supervisor.run().await.unwrap(), SessionEnd::EndOfInput);
    assert!(h.runs().is_empty());
    assert_eq!(h.supervisor.session().failures.count(), 1);
    assert!(h.errors().contains("run 'uart"));
}

#[tokio::test]
async fn test_failed_push_is_an_ordinary_failure() {
    let mut h = Harness::build(ScriptedInput::new(&["help", "help", "help"]), true);
    assert_eq!(h.supervisor.run().await.unwrap(), SessionEnd::BudgetExhausted);
    assert!(h.errors().contains("/srv/backing"));
}

#[tokio::test]
async fn test_engine_receives_terminal_width_and_colors() {
    let mut h = Harness::new(ScriptedInput::new(&["help"]));
    h.supervisor.run().await.unwrap();
    let envs = h.envs.lock().unwrap();
    let env = envs.first().unwrap();
    assert_eq!(env.get("COLUMNS"), Some("132"));
    assert_eq!(env.get("GLASGOW_COLORS"), Some("TRACE=37:INFO=1;37"));
}

#[tokio::test]
async fn test_empty_line_is_dispatched_with_program_only() {
    let mut h = Harness::new(ScriptedInput::new(&[""]));
    h.supervisor.run().await.unwrap();
    assert_eq!(h.runs(), vec!["run glasgow"]);
}

struct ScriptedEditor {
    lines: VecDeque<String>,
}

impl LineEditor for ScriptedEditor {
    fn read_line(&mut self, _prompt: &str) -> Result<String, InputError> {
        self.lines.pop_front().ok_or(InputError::EndOfInput)
    }

    fn remember(&mut self, _line: &str) {}
}

#[tokio::test]
async fn test_history_survives_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shell-history");

    let editor = ScriptedEditor {
        lines: VecDeque::from(["safe".to_string(), "badcmd \"x y\"".to_string()]),
    };
    let input = HistoryInput::with_editor(editor, HistoryLog::new(&path)).unwrap();
    let mut h = Harness::new(input);
    assert_eq!(h.supervisor.run().await.unwrap(), SessionEnd::EndOfInput);
    assert_eq!(h.runs(), vec!["run glasgow safe", "run glasgow badcmd x y"]);

    assert_eq!(HistoryLog::new(&path).load().unwrap(), vec!["safe", "badcmd \"x y\""]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_child_killed_by_sigint_is_not_counted() {
    let config = SupervisorConfig {
        program: "sh".to_string(),
        ..Default::default()
    };
    let journal = Journal::default();
    let input = ScriptedInput::new(&["-c 'kill -INT $$'", "-c 'kill -INT $$'", "-c 'kill -INT $$'"]);
    let mut supervisor = Supervisor::new(&config, Box::new(input), Arc::new(ProcessEngine::new("sh")))
        .with_host(Arc::new(FakeHost {
            journal: Arc::clone(&journal),
        }))
        .with_error_stream(Vec::new());

    assert_eq!(supervisor.run().await.unwrap(), SessionEnd::EndOfInput);
    assert_eq!(supervisor.session().failures.count(), 0);
    let errors = String::from_utf8_lossy(supervisor.error_stream()).into_owned();
    assert_eq!(errors, "\n\n\n");
    assert_eq!(entries(&journal).len(), 6);
}
