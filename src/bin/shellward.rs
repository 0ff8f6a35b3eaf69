// src/bin/shellward.rs

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use shellward::{
    cli::Cli,
    core::{
        config_loader,
        interrupt::InterruptSlot,
        paths,
        supervisor::{SessionEnd, Supervisor},
    },
    models::SupervisorConfig,
    system::{
        executor::ProcessEngine,
        host::{self, TerminalHost},
        input::{HistoryInput, InputSource, PlainInput},
        sync::{MirrorSync, NoSync, PersistenceSync},
    },
    t,
};
use std::fs;
use std::sync::Arc;

/// Sets up logging, loads the configuration, and hands control to the supervisor.
///
/// Exit codes: `0` when input ends, `1` when the failure budget is exhausted
/// or the session could not be set up.
fn main() {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(SessionEnd::EndOfInput) => {}
        Ok(SessionEnd::BudgetExhausted) => std::process::exit(1),
        Err(e) => {
            eprintln!("\n{}: {:?}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<SessionEnd> {
    log::debug!("CLI args parsed: {:?}", cli);

    let loaded = config_loader::load_or_create(cli.config.as_deref())?;
    if loaded.created {
        eprintln!(
            "{}",
            format!(t!("config.info.created"), path = loaded.path.display()).dimmed()
        );
    }

    let mut config = loaded.config;
    cli.apply_to(&mut config);
    config_loader::validate(&config)?;
    config_loader::expand_dirs(&mut config)?;
    log::debug!("Effective config: {:?}", config);

    // One session, one thread: the command race never needs a second worker.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(supervise(config))
}

async fn supervise(config: SupervisorConfig) -> Result<SessionEnd> {
    let interrupts = InterruptSlot::new();
    let _listener = host::listen_for_interrupts(Arc::clone(&interrupts));

    let input: Box<dyn InputSource> = if config.history {
        let history_path = paths::get_history_path(&config.history_file)?;
        log::debug!("History log: '{}'", history_path.display());
        Box::new(HistoryInput::open(history_path)?)
    } else {
        Box::new(PlainInput::stdio())
    };

    let mut engine = ProcessEngine::new(&config.program);
    if let Some(working) = config.working_path() {
        fs::create_dir_all(&working)
            .with_context(|| format!("Failed to create working directory '{}'", working.display()))?;
        engine = engine.with_cwd(working);
    }

    let sync: Arc<dyn PersistenceSync> = match (config.backing_path(), config.working_path()) {
        (Some(backing), Some(working)) => {
            fs::create_dir_all(&backing)
                .with_context(|| format!("Failed to create backing store '{}'", backing.display()))?;
            Arc::new(MirrorSync::new(backing, working))
        }
        _ => Arc::new(NoSync),
    };

    println!(t!("shell.info.banner"), program = config.program);

    let mut supervisor = Supervisor::new(&config, input, Arc::new(engine))
        .with_sync(sync)
        .with_host(Arc::new(TerminalHost))
        .with_interrupts(interrupts);
    Ok(supervisor.run().await?)
}
