//! An interactive command-loop supervisor.
//!
//! `shellward` reads one command line at a time, runs it through a
//! [`system::executor::CommandEngine`] inside an [`core::scope::ExecutionScope`],
//! and keeps the session alive across failures until the consecutive-failure
//! budget is spent or input runs out.

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Cooperative cancellation flag handed to the command engine for each invocation.
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod state;
pub mod system;
