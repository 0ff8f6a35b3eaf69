//! # System Interaction Layer
//!
//! Everything the supervisor talks to outside its own control logic.
//!
//! ## Modules
//!
//! - **`executor`**: the `CommandEngine` seam and `ProcessEngine`, which spawns the
//!   wrapped program with `tokio::process` and kills it on cancellation.
//! - **`host`**: start/end notifications, terminal width, and the Ctrl+C listener
//!   that feeds the interrupt slot.
//! - **`input`**: plain and history-aware line sources.
//! - **`sync`**: the pull/push persistence seam and a directory-mirror implementation.

pub mod executor;
pub mod host;
pub mod input;
pub mod sync;
