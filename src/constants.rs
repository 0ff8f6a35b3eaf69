// src/constants.rs

/// Number of consecutive ordinary failures after which the session gives up.
pub const MAX_FAILURES: u32 = 3;

/// The name of the per-application directory under the platform config/state roots.
pub const APP_DIR_NAME: &str = "shellward";

/// The name of the configuration file (in `~/.config/shellward/`).
pub const CONFIG_FILENAME: &str = "shellward.toml";

/// The name of the history log (in the platform state directory).
pub const HISTORY_FILENAME: &str = "shell-history";

/// Program name placed in `argv[0]` when none is configured.
pub const DEFAULT_PROGRAM: &str = "glasgow";

/// Prompt template; `{program}` is replaced with the configured program name.
pub const DEFAULT_PROMPT: &str = "\n> {program} ";

/// Styling directive handed to the engine's own output formatter.
pub const DEFAULT_COLORS: &str = "TRACE=37:INFO=1;37";

/// Environment variable carrying the terminal width.
pub const COLUMNS_VAR: &str = "COLUMNS";
