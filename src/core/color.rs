// src/core/color.rs

use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ENTRY_RE: Regex =
        Regex::new(r"^(?P<level>[A-Z][A-Z0-9_]*)=(?P<code>[0-9]+(?:;[0-9]+)*)$").expect("static regex");
}

/// One `LEVEL=code` entry of a styling directive, e.g. `INFO=1;37`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelStyle {
    /// Upper-case level name, e.g. `TRACE`.
    pub level: String,
    /// SGR parameters, without the `ESC[` prefix or the trailing `m`.
    pub code: String,
}

/// Parses a directive such as `TRACE=37:INFO=1;37`.
///
/// An empty directive is valid and means "no styling overrides".
pub fn parse_directive(directive: &str) -> Result<Vec<LevelStyle>> {
    if directive.trim().is_empty() {
        return Ok(Vec::new());
    }
    directive
        .split(':')
        .map(|entry| -> Result<LevelStyle> {
            let caps = ENTRY_RE
                .captures(entry.trim())
                .ok_or_else(|| anyhow!(t!("config.error.bad_colors"), directive = directive))?;
            let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string()).unwrap_or_default();
            Ok(LevelStyle {
                level: group("level"),
                code: group("code"),
            })
        })
        .collect()
}
