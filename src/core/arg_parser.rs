// src/core/arg_parser.rs

use crate::models::CommandRecord;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// An unterminated quote or a trailing escape.
    #[error("Command line could not be split into words: {line}")]
    Unbalanced { line: String },
}

/// Splits a raw line with POSIX shell-word rules and prefixes the program name.
///
/// Quoting and backslash escapes follow `sh`. Whitespace-only input yields a
/// record whose `argv` holds only the program name; the engine decides what
/// an empty invocation means.
pub fn parse_command_line(line: &str, program: &str) -> Result<CommandRecord, TokenizeError> {
    let words = shlex::split(line).ok_or_else(|| TokenizeError::Unbalanced {
        line: line.to_string(),
    })?;

    let mut argv = Vec::with_capacity(words.len() + 1);
    argv.push(program.to_string());
    argv.extend(words);

    Ok(CommandRecord {
        line: line.to_string(),
        argv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        let record = parse_command_line("run uart --baud 115200", "glasgow").unwrap();
        assert_eq!(record.argv, vec!["glasgow", "run", "uart", "--baud", "115200"]);
        assert_eq!(record.line, "run uart --baud 115200");
    }

    #[test]
    fn test_quotes_and_escapes() {
        let record = parse_command_line(r#"say "hello world" it\'s 'a b'"#, "tool").unwrap();
        assert_eq!(record.args(), &["say", "hello world", "it's", "a b"]);
    }

    #[test]
    fn test_empty_line_keeps_program_only() {
        let record = parse_command_line("   ", "glasgow").unwrap();
        assert_eq!(record.argv, vec!["glasgow"]);
        assert!(record.args().is_empty());
    }

    #[test]
    fn test_unbalanced_quote_is_an_error() {
        let err = parse_command_line("echo \"oops", "glasgow").unwrap_err();
        assert_eq!(
            err,
            TokenizeError::Unbalanced {
                line: "echo \"oops".to_string()
            }
        );
    }
}
