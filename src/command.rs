//! User input classification
//!
//! Input starting with `/` is a command candidate. Recognized commands are
//! handled locally and never reach the conversation; anything else, including
//! an unrecognized command, is sent as a chat message.

use std::fmt;
use thiserror::Error;

pub const COMMAND_PREFIX: char = '/';

/// Commands resolved by a local handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalCommand {
    AdjustTone { tone: String },
    SummarizeContext,
}

impl LocalCommand {
    pub fn name(&self) -> &'static str {
        match self {
            LocalCommand::AdjustTone { .. } => "adjust_tone",
            LocalCommand::SummarizeContext => "summarize_context",
        }
    }
}

/// What a line of user input means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Command(LocalCommand),
    Chat(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Message is empty")]
    EmptyInput,
    #[error("/{command} needs an argument, e.g. /{command} {example}")]
    MissingArgument {
        command: &'static str,
        example: &'static str,
    },
}

/// A prefixed line split into command name and argument text
#[derive(Debug, PartialEq, Eq)]
struct CommandLine<'a> {
    command: &'a str,
    args: &'a str,
}

impl fmt::Display for CommandLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{COMMAND_PREFIX}{}", self.command)
    }
}

fn split_command(text: &str) -> Option<CommandLine<'_>> {
    let rest = text.strip_prefix(COMMAND_PREFIX)?;
    let (command, args) = match rest.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (rest, ""),
    };
    Some(CommandLine { command, args })
}

/// Classify one line of input.
pub fn classify(input: &str) -> Result<Intent, CommandError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(CommandError::EmptyInput);
    }

    if let Some(line) = split_command(text) {
        match line.command {
            "adjust_tone" => {
                if line.args.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "adjust_tone",
                        example: "casual",
                    });
                }
                return Ok(Intent::Command(LocalCommand::AdjustTone {
                    tone: line.args.to_string(),
                }));
            }
            "summarize_context" => {
                return Ok(Intent::Command(LocalCommand::SummarizeContext));
            }
            _ => {
                tracing::debug!(command = %line, "Unrecognized command, sending as chat");
            }
        }
    }

    Ok(Intent::Chat(text.to_string()))
}
