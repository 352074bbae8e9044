//! Line-oriented console front end
//!
//! Lines starting with `:` are UI actions (choose persona, edit a step, ...);
//! every other line is typed into the chat box and goes through the command
//! dispatcher. Step and suggestion numbers are 1-based on screen.

use crate::document::{self, DocumentError, StepField};
use crate::persona;
use crate::protocol::Message;
use crate::runtime::{SessionError, SessionHandle};
use crate::state_machine::{Connectivity, SessionState};
use std::fmt::Write;
use thiserror::Error;

pub const DIRECTIVE_PREFIX: char = ':';

/// One parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Persona(String),
    Personas,
    Variant(String),
    Magic(String),
    Generate,
    /// Zero-based suggestion index
    Apply(usize),
    AddStep,
    EditStep {
        index: usize,
        field: StepField,
        value: String,
    },
    /// Replace the whole document buffer
    Edit(String),
    Show,
    Help,
    Quit,
    /// Chat text or slash command
    Input(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("Unknown directive :{0} (try :help)")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("{0:?} is not a position (positions start at 1)")]
    InvalidPosition(String),
    #[error(transparent)]
    Field(#[from] DocumentError),
}

pub const HELP: &str = "\
:persona <id>                     choose a persona (:personas lists them)
:variant <type>                   change the sequence variant
:magic <action>                   run a magic action on the sequence
:generate                         regenerate the sequence
:apply <n>                        apply suggestion n
:add-step                         append a follow-up step
:edit-step <n> <subject|body> <text>
:edit <text>                      replace the whole sequence text
:show                             print the sequence, metrics and suggestions
:quit
/adjust_tone <tone>, /summarize_context, anything else is chat";

/// Parse a 1-based position into an index
fn position(arg: &str) -> Result<usize, DirectiveError> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(DirectiveError::InvalidPosition(arg.to_string())),
    }
}

fn required<'a>(args: &'a str, usage: &'static str) -> Result<&'a str, DirectiveError> {
    if args.is_empty() {
        Err(DirectiveError::Usage(usage))
    } else {
        Ok(args)
    }
}

pub fn parse_line(line: &str) -> Result<Directive, DirectiveError> {
    let Some(rest) = line.trim().strip_prefix(DIRECTIVE_PREFIX) else {
        return Ok(Directive::Input(line.to_string()));
    };
    let (name, args) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(name, args)| (name, args.trim()));

    Ok(match name {
        "persona" => Directive::Persona(required(args, ":persona <id>")?.to_string()),
        "personas" => Directive::Personas,
        "variant" => Directive::Variant(required(args, ":variant <type>")?.to_string()),
        "magic" => Directive::Magic(required(args, ":magic <action>")?.to_string()),
        "generate" => Directive::Generate,
        "apply" => Directive::Apply(position(required(args, ":apply <n>")?)?),
        "add-step" => Directive::AddStep,
        "edit-step" => {
            const USAGE: &str = ":edit-step <n> <subject|body> <text>";
            let mut parts = args.splitn(3, char::is_whitespace);
            let (Some(n), Some(field), Some(value)) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(DirectiveError::Usage(USAGE));
            };
            Directive::EditStep {
                index: position(n)?,
                field: field.parse()?,
                value: value.trim().to_string(),
            }
        }
        "edit" => Directive::Edit(args.to_string()),
        "show" => Directive::Show,
        "help" => Directive::Help,
        "quit" | "q" => Directive::Quit,
        other => return Err(DirectiveError::Unknown(other.to_string())),
    })
}

/// What the driver should do after a directive ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Print(String),
    Quit,
}

pub async fn execute(handle: &SessionHandle, directive: Directive) -> Result<Outcome, SessionError> {
    match directive {
        Directive::Persona(id) => handle.choose_persona(id).await?,
        Directive::Variant(sequence_type) => handle.change_sequence_type(sequence_type).await?,
        Directive::Magic(action) => handle.magic_action(action).await?,
        Directive::Generate => handle.regenerate().await?,
        Directive::Apply(index) => handle.apply_suggestion(index).await?,
        Directive::AddStep => handle.add_step().await?,
        Directive::EditStep {
            index,
            field,
            value,
        } => handle.edit_step(index, field, value).await?,
        Directive::Edit(content) => handle.edit_document(content).await?,
        Directive::Input(text) => handle.send_input(text).await?,
        Directive::Personas => return Ok(Outcome::Print(render_personas())),
        Directive::Show => return Ok(Outcome::Print(render_document(&handle.state()))),
        Directive::Help => return Ok(Outcome::Print(HELP.to_string())),
        Directive::Quit => return Ok(Outcome::Quit),
    }
    Ok(Outcome::Continue)
}

// ============================================================================
// Rendering
// ============================================================================

pub fn render_message(message: &Message) -> String {
    format!("{}> {}", message.role, message.content)
}

pub fn render_personas() -> String {
    let mut out = String::new();
    for p in persona::all_personas() {
        let _ = writeln!(out, "{:<20} {} ({}, {})", p.id, p.name, p.tone, p.sequence_type);
    }
    out.trim_end().to_string()
}

pub fn render_connectivity(state: &SessionState) -> String {
    match (state.connectivity, &state.banner) {
        (_, Some(banner)) => banner.clone(),
        (Connectivity::Connected, None) => match &state.identity {
            Some(identity) => format!("Connected as {identity}"),
            None => "Connected".to_string(),
        },
        (Connectivity::Connecting, None) => "Connecting...".to_string(),
        (Connectivity::Disconnected, None) => "Disconnected".to_string(),
    }
}

/// Sequence, metrics and suggestions as plain text
pub fn render_document(state: &SessionState) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Persona: {} | tone: {} | variant: {}",
        state.persona.id, state.persona.tone, state.persona.sequence_type
    );

    let steps = state.steps();
    if steps.is_empty() {
        if state.document.trim().is_empty() {
            out.push_str("No sequence yet.\n");
        } else {
            let _ = writeln!(out, "Draft (not a step list):\n{}", state.document);
        }
    }
    for (index, step) in steps.iter().enumerate() {
        let _ = writeln!(out, "\n[{}] Day {}: {}", index + 1, document::day_of(index), step.subject);
        let _ = writeln!(out, "{}", step.body);
    }

    if let Some(metrics) = &state.metrics {
        let _ = writeln!(
            out,
            "\nOpen rate {:.0}% | response rate {:.0}% | sentiment {} | personalization {:.1} | quality {:.1}",
            metrics.open_rate * 100.0,
            metrics.response_rate * 100.0,
            metrics.sentiment,
            metrics.personalization_score,
            metrics.quality_score,
        );
    }
    if let Some(suggestions) = state.suggestions.as_ref().filter(|s| !s.is_empty()) {
        out.push_str("\nSuggestions:\n");
        for (i, suggestion) in suggestions.iter().enumerate() {
            let _ = writeln!(out, "  {}. {suggestion}", i + 1);
        }
    }
    out.trim_end().to_string()
}
