//! Outreach sequence document model
//!
//! The document is a free-text buffer that logically holds an ordered list of
//! steps encoded as JSON, optionally wrapped in a fenced code block. Parsing is
//! lenient: the buffer doubles as a scratchpad while the user types, so any
//! decode failure yields an empty step list instead of an error.
//!
//! Every structural edit goes through parse -> mutate -> serialize; nothing
//! string-patches the buffer.

#[cfg(test)]
mod proptests;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One outreach message. Position in the list is its identity and its day offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub subject: String,
    pub body: String,
}

impl Step {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Implicit send day for the step at `index` (step 0 goes out on day 1).
pub fn day_of(index: usize) -> usize {
    index + 1
}

/// Editable field of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepField {
    Subject,
    Body,
}

impl fmt::Display for StepField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepField::Subject => f.write_str("subject"),
            StepField::Body => f.write_str("body"),
        }
    }
}

impl FromStr for StepField {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subject" => Ok(StepField::Subject),
            "body" => Ok(StepField::Body),
            other => Err(DocumentError::UnknownField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Step {index} does not exist (sequence has {len} steps)")]
    StepOutOfRange { index: usize, len: usize },
    #[error("Unknown step field: {0} (expected subject or body)")]
    UnknownField(String),
}

const FENCE: &str = "```";

/// Greeting used for steps appended by [`add_step`]
pub const FOLLOW_UP_BODY: &str = "Hi [Candidate Name],\n\n\
I wanted to follow up on my previous note. I'd love to hear whether this \
opportunity sounds interesting to you.\n\n\
Best regards,\n[Your Name]";

/// Decode the step list from a document buffer.
///
/// Accepts bare JSON or JSON inside a fenced block (with or without an info
/// string such as `json`). Anything that does not decode to an array of
/// `{subject, body}` objects yields an empty list.
pub fn parse(text: &str) -> Vec<Step> {
    let payload = strip_fence(text);
    if payload.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<Step>>(payload) {
        Ok(steps) => steps,
        Err(e) => {
            tracing::debug!(error = %e, len = text.len(), "Document is not a step list");
            Vec::new()
        }
    }
}

/// Encode steps as the canonical document text.
pub fn serialize(steps: &[Step]) -> String {
    // Vec<Step> with String fields cannot fail to serialize
    serde_json::to_string_pretty(steps).unwrap_or_else(|_| "[]".to_string())
}

/// Append a placeholder follow-up step.
pub fn add_step(steps: &[Step]) -> Vec<Step> {
    let mut next = steps.to_vec();
    let position = next.len() + 1;
    next.push(Step::new(format!("Follow-up {position}"), FOLLOW_UP_BODY));
    next
}

/// Replace one field of one step in place.
pub fn edit_step(
    steps: &[Step],
    index: usize,
    field: StepField,
    value: impl Into<String>,
) -> Result<Vec<Step>, DocumentError> {
    let mut next = steps.to_vec();
    let len = next.len();
    let step = next
        .get_mut(index)
        .ok_or(DocumentError::StepOutOfRange { index, len })?;
    match field {
        StepField::Subject => step.subject = value.into(),
        StepField::Body => step.body = value.into(),
    }
    Ok(next)
}

fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") that shares the opening fence line
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => "",
    };
    body.trim_end()
        .strip_suffix(FENCE)
        .unwrap_or(body)
        .trim()
}
