//! Wire contract for the event channel
//!
//! Every message on the channel is a [`Frame`]: an event name plus a JSON
//! payload. Outbound payloads are built by the emitter; inbound payloads are
//! decoded into the closed [`InboundEvent`] enum.

mod inbound;
mod outbound;

pub use inbound::{ContextSummary, InboundEvent, Metrics, SequenceUpdate};
pub use outbound::{
    ChatMessagePayload, GenerateSequencePayload, MagicActionPayload, Outbound, SequenceContext,
    SummarizeContextPayload, TestConnectionPayload,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Event names used on the channel
pub mod events {
    pub const CHAT_MESSAGE: &str = "chat_message";
    pub const SEQUENCE_UPDATE: &str = "sequence_update";
    pub const GENERATE_SEQUENCE: &str = "generate_sequence";
    pub const ADJUST_TONE: &str = "adjust_tone";
    pub const UPDATE_SEQUENCE_TYPE: &str = "update_sequence_type";
    pub const MAGIC_ACTION: &str = "magic_action";
    pub const SUMMARIZE_CONTEXT: &str = "summarize_context";
    pub const CONTEXT_SUMMARY: &str = "context_summary";
    pub const TEST_CONNECTION: &str = "test_connection";
    pub const TEST_RESPONSE: &str = "test_response";
}

/// One framed message on the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

/// A single conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
