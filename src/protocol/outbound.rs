//! Outbound request envelopes
//!
//! The service keeps no state between requests, so every envelope carries the
//! full context it needs: document text, tone, variant and conversation.

use super::{events, Frame, Message};
use serde::Serialize;
use serde_json::Value;

/// `chat_message`: ask for the next assistant turn
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessagePayload {
    pub message: String,
    pub messages: Vec<Message>,
    pub persona: String,
}

/// Shared payload of `sequence_update`, `adjust_tone` and `update_sequence_type`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceContext {
    pub content: String,
    pub tone: String,
    pub sequence_type: String,
    pub role_info: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

/// `magic_action`: run a named transform over the document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicActionPayload {
    pub content: String,
    pub action: String,
    /// Set when the action applies one of the server's suggestions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub tone: String,
    pub sequence_type: String,
    pub role_info: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

/// `generate_sequence`: regenerate the whole document from the conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSequencePayload {
    pub messages: Vec<Message>,
    pub tone: String,
    pub sequence_type: String,
    pub persona: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

/// `summarize_context`: ask for a structured role summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummarizeContextPayload {
    pub messages: Vec<Message>,
    pub persona: String,
}

/// `test_connection`: liveness probe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestConnectionPayload {
    pub message: String,
}

/// Every request the client can put on the channel
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    ChatMessage(ChatMessagePayload),
    SequenceUpdate(SequenceContext),
    GenerateSequence(GenerateSequencePayload),
    AdjustTone(SequenceContext),
    UpdateSequenceType(SequenceContext),
    MagicAction(MagicActionPayload),
    SummarizeContext(SummarizeContextPayload),
    TestConnection(TestConnectionPayload),
}

impl Outbound {
    pub fn probe() -> Self {
        Outbound::TestConnection(TestConnectionPayload {
            message: "Test connection".to_string(),
        })
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Outbound::ChatMessage(_) => events::CHAT_MESSAGE,
            Outbound::SequenceUpdate(_) => events::SEQUENCE_UPDATE,
            Outbound::GenerateSequence(_) => events::GENERATE_SEQUENCE,
            Outbound::AdjustTone(_) => events::ADJUST_TONE,
            Outbound::UpdateSequenceType(_) => events::UPDATE_SEQUENCE_TYPE,
            Outbound::MagicAction(_) => events::MAGIC_ACTION,
            Outbound::SummarizeContext(_) => events::SUMMARIZE_CONTEXT,
            Outbound::TestConnection(_) => events::TEST_CONNECTION,
        }
    }

    /// Request id for envelopes whose answer is a `sequence_update`
    pub fn request_id(&self) -> Option<u64> {
        match self {
            Outbound::SequenceUpdate(ctx)
            | Outbound::AdjustTone(ctx)
            | Outbound::UpdateSequenceType(ctx) => ctx.request_id,
            Outbound::MagicAction(p) => p.request_id,
            Outbound::GenerateSequence(p) => p.request_id,
            Outbound::ChatMessage(_)
            | Outbound::SummarizeContext(_)
            | Outbound::TestConnection(_) => None,
        }
    }

    pub fn payload(&self) -> Value {
        let value = match self {
            Outbound::ChatMessage(p) => serde_json::to_value(p),
            Outbound::SequenceUpdate(p)
            | Outbound::AdjustTone(p)
            | Outbound::UpdateSequenceType(p) => serde_json::to_value(p),
            Outbound::GenerateSequence(p) => serde_json::to_value(p),
            Outbound::MagicAction(p) => serde_json::to_value(p),
            Outbound::SummarizeContext(p) => serde_json::to_value(p),
            Outbound::TestConnection(p) => serde_json::to_value(p),
        };
        value.unwrap_or(Value::Null)
    }

    pub fn to_frame(&self) -> Frame {
        Frame::new(self.event_name(), self.payload())
    }
}
