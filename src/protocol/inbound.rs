//! Inbound event decoding
//!
//! Payloads arrive as untyped JSON. Decoding maps each known event name onto a
//! typed variant; anything else (unknown name, wrong shape) becomes
//! [`InboundEvent::Unknown`] so the router can log and drop it.

use super::{events, Frame, Message};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::Write;

/// Generation analytics attached to a `sequence_update`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metrics {
    pub open_rate: f64,
    pub response_rate: f64,
    #[serde(deserialize_with = "text_or_number")]
    pub sentiment: String,
    pub personalization_score: f64,
    pub quality_score: f64,
}

/// Server push replacing the document and its derived state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceUpdate {
    pub content: String,
    #[serde(default)]
    pub metrics: Option<Metrics>,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
    /// Echo of the request that produced this update, if the server sends it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

/// Structured summary of the role discussed so far
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSummary {
    pub role: String,
    pub company_type: String,
    #[serde(deserialize_with = "text_or_list")]
    pub key_requirements: Vec<String>,
    pub location: String,
    #[serde(deserialize_with = "text_or_list")]
    pub unique_selling_points: Vec<String>,
}

impl ContextSummary {
    /// Render as the text of one assistant message
    pub fn render(&self) -> String {
        let mut out = String::from("Here's a summary of the role so far:\n");
        let _ = writeln!(out, "- Role: {}", or_unspecified(&self.role));
        let _ = writeln!(out, "- Company type: {}", or_unspecified(&self.company_type));
        let _ = writeln!(out, "- Location: {}", or_unspecified(&self.location));
        render_list(&mut out, "Key requirements", &self.key_requirements);
        render_list(&mut out, "Unique selling points", &self.unique_selling_points);
        out.trim_end().to_string()
    }
}

fn or_unspecified(value: &str) -> &str {
    if value.trim().is_empty() {
        "Not specified"
    } else {
        value
    }
}

fn render_list(out: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        let _ = writeln!(out, "- {label}: Not specified");
        return;
    }
    let _ = writeln!(out, "- {label}:");
    for item in items {
        let _ = writeln!(out, "  - {item}");
    }
}

/// Closed set of events the server can push
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    ChatMessage(Message),
    SequenceUpdate(SequenceUpdate),
    ContextSummary(ContextSummary),
    TestResponse(Value),
    /// Unrecognized event name or payload that failed to decode
    Unknown { event: String, reason: String },
}

impl InboundEvent {
    pub fn from_frame(frame: Frame) -> Self {
        Self::decode(&frame.event, frame.data)
    }

    /// Decode from event name and JSON payload
    pub fn decode(event: &str, data: Value) -> Self {
        let unknown = |e: serde_json::Error| InboundEvent::Unknown {
            event: event.to_string(),
            reason: e.to_string(),
        };
        match event {
            events::CHAT_MESSAGE => serde_json::from_value(data)
                .map_or_else(unknown, InboundEvent::ChatMessage),
            events::SEQUENCE_UPDATE => serde_json::from_value(data)
                .map_or_else(unknown, InboundEvent::SequenceUpdate),
            events::CONTEXT_SUMMARY => serde_json::from_value(data)
                .map_or_else(unknown, InboundEvent::ContextSummary),
            events::TEST_RESPONSE => InboundEvent::TestResponse(data),
            _ => InboundEvent::Unknown {
                event: event.to_string(),
                reason: "unrecognized event name".to_string(),
            },
        }
    }

    pub fn event_name(&self) -> &str {
        match self {
            InboundEvent::ChatMessage(_) => events::CHAT_MESSAGE,
            InboundEvent::SequenceUpdate(_) => events::SEQUENCE_UPDATE,
            InboundEvent::ContextSummary(_) => events::CONTEXT_SUMMARY,
            InboundEvent::TestResponse(_) => events::TEST_RESPONSE,
            InboundEvent::Unknown { event, .. } => event,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

fn text_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<TextOrList>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(TextOrList::Text(text)) if text.trim().is_empty() => Vec::new(),
        Some(TextOrList::Text(text)) => vec![text],
        Some(TextOrList::List(items)) => items,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Number(f64),
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<TextOrNumber>::deserialize(deserializer)? {
        None => String::new(),
        Some(TextOrNumber::Text(text)) => text,
        Some(TextOrNumber::Number(n)) => n.to_string(),
    })
}
