//! Events that drive the session

use crate::connection::Lifecycle;
use crate::document::StepField;
use crate::protocol::InboundEvent;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User events
    ChoosePersona {
        id: String,
    },
    /// A line typed into the chat box, command or not
    UserInput {
        text: String,
    },
    ChangeTone {
        tone: String,
    },
    ChangeSequenceType {
        sequence_type: String,
    },
    MagicAction {
        action: String,
    },
    /// The whole document buffer as the user left it
    EditDocument {
        content: String,
    },
    AddStep,
    EditStep {
        index: usize,
        field: StepField,
        value: String,
    },
    RegenerateSequence,
    ApplySuggestion {
        index: usize,
    },
    SummarizeContext,

    // Channel events
    Inbound(InboundEvent),
    Lifecycle(Lifecycle),
}

impl Event {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Event::ChoosePersona { .. } => "choose_persona",
            Event::UserInput { .. } => "user_input",
            Event::ChangeTone { .. } => "change_tone",
            Event::ChangeSequenceType { .. } => "change_sequence_type",
            Event::MagicAction { .. } => "magic_action",
            Event::EditDocument { .. } => "edit_document",
            Event::AddStep => "add_step",
            Event::EditStep { .. } => "edit_step",
            Event::RegenerateSequence => "regenerate_sequence",
            Event::ApplySuggestion { .. } => "apply_suggestion",
            Event::SummarizeContext => "summarize_context",
            Event::Inbound(_) => "inbound",
            Event::Lifecycle(_) => "lifecycle",
        }
    }
}
