//! Outbound action emitter
//!
//! Turns a user action into a self-contained request envelope built from the
//! session as it stands after the local mutation. Every request takes a
//! session-unique id; requests whose answer is a `sequence_update` put that
//! id on the wire and join the pending queue so the answer can be matched
//! against later local edits. Chat and document requests also become the
//! fallback origin for pushes that echo no id.

use crate::protocol::{
    ChatMessagePayload, GenerateSequencePayload, MagicActionPayload, Outbound, SequenceContext,
    SummarizeContextPayload,
};
use crate::state_machine::{SessionState, TransitionError};

/// `magic_action` name used when applying a server suggestion
pub const APPLY_SUGGESTION: &str = "apply_suggestion";

/// What the user asked to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SendMessage { message: String },
    ChangeTone,
    ChangeVariant,
    Magic { action: String },
    /// Echo of a local document edit
    EditDocument,
    Regenerate,
    ApplySuggestion { suggestion: String },
    Summarize,
}

impl Action {
    /// Whether the request carries its id so a server can echo it back
    fn carries_request_id(&self) -> bool {
        !matches!(self, Action::SendMessage { .. } | Action::Summarize)
    }

    /// Whether the server answers this request with a `sequence_update`
    fn expects_update(&self) -> bool {
        self.carries_request_id() && !matches!(self, Action::EditDocument)
    }

    /// Whether the server may push a `sequence_update` because of this
    /// request, answered or not. Chat counts: the server regenerates after
    /// enough conversation.
    fn may_trigger_update(&self) -> bool {
        !matches!(self, Action::EditDocument | Action::Summarize)
    }
}

/// Refuse to build anything while the channel is down
pub fn ensure_connected(state: &SessionState) -> Result<(), TransitionError> {
    if state.is_connected() {
        Ok(())
    } else {
        Err(TransitionError::NotConnected)
    }
}

fn sequence_context(state: &SessionState, request_id: Option<u64>) -> SequenceContext {
    SequenceContext {
        content: state.document.clone(),
        tone: state.persona.tone.clone(),
        sequence_type: state.persona.sequence_type.clone(),
        role_info: state.conversation.clone(),
        request_id,
    }
}

fn magic(
    state: &SessionState,
    action: String,
    suggestion: Option<String>,
    request_id: Option<u64>,
) -> MagicActionPayload {
    MagicActionPayload {
        content: state.document.clone(),
        action,
        suggestion,
        tone: state.persona.tone.clone(),
        sequence_type: state.persona.sequence_type.clone(),
        role_info: state.conversation.clone(),
        request_id,
    }
}

/// Build the envelope for `action` and record it as issued.
///
/// Connectivity is the caller's concern; see [`ensure_connected`].
pub fn issue(state: &mut SessionState, action: Action) -> Outbound {
    let id = state.allocate_request_id();
    let request_id = action.carries_request_id().then_some(id);
    if action.expects_update() {
        state.pending.push_back(id);
    }
    if action.may_trigger_update() {
        state.last_trigger_id = id;
    }

    let request = match action {
        Action::SendMessage { message } => Outbound::ChatMessage(ChatMessagePayload {
            message,
            messages: state.conversation.clone(),
            persona: state.persona.id.clone(),
        }),
        Action::ChangeTone => Outbound::AdjustTone(sequence_context(state, request_id)),
        Action::ChangeVariant => {
            Outbound::UpdateSequenceType(sequence_context(state, request_id))
        }
        Action::EditDocument => Outbound::SequenceUpdate(sequence_context(state, request_id)),
        Action::Magic { action } => Outbound::MagicAction(magic(state, action, None, request_id)),
        Action::ApplySuggestion { suggestion } => Outbound::MagicAction(magic(
            state,
            APPLY_SUGGESTION.to_string(),
            Some(suggestion),
            request_id,
        )),
        Action::Regenerate => Outbound::GenerateSequence(GenerateSequencePayload {
            messages: state.conversation.clone(),
            tone: state.persona.tone.clone(),
            sequence_type: state.persona.sequence_type.clone(),
            persona: state.persona.id.clone(),
            request_id,
        }),
        Action::Summarize => Outbound::SummarizeContext(SummarizeContextPayload {
            messages: state.conversation.clone(),
            persona: state.persona.id.clone(),
        }),
    };

    tracing::debug!(
        event = request.event_name(),
        id,
        pending = state.pending.len(),
        "Issued request"
    );
    request
}
