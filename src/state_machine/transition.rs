//! Pure state transition function

use super::state::{Connectivity, Phase, PersonaConfig};
use super::{Effect, Event, SessionState};
use crate::command::{self, CommandError, Intent, LocalCommand};
use crate::connection::Lifecycle;
use crate::document::{self, DocumentError};
use crate::emitter::{self, Action};
use crate::persona;
use crate::protocol::{InboundEvent, Message, SequenceUpdate};
use thiserror::Error;

/// Banner shown after a failed connection attempt
pub const CONNECT_ERROR_BANNER: &str = "Connection error. Retrying...";
/// Banner shown after an established connection drops
pub const DISCONNECTED_BANNER: &str = "Disconnected from server. Attempting to reconnect...";
/// Banner shown once the channel has been closed for good
pub const CLOSED_BANNER: &str = "Connection closed.";
/// Notice for local edits made while offline
pub const OFFLINE_EDIT_NOTICE: &str =
    "Not connected to server. Your edit is kept locally and will be sent with your next change.";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Not connected to server. Please wait for reconnection.")]
    NotConnected,
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("Choose a persona first")]
    NoPersona,
    #[error("Unknown persona: {0}")]
    UnknownPersona(String),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("No suggestion at position {index}")]
    UnknownSuggestion { index: usize },
}

/// Pure transition function
///
/// Given the same state and event it always produces the same result; I/O
/// happens only when the runtime executes the returned effects. On error the
/// state is unchanged and nothing is sent.
pub fn transition(state: &SessionState, event: Event) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // Persona
        // ============================================================
        Event::ChoosePersona { id } => {
            let persona = persona::find(&id).ok_or(TransitionError::UnknownPersona(id))?;
            let mut next = state.clone();
            next.phase = Phase::Active;
            next.persona = PersonaConfig::from_persona(persona);
            next.conversation = vec![Message::assistant(persona.greeting)];
            next.metrics = None;
            next.suggestions = None;
            Ok(TransitionResult::new(next))
        }

        // ============================================================
        // Conversation
        // ============================================================
        Event::UserInput { text } => match command::classify(&text)? {
            Intent::Chat(message) => {
                emitter::ensure_connected(state)?;
                require_active(state)?;
                let mut next = state.clone();
                next.conversation.push(Message::user(message.clone()));
                let request = emitter::issue(&mut next, Action::SendMessage { message });
                Ok(TransitionResult::new(next).with_effect(Effect::emit(request)))
            }
            Intent::Command(LocalCommand::AdjustTone { tone }) => change_tone(state, tone),
            Intent::Command(LocalCommand::SummarizeContext) => summarize(state),
        },

        Event::SummarizeContext => summarize(state),

        // ============================================================
        // Configuration
        // ============================================================
        Event::ChangeTone { tone } => change_tone(state, tone),

        Event::ChangeSequenceType { sequence_type } => {
            emitter::ensure_connected(state)?;
            let mut next = state.clone();
            next.persona.sequence_type = sequence_type;
            let request = emitter::issue(&mut next, Action::ChangeVariant);
            Ok(TransitionResult::new(next).with_effect(Effect::emit(request)))
        }

        // ============================================================
        // Document
        // ============================================================
        Event::EditDocument { content } => Ok(local_edit(state, content)),

        Event::AddStep => {
            let steps = document::add_step(&state.steps());
            Ok(local_edit(state, document::serialize(&steps)))
        }

        Event::EditStep {
            index,
            field,
            value,
        } => {
            let steps = document::edit_step(&state.steps(), index, field, value)?;
            Ok(local_edit(state, document::serialize(&steps)))
        }

        Event::MagicAction { action } => {
            emitter::ensure_connected(state)?;
            let mut next = state.clone();
            let request = emitter::issue(&mut next, Action::Magic { action });
            Ok(TransitionResult::new(next).with_effect(Effect::emit(request)))
        }

        Event::ApplySuggestion { index } => {
            emitter::ensure_connected(state)?;
            let suggestion = state
                .suggestions
                .as_ref()
                .and_then(|s| s.get(index))
                .cloned()
                .ok_or(TransitionError::UnknownSuggestion { index })?;
            let mut next = state.clone();
            let request = emitter::issue(&mut next, Action::ApplySuggestion { suggestion });
            Ok(TransitionResult::new(next).with_effect(Effect::emit(request)))
        }

        Event::RegenerateSequence => {
            emitter::ensure_connected(state)?;
            require_active(state)?;
            let mut next = state.clone();
            let request = emitter::issue(&mut next, Action::Regenerate);
            Ok(TransitionResult::new(next).with_effect(Effect::emit(request)))
        }

        // ============================================================
        // Channel
        // ============================================================
        Event::Inbound(inbound) => Ok(apply_inbound(state, inbound)),

        Event::Lifecycle(lifecycle) => Ok(apply_lifecycle(state, lifecycle)),
    }
}

fn require_active(state: &SessionState) -> Result<(), TransitionError> {
    if state.is_active() {
        Ok(())
    } else {
        Err(TransitionError::NoPersona)
    }
}

fn change_tone(state: &SessionState, tone: String) -> Result<TransitionResult, TransitionError> {
    emitter::ensure_connected(state)?;
    let mut next = state.clone();
    next.persona.tone = tone;
    let request = emitter::issue(&mut next, Action::ChangeTone);
    Ok(TransitionResult::new(next).with_effect(Effect::emit(request)))
}

fn summarize(state: &SessionState) -> Result<TransitionResult, TransitionError> {
    emitter::ensure_connected(state)?;
    require_active(state)?;
    let mut next = state.clone();
    let request = emitter::issue(&mut next, Action::Summarize);
    Ok(TransitionResult::new(next).with_effect(Effect::emit(request)))
}

/// Local edits always land, connected or not; only the echo needs the channel.
fn local_edit(state: &SessionState, content: String) -> TransitionResult {
    let mut next = state.clone();
    next.record_local_edit(content);
    if next.is_connected() {
        let request = emitter::issue(&mut next, Action::EditDocument);
        TransitionResult::new(next).with_effect(Effect::echo(request))
    } else {
        tracing::debug!(revision = next.document_revision, "Edit kept locally, channel is down");
        TransitionResult::new(next).with_effect(Effect::notify(OFFLINE_EDIT_NOTICE))
    }
}

fn apply_inbound(state: &SessionState, inbound: InboundEvent) -> TransitionResult {
    let mut next = state.clone();
    match inbound {
        InboundEvent::ChatMessage(message) => next.conversation.push(message),
        InboundEvent::SequenceUpdate(update) => apply_sequence_update(&mut next, update),
        InboundEvent::ContextSummary(summary) => {
            next.conversation.push(Message::assistant(summary.render()));
        }
        InboundEvent::TestResponse(data) => {
            tracing::debug!(data = %data, "Liveness probe answered");
        }
        InboundEvent::Unknown { event, reason } => {
            tracing::warn!(event = %event, reason = %reason, "Ignoring unrecognized server event");
        }
    }
    TransitionResult::new(next)
}

/// A repeated update resolves to the same origin against the same watermark,
/// so it lands or is dropped exactly as the first copy did.
fn apply_sequence_update(state: &mut SessionState, update: SequenceUpdate) {
    let origin = state.resolve_origin(update.request_id);
    if state.is_stale(origin) {
        tracing::info!(
            request_id = origin,
            watermark = state.edit_watermark,
            revision = state.document_revision,
            "Dropping sequence update that predates a local edit"
        );
        state.last_update = Some(update);
        return;
    }

    state.document.clone_from(&update.content);
    if let Some(metrics) = &update.metrics {
        state.metrics = Some(metrics.clone());
    }
    if let Some(suggestions) = &update.suggestions {
        state.suggestions = Some(suggestions.clone());
    }
    state.last_update = Some(update);
}

fn apply_lifecycle(state: &SessionState, lifecycle: Lifecycle) -> TransitionResult {
    let mut next = state.clone();
    match lifecycle {
        Lifecycle::Connecting => {
            next.connectivity = Connectivity::Connecting;
        }
        Lifecycle::Connected { identity, .. } => {
            next.connectivity = Connectivity::Connected;
            next.banner = None;
            if identity.is_some() {
                next.identity = identity;
            }
        }
        Lifecycle::ConnectError(_) => {
            next.connectivity = Connectivity::Disconnected;
            next.banner = Some(CONNECT_ERROR_BANNER.to_string());
            next.pending.clear();
        }
        Lifecycle::Disconnected(_) => {
            next.connectivity = Connectivity::Disconnected;
            next.banner = Some(DISCONNECTED_BANNER.to_string());
            next.pending.clear();
        }
        Lifecycle::Closed => {
            next.connectivity = Connectivity::Disconnected;
            next.banner = Some(CLOSED_BANNER.to_string());
            next.pending.clear();
        }
    }
    TransitionResult::new(next)
}
