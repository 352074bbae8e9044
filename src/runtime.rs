//! Runtime for driving a session
//!
//! One task owns the [`SessionState`]; everything else talks to it through a
//! [`SessionHandle`]. State snapshots are published on a watch channel and
//! errors and notices on a broadcast channel.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::document::StepField;
use crate::state_machine::{Event, SessionState, TransitionError};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Events sent to session observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A user action was rejected or a request could not be sent
    Error { message: String },
    /// Informational message, e.g. an edit kept while offline
    Notice { message: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("Session runtime has stopped")]
    Stopped,
}

/// A user event plus where to report the outcome
#[derive(Debug)]
pub struct SessionRequest {
    pub event: Event,
    pub reply: Option<oneshot::Sender<Result<(), SessionError>>>,
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    request_tx: mpsc::Sender<SessionRequest>,
    state_rx: watch::Receiver<SessionState>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
}

impl SessionHandle {
    /// Latest state snapshot
    pub fn state(&self) -> SessionState {
        self.state_rx.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.broadcast_tx.subscribe()
    }

    /// Submit an event and wait until it has been fully processed
    pub async fn dispatch(&self, event: Event) -> Result<(), SessionError> {
        let (reply, outcome) = oneshot::channel();
        self.request_tx
            .send(SessionRequest {
                event,
                reply: Some(reply),
            })
            .await
            .map_err(|_| SessionError::Stopped)?;
        outcome.await.map_err(|_| SessionError::Stopped)?
    }

    pub async fn choose_persona(&self, id: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(Event::ChoosePersona { id: id.into() }).await
    }

    /// Chat text or a slash command
    pub async fn send_input(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(Event::UserInput { text: text.into() }).await
    }

    pub async fn change_tone(&self, tone: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(Event::ChangeTone { tone: tone.into() }).await
    }

    pub async fn change_sequence_type(
        &self,
        sequence_type: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.dispatch(Event::ChangeSequenceType {
            sequence_type: sequence_type.into(),
        })
        .await
    }

    pub async fn magic_action(&self, action: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(Event::MagicAction {
            action: action.into(),
        })
        .await
    }

    pub async fn edit_document(&self, content: impl Into<String>) -> Result<(), SessionError> {
        self.dispatch(Event::EditDocument {
            content: content.into(),
        })
        .await
    }

    pub async fn add_step(&self) -> Result<(), SessionError> {
        self.dispatch(Event::AddStep).await
    }

    pub async fn edit_step(
        &self,
        index: usize,
        field: StepField,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.dispatch(Event::EditStep {
            index,
            field,
            value: value.into(),
        })
        .await
    }

    pub async fn regenerate(&self) -> Result<(), SessionError> {
        self.dispatch(Event::RegenerateSequence).await
    }

    pub async fn apply_suggestion(&self, index: usize) -> Result<(), SessionError> {
        self.dispatch(Event::ApplySuggestion { index }).await
    }

    pub async fn summarize_context(&self) -> Result<(), SessionError> {
        self.dispatch(Event::SummarizeContext).await
    }
}
