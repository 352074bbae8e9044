//! Session state types

use crate::document::{self, Step};
use crate::persona::{self, Persona};
use crate::protocol::{Message, Metrics, SequenceUpdate};
use std::collections::VecDeque;

/// Whether a persona has been chosen yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Active,
}

/// Channel status as last reported by the connection supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

/// Active persona plus the tone and variant currently applied on top of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaConfig {
    pub id: String,
    pub tone: String,
    pub sequence_type: String,
}

impl PersonaConfig {
    pub fn from_persona(persona: &Persona) -> Self {
        Self {
            id: persona.id.to_string(),
            tone: persona.tone.to_string(),
            sequence_type: persona.sequence_type.to_string(),
        }
    }
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self::from_persona(persona::default_persona())
    }
}

/// Everything one session knows. Owned by the runtime task; observers only
/// ever see clones.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: Phase,
    /// Append-only until the next persona switch
    pub conversation: Vec<Message>,
    pub persona: PersonaConfig,
    /// Raw document buffer. Always text, never necessarily valid JSON.
    pub document: String,
    pub metrics: Option<Metrics>,
    pub suggestions: Option<Vec<String>>,
    pub connectivity: Connectivity,
    /// Identity the channel was authenticated as
    pub identity: Option<String>,
    /// Transient connectivity message for the user
    pub banner: Option<String>,

    /// Bumped by every local document edit
    pub document_revision: u64,
    /// Id the next outbound request will take
    pub next_request_id: u64,
    /// Id of the most recently issued request, 0 before the first one
    pub last_issued_id: u64,
    /// Id of the newest request that can make the server push a
    /// `sequence_update` (chat or a document request, never an edit echo)
    pub last_trigger_id: u64,
    /// Requests with an id below this were issued before the latest local
    /// edit; their document updates are stale
    pub edit_watermark: u64,
    /// Requests still owed a `sequence_update`, oldest first
    pub pending: VecDeque<u64>,
    /// Last `sequence_update` received, applied or not
    pub last_update: Option<SequenceUpdate>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            conversation: Vec::new(),
            persona: PersonaConfig::default(),
            document: String::new(),
            metrics: None,
            suggestions: None,
            connectivity: Connectivity::Connecting,
            identity: None,
            banner: None,
            document_revision: 0,
            next_request_id: 1,
            last_issued_id: 0,
            last_trigger_id: 0,
            edit_watermark: 0,
            pending: VecDeque::new(),
            last_update: None,
        }
    }

    pub fn steps(&self) -> Vec<Step> {
        document::parse(&self.document)
    }

    pub fn has_generated_sequence(&self) -> bool {
        !self.steps().is_empty()
    }

    pub fn is_connected(&self) -> bool {
        self.connectivity == Connectivity::Connected
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    /// Take the next request id
    pub fn allocate_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.last_issued_id = id;
        id
    }

    /// Replace the document with a local edit and move the edit watermark
    pub fn record_local_edit(&mut self, content: String) {
        self.document = content;
        self.document_revision += 1;
        self.edit_watermark = self.next_request_id;
    }

    /// Work out which request a `sequence_update` answers.
    ///
    /// An echoed id wins. Without one the update is attributed to the newest
    /// request that could have caused it, and everything still outstanding is
    /// considered settled.
    pub fn resolve_origin(&mut self, echoed: Option<u64>) -> u64 {
        if let Some(id) = echoed {
            self.pending.retain(|pending| *pending != id);
            return id;
        }
        self.pending.clear();
        self.last_trigger_id
    }

    pub fn is_stale(&self, origin: u64) -> bool {
        origin < self.edit_watermark
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
