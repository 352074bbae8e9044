//! Effects produced by state transitions

use crate::protocol::Outbound;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Put a request on the channel. If it cannot be sent the action is
    /// rolled back and reported as not connected.
    Emit(Outbound),

    /// Echo a local edit. If it cannot be sent the edit stays and observers
    /// get the offline notice.
    Echo(Outbound),

    /// Tell observers something that is not an error
    Notify { message: String },
}

impl Effect {
    pub fn emit(request: Outbound) -> Self {
        Effect::Emit(request)
    }

    pub fn echo(request: Outbound) -> Self {
        Effect::Echo(request)
    }

    pub fn notify(message: impl Into<String>) -> Self {
        Effect::Notify {
            message: message.into(),
        }
    }

    /// The request carried by an `Emit` or `Echo`
    pub fn as_outbound(&self) -> Option<&Outbound> {
        match self {
            Effect::Emit(request) | Effect::Echo(request) => Some(request),
            Effect::Notify { .. } => None,
        }
    }
}
