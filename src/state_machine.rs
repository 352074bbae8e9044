//! Session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions. User
//! actions and channel events both arrive as [`Event`]s; the runtime applies
//! [`transition`] and then executes the returned [`Effect`]s.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{Connectivity, Phase, PersonaConfig, SessionState};
pub use transition::{transition, TransitionError, TransitionResult, OFFLINE_EDIT_NOTICE};
