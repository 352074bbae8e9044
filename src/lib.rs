//! Helix client - sync core for a conversational recruiting assistant
//!
//! Keeps one session (conversation, persona, outreach sequence, derived
//! metrics) consistent with a remote service across an auto-reconnecting
//! event channel.

pub mod command;
pub mod config;
pub mod connection;
pub mod console;
pub mod document;
pub mod emitter;
pub mod persona;
pub mod protocol;
pub mod runtime;
pub mod state_machine;

pub use config::ClientConfig;
pub use connection::{ConnectionHandle, ConnectionManager};
pub use runtime::{SessionHandle, SessionRuntime, SessionUpdate};
pub use state_machine::SessionState;
