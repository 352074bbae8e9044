//! Session runtime executor

use super::traits::Channel;
use super::{SessionError, SessionHandle, SessionRequest, SessionUpdate};
use crate::connection::ChannelEvent;
use crate::state_machine::{
    transition, Effect, Event, SessionState, TransitionError, OFFLINE_EDIT_NOTICE,
};
use tokio::sync::{broadcast, mpsc, watch};

/// Capacity of the user request queue
const REQUEST_BUFFER: usize = 32;
/// Capacity of the observer broadcast
const UPDATE_BUFFER: usize = 128;

/// Single owner of the session state.
///
/// User requests and channel events are processed one at a time, each to
/// completion, so no event ever observes a half-applied transition. A
/// transition is only published once its requests are on the channel.
pub struct SessionRuntime<C>
where
    C: Channel + 'static,
{
    state: SessionState,
    channel: C,
    request_rx: mpsc::Receiver<SessionRequest>,
    channel_rx: mpsc::Receiver<ChannelEvent>,
    state_tx: watch::Sender<SessionState>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
}

impl<C> SessionRuntime<C>
where
    C: Channel + 'static,
{
    /// Build a runtime and the handle used to drive it
    pub fn new(
        state: SessionState,
        channel: C,
        channel_rx: mpsc::Receiver<ChannelEvent>,
    ) -> (Self, SessionHandle) {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_BUFFER);
        let (state_tx, state_rx) = watch::channel(state.clone());
        let (broadcast_tx, _) = broadcast::channel(UPDATE_BUFFER);

        let handle = SessionHandle {
            request_tx,
            state_rx,
            broadcast_tx: broadcast_tx.clone(),
        };
        let runtime = Self {
            state,
            channel,
            request_rx,
            channel_rx,
            state_tx,
            broadcast_tx,
        };
        (runtime, handle)
    }

    pub async fn run(mut self) {
        tracing::info!("Starting session runtime");

        // Process events in a loop - no recursion
        loop {
            tokio::select! {
                Some(request) = self.request_rx.recv() => {
                    let SessionRequest { event, reply } = request;
                    let result = self.process_event(event).await.map_err(SessionError::from);
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    }
                }
                Some(channel_event) = self.channel_rx.recv() => {
                    let event = match channel_event {
                        ChannelEvent::Lifecycle(lifecycle) => Event::Lifecycle(lifecycle),
                        ChannelEvent::Inbound(inbound) => Event::Inbound(inbound),
                    };
                    if let Err(e) = self.process_event(event).await {
                        tracing::error!(error = %e, "Error handling channel event");
                    }
                }
                else => break,
            }
        }

        tracing::info!("Session runtime stopped");
    }

    async fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        let kind = event.kind();

        // Pure state transition
        let result = match transition(&self.state, event) {
            Ok(r) => r,
            Err(e) => {
                // Transition errors are user-facing (e.g. "not connected")
                tracing::debug!(event = kind, error = %e, "Transition rejected");
                self.report_error(&e);
                return Err(e);
            }
        };

        let old_state = std::mem::replace(&mut self.state, result.new_state);

        for effect in result.effects {
            if let Err(e) = self.execute_effect(effect).await {
                // Nothing reached the server, so the action did not happen
                tracing::info!(event = kind, "Rolling back unsent action");
                self.state = old_state;
                self.report_error(&e);
                return Err(e);
            }
        }

        if old_state.phase != self.state.phase || old_state.connectivity != self.state.connectivity {
            tracing::info!(
                event = kind,
                phase = ?self.state.phase,
                connectivity = ?self.state.connectivity,
                "Session state changed"
            );
        }
        self.state_tx.send_replace(self.state.clone());
        Ok(())
    }

    async fn execute_effect(&self, effect: Effect) -> Result<(), TransitionError> {
        match effect {
            Effect::Emit(request) => self.channel.send(&request).await.map_err(|e| {
                tracing::warn!(event = request.event_name(), error = %e, "Request not sent");
                TransitionError::NotConnected
            }),
            Effect::Echo(request) => {
                if let Err(e) = self.channel.send(&request).await {
                    tracing::warn!(event = request.event_name(), error = %e, "Edit echo not sent");
                    let _ = self.broadcast_tx.send(SessionUpdate::Notice {
                        message: OFFLINE_EDIT_NOTICE.to_string(),
                    });
                }
                Ok(())
            }
            Effect::Notify { message } => {
                let _ = self.broadcast_tx.send(SessionUpdate::Notice { message });
                Ok(())
            }
        }
    }

    fn report_error(&self, error: &TransitionError) {
        let _ = self.broadcast_tx.send(SessionUpdate::Error {
            message: error.to_string(),
        });
    }
}
