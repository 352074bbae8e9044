//! Mock implementations for testing
//!
//! These mocks enable integration testing of the runtime without a server.

use super::traits::Channel;
use super::{SessionHandle, SessionRuntime, SessionUpdate};
use crate::connection::{ChannelEvent, ConnectionError, Lifecycle};
use crate::protocol::{InboundEvent, Outbound};
use crate::state_machine::SessionState;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

// ============================================================================
// Mock Channel
// ============================================================================

/// Channel that records every request it is handed
#[derive(Default)]
pub struct MockChannel {
    /// Record of all requests sent
    pub sent: Mutex<Vec<Outbound>>,
    offline: AtomicBool,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every send fail as if the link had just dropped
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Get recorded requests
    pub fn recorded(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for MockChannel {
    async fn send(&self, request: &Outbound) -> Result<(), ConnectionError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ConnectionError::NotConnected);
        }
        self.sent.lock().unwrap().push(request.clone());
        Ok(())
    }
}

// ============================================================================
// Test Session
// ============================================================================

/// A running session wired to a [`MockChannel`] and a fake connection supervisor
pub struct TestSession {
    pub handle: SessionHandle,
    pub channel: Arc<MockChannel>,
    pub updates: broadcast::Receiver<SessionUpdate>,
    events_tx: mpsc::Sender<ChannelEvent>,
    _runtime_handle: tokio::task::JoinHandle<()>,
}

impl TestSession {
    pub fn new() -> Self {
        let channel = Arc::new(MockChannel::new());
        let (events_tx, events_rx) = mpsc::channel(32);
        let (runtime, handle) = SessionRuntime::new(SessionState::new(), channel.clone(), events_rx);
        let updates = handle.subscribe();
        let runtime_handle = tokio::spawn(runtime.run());
        Self {
            handle,
            channel,
            updates,
            events_tx,
            _runtime_handle: runtime_handle,
        }
    }

    /// Report a lifecycle change as the supervisor would
    pub async fn lifecycle(&self, lifecycle: Lifecycle) {
        self.events_tx
            .send(ChannelEvent::Lifecycle(lifecycle))
            .await
            .unwrap();
    }

    /// Deliver a server event
    pub async fn inbound(&self, event: InboundEvent) {
        self.events_tx.send(ChannelEvent::Inbound(event)).await.unwrap();
    }

    /// Report a connection and wait for the session to see it
    pub async fn connect(&self) {
        self.lifecycle(Lifecycle::Connected {
            transport: "mock",
            identity: Some("recruiter@example.com".to_string()),
        })
        .await;
        assert!(self.wait_for(SessionState::is_connected).await);
    }

    /// Wait until the published state satisfies `pred`
    pub async fn wait_for(&self, pred: impl FnMut(&SessionState) -> bool) -> bool {
        let mut rx = self.handle.watch_state();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred))
            .await
            .is_ok_and(|r| r.is_ok())
    }

    /// Next error or notice broadcast by the runtime
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        tokio::time::timeout(Duration::from_secs(2), self.updates.recv())
            .await
            .ok()
            .and_then(Result::ok)
    }

    pub fn sent(&self) -> Vec<Outbound> {
        self.channel.recorded()
    }
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{self, Step, StepField};
    use crate::persona;
    use crate::protocol::{events, Message, Metrics, Role, SequenceUpdate};
    use crate::runtime::SessionError;
    use crate::state_machine::{Connectivity, Phase, TransitionError, OFFLINE_EDIT_NOTICE};

    #[tokio::test]
    async fn test_mock_channel_records_and_fails() {
        let channel = MockChannel::new();
        channel.send(&Outbound::probe()).await.unwrap();
        assert_eq!(channel.recorded().len(), 1);

        channel.set_offline(true);
        assert_eq!(
            channel.send(&Outbound::probe()).await,
            Err(ConnectionError::NotConnected)
        );
        assert_eq!(channel.recorded().len(), 1);
    }

    /// Integration test: persona, chat, reply, generate, two-step sequence
    #[tokio::test]
    async fn test_end_to_end_sequence_generation() {
        let session = TestSession::new();
        session.connect().await;

        session.handle.choose_persona("corporate_pro").await.unwrap();
        let state = session.handle.state();
        assert_eq!(state.phase, Phase::Active);
        assert_eq!(
            state.conversation,
            vec![Message::assistant(persona::find("corporate_pro").unwrap().greeting)]
        );

        session.handle.send_input("Hire a backend engineer").await.unwrap();
        let sent = session.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].event_name(), events::CHAT_MESSAGE);
        let payload = sent[0].payload();
        assert_eq!(payload["message"], "Hire a backend engineer");
        assert_eq!(payload["persona"], "corporate_pro");
        assert_eq!(payload["messages"].as_array().unwrap().len(), 2);

        session
            .inbound(InboundEvent::ChatMessage(Message::assistant(
                "Great. What seniority and location?",
            )))
            .await;
        assert!(session.wait_for(|s| s.conversation.len() == 3).await);

        session.handle.regenerate().await.unwrap();
        let sent = session.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].event_name(), events::GENERATE_SEQUENCE);
        let payload = sent[1].payload();
        assert_eq!(payload["tone"], "professional");
        assert_eq!(payload["sequenceType"], "passive");
        assert_eq!(payload["messages"].as_array().unwrap().len(), 3);

        let steps = vec![
            Step::new("Backend role at Acme", "Hi [Candidate Name], ..."),
            Step::new("Following up", "Hi again, ..."),
        ];
        session
            .inbound(InboundEvent::SequenceUpdate(SequenceUpdate {
                content: format!("```json\n{}\n```", document::serialize(&steps)),
                metrics: Some(Metrics {
                    open_rate: 0.42,
                    response_rate: 0.12,
                    sentiment: "positive".to_string(),
                    personalization_score: 0.7,
                    quality_score: 0.8,
                }),
                suggestions: Some(vec!["Mention the tech stack".to_string()]),
                request_id: None,
            }))
            .await;
        assert!(session.wait_for(SessionState::has_generated_sequence).await);

        let state = session.handle.state();
        assert_eq!(state.steps(), steps);
        assert_eq!(state.metrics.as_ref().map(|m| m.sentiment.as_str()), Some("positive"));
        assert!(state.pending.is_empty());
    }

    #[tokio::test]
    async fn test_not_connected_is_surfaced() {
        let mut session = TestSession::new();
        session.handle.choose_persona("tech_expert").await.unwrap();

        let result = session.handle.send_input("hello").await;
        assert_eq!(
            result,
            Err(SessionError::Rejected(TransitionError::NotConnected))
        );
        assert!(session.sent().is_empty());
        assert_eq!(session.handle.state().conversation.len(), 1);
        assert_eq!(
            session.next_update().await,
            Some(SessionUpdate::Error {
                message: TransitionError::NotConnected.to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_offline_edit_produces_notice() {
        let mut session = TestSession::new();
        session
            .lifecycle(Lifecycle::Disconnected("reset".to_string()))
            .await;
        assert!(
            session
                .wait_for(|s| s.connectivity == Connectivity::Disconnected)
                .await
        );

        session.handle.edit_document("draft").await.unwrap();
        assert_eq!(session.handle.state().document, "draft");
        assert!(session.sent().is_empty());
        assert!(matches!(
            session.next_update().await,
            Some(SessionUpdate::Notice { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsent_action_is_rolled_back() {
        let mut session = TestSession::new();
        session.connect().await;
        session.handle.choose_persona("friendly_recruiter").await.unwrap();
        let before = session.handle.state();

        // Link drops before the supervisor reports it
        session.channel.set_offline(true);
        let result = session.handle.send_input("hello").await;
        assert_eq!(
            result,
            Err(SessionError::Rejected(TransitionError::NotConnected))
        );
        assert_eq!(
            session.next_update().await,
            Some(SessionUpdate::Error {
                message: TransitionError::NotConnected.to_string()
            })
        );

        let result = session.handle.change_tone("casual").await;
        assert_eq!(
            result,
            Err(SessionError::Rejected(TransitionError::NotConnected))
        );
        assert_eq!(session.handle.state(), before);
        assert!(session.sent().is_empty());

        // Retrying once the link is back sends the turn exactly once
        session.channel.set_offline(false);
        session.handle.send_input("hello").await.unwrap();
        let state = session.handle.state();
        assert_eq!(state.conversation.len(), 2);
        assert_eq!(session.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_unsent_edit_echo_keeps_edit() {
        let mut session = TestSession::new();
        session.connect().await;

        session.channel.set_offline(true);
        session.handle.edit_document("draft").await.unwrap();

        let state = session.handle.state();
        assert_eq!(state.document, "draft");
        assert_eq!(state.document_revision, 1);
        assert!(session.sent().is_empty());
        assert_eq!(
            session.next_update().await,
            Some(SessionUpdate::Notice {
                message: OFFLINE_EDIT_NOTICE.to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_chat_push_does_not_overwrite_later_edit() {
        let session = TestSession::new();
        session.connect().await;
        session.handle.choose_persona("corporate_pro").await.unwrap();

        session.handle.send_input("Hire a backend engineer").await.unwrap();
        session.handle.edit_document("mine").await.unwrap();
        session
            .inbound(InboundEvent::SequenceUpdate(SequenceUpdate {
                content: "theirs".to_string(),
                metrics: None,
                suggestions: None,
                request_id: None,
            }))
            .await;
        assert!(session.wait_for(|s| s.last_update.is_some()).await);
        assert_eq!(session.handle.state().document, "mine");

        // A chat after the edit makes the next push current again
        session.handle.send_input("Make it shorter").await.unwrap();
        session
            .inbound(InboundEvent::SequenceUpdate(SequenceUpdate {
                content: "fresh".to_string(),
                metrics: None,
                suggestions: None,
                request_id: None,
            }))
            .await;
        assert!(session.wait_for(|s| s.document == "fresh").await);
    }

    #[tokio::test]
    async fn test_local_edit_wins_over_late_answer() {
        let session = TestSession::new();
        session.connect().await;
        session.handle.choose_persona("startup_founder").await.unwrap();

        session.handle.magic_action("shorten").await.unwrap();
        session.handle.edit_document("my own words").await.unwrap();

        session
            .inbound(InboundEvent::SequenceUpdate(SequenceUpdate {
                content: "server rewrite".to_string(),
                metrics: None,
                suggestions: None,
                request_id: None,
            }))
            .await;
        assert!(session.wait_for(|s| s.last_update.is_some()).await);
        assert_eq!(session.handle.state().document, "my own words");

        let sent = session.sent();
        assert_eq!(sent[0].event_name(), events::MAGIC_ACTION);
        assert_eq!(sent[1].event_name(), events::SEQUENCE_UPDATE);
        assert_eq!(sent[1].payload()["content"], "my own words");
    }

    #[tokio::test]
    async fn test_step_editing_round_trip() {
        let session = TestSession::new();
        session.connect().await;

        session.handle.add_step().await.unwrap();
        session.handle.add_step().await.unwrap();
        session
            .handle
            .edit_step(1, StepField::Body, "Short and sweet")
            .await
            .unwrap();

        let steps = session.handle.state().steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].subject, "Follow-up 2");
        assert_eq!(steps[1].body, "Short and sweet");
        assert_eq!(session.sent().len(), 3);

        let result = session.handle.edit_step(5, StepField::Body, "x").await;
        assert!(matches!(
            result,
            Err(SessionError::Rejected(TransitionError::Document(_)))
        ));
    }

    #[tokio::test]
    async fn test_context_summary_becomes_assistant_message() {
        let session = TestSession::new();
        session.connect().await;
        session.handle.choose_persona("corporate_pro").await.unwrap();
        session.handle.send_input("/summarize_context").await.unwrap();
        assert_eq!(session.sent()[0].event_name(), events::SUMMARIZE_CONTEXT);

        let summary = serde_json::from_value(serde_json::json!({
            "role": "Backend Engineer",
            "company_type": "Fintech startup",
            "key_requirements": ["Rust", "Postgres"],
            "location": "Remote",
            "unique_selling_points": "Equity"
        }))
        .unwrap();
        session.inbound(InboundEvent::ContextSummary(summary)).await;
        assert!(session.wait_for(|s| s.conversation.len() == 2).await);

        let last = session.handle.state().conversation[1].clone();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.contains("Postgres"));
    }

    #[tokio::test]
    async fn test_reconnect_clears_banner() {
        let session = TestSession::new();
        session
            .lifecycle(Lifecycle::ConnectError("refused".to_string()))
            .await;
        assert!(session.wait_for(|s| s.banner.is_some()).await);

        session.connect().await;
        let state = session.handle.state();
        assert!(state.banner.is_none());
        assert_eq!(state.identity.as_deref(), Some("recruiter@example.com"));
    }

    #[tokio::test]
    async fn test_handle_reports_stopped_runtime() {
        let channel = Arc::new(MockChannel::new());
        let (_events_tx, events_rx) = mpsc::channel(1);
        let (runtime, handle) = SessionRuntime::new(SessionState::new(), channel, events_rx);
        drop(runtime);

        assert_eq!(handle.add_step().await, Err(SessionError::Stopped));
    }
}
