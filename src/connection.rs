//! Channel lifecycle management
//!
//! A supervisor task owns the connection: it walks the transport tiers in
//! preference order, reconnects forever with capped jittered backoff, and
//! reports lifecycle changes and inbound events on a single ordered channel.
//! Sending never queues: a handle without a live link fails with
//! [`ConnectionError::NotConnected`].

mod backoff;
mod polling;
mod websocket;

#[cfg(test)]
pub mod testing;

pub use backoff::{Backoff, ReconnectPolicy};
pub use polling::PollingTransport;
pub use websocket::WebSocketTransport;

use crate::protocol::{Frame, InboundEvent, Outbound};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Capacity of the per-link frame queues
pub(crate) const LINK_BUFFER: usize = 64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("Not connected to server. Please wait for reconnection.")]
    NotConnected,
    #[error("Connection attempt timed out after {0:?}")]
    Timeout(Duration),
    #[error("Handshake failed: {0}")]
    Handshake(String),
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Credentials attached to the handshake by the external auth module
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub identity: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("identity", &self.identity)
            .finish()
    }
}

/// Connection lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lifecycle {
    Connecting,
    Connected {
        transport: &'static str,
        identity: Option<String>,
    },
    ConnectError(String),
    Disconnected(String),
    /// The handle was closed; no further reconnection
    Closed,
}

/// Everything the supervisor reports, in delivery order
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Lifecycle(Lifecycle),
    Inbound(InboundEvent),
}

/// An open, framed, bidirectional link produced by a transport.
///
/// Dropping `outbound` asks the transport to shut the link down; `inbound`
/// yields `None` once the link is gone.
pub struct Link {
    pub outbound: mpsc::Sender<Frame>,
    pub inbound: mpsc::Receiver<Result<Frame, ConnectionError>>,
}

/// One transport tier (persistent duplex, long-poll, ...)
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn open(
        &self,
        endpoint: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Link, ConnectionError>;
}

/// Options for [`ConnectionManager::connect`]
#[derive(Clone)]
pub struct ConnectOptions {
    pub policy: ReconnectPolicy,
    pub credentials: Option<Credentials>,
    /// Tried in order on every attempt
    pub transports: Vec<Arc<dyn Transport>>,
}

impl ConnectOptions {
    pub fn new(transports: Vec<Arc<dyn Transport>>) -> Self {
        Self {
            policy: ReconnectPolicy::default(),
            credentials: None,
            transports,
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(WebSocketTransport::new()),
            Arc::new(PollingTransport::new()),
        ])
    }
}

/// Cloneable handle to a supervised connection
#[derive(Clone)]
pub struct ConnectionHandle {
    link: watch::Receiver<Option<mpsc::Sender<Frame>>>,
    shutdown: CancellationToken,
}

impl ConnectionHandle {
    pub fn is_connected(&self) -> bool {
        self.link.borrow().is_some()
    }

    /// Send one request. Fails fast when no link is up.
    pub async fn send(&self, request: &Outbound) -> Result<(), ConnectionError> {
        let Some(tx) = self.link.borrow().clone() else {
            return Err(ConnectionError::NotConnected);
        };
        tracing::debug!(event = request.event_name(), request_id = ?request.request_id(), "Sending request");
        tx.send(request.to_frame())
            .await
            .map_err(|_| ConnectionError::NotConnected)
    }

    /// Stop the supervisor and drop the link
    pub fn close(&self) {
        self.shutdown.cancel();
    }
}

/// Entry point for opening supervised connections
pub struct ConnectionManager;

impl ConnectionManager {
    /// Start the supervisor for `endpoint`.
    ///
    /// Returns immediately; connection progress is reported on the returned
    /// receiver, starting with [`Lifecycle::Connecting`].
    pub fn connect(
        endpoint: impl Into<String>,
        options: ConnectOptions,
    ) -> (ConnectionHandle, mpsc::Receiver<ChannelEvent>) {
        let (events_tx, events_rx) = mpsc::channel(256);
        let (link_tx, link_rx) = watch::channel(None);
        let shutdown = CancellationToken::new();

        let supervisor = Supervisor {
            endpoint: endpoint.into(),
            options,
            link: link_tx,
            events: events_tx,
            shutdown: shutdown.clone(),
        };
        tokio::spawn(supervisor.run());

        (
            ConnectionHandle {
                link: link_rx,
                shutdown,
            },
            events_rx,
        )
    }
}

struct Supervisor {
    endpoint: String,
    options: ConnectOptions,
    link: watch::Sender<Option<mpsc::Sender<Frame>>>,
    events: mpsc::Sender<ChannelEvent>,
    shutdown: CancellationToken,
}

enum LinkEnd {
    Lost(String),
    Shutdown,
}

impl Supervisor {
    async fn run(self) {
        tracing::info!(endpoint = %self.endpoint, "Starting connection supervisor");
        let mut backoff = Backoff::new(self.options.policy.clone());

        loop {
            if !self.emit(ChannelEvent::Lifecycle(Lifecycle::Connecting)).await {
                break;
            }

            let opened = tokio::select! {
                result = self.open_any() => result,
                () = self.shutdown.cancelled() => break,
            };

            match opened {
                Ok((transport, link)) => {
                    backoff.reset();
                    match self.serve(transport, link).await {
                        LinkEnd::Shutdown => break,
                        LinkEnd::Lost(reason) => {
                            tracing::warn!(reason = %reason, "Disconnected from server");
                            if !self
                                .emit(ChannelEvent::Lifecycle(Lifecycle::Disconnected(reason)))
                                .await
                            {
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt = backoff.attempt() + 1, "Connection attempt failed");
                    if !self
                        .emit(ChannelEvent::Lifecycle(Lifecycle::ConnectError(e.to_string())))
                        .await
                    {
                        break;
                    }
                }
            }

            let delay = backoff.next_delay();
            tracing::debug!(delay_ms = %delay.as_millis(), "Waiting before reconnect");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown.cancelled() => break,
            }
        }

        self.link.send_replace(None);
        let _ = self
            .events
            .send(ChannelEvent::Lifecycle(Lifecycle::Closed))
            .await;
        tracing::info!(endpoint = %self.endpoint, "Connection supervisor stopped");
    }

    /// Try each transport tier in order
    async fn open_any(&self) -> Result<(&'static str, Link), ConnectionError> {
        let timeout = self.options.policy.connect_timeout;
        let credentials = self.options.credentials.as_ref();
        let mut last_error = ConnectionError::Transport("no transports configured".to_string());

        for transport in &self.options.transports {
            let attempt = tokio::time::timeout(timeout, transport.open(&self.endpoint, credentials));
            match attempt.await {
                Ok(Ok(link)) => return Ok((transport.name(), link)),
                Ok(Err(e)) => {
                    tracing::debug!(transport = transport.name(), error = %e, "Transport tier failed");
                    last_error = e;
                }
                Err(_) => {
                    tracing::debug!(transport = transport.name(), "Transport tier timed out");
                    last_error = ConnectionError::Timeout(timeout);
                }
            }
        }

        Err(last_error)
    }

    /// Pump inbound frames until the link drops or shutdown is requested
    async fn serve(&self, transport: &'static str, mut link: Link) -> LinkEnd {
        self.link.send_replace(Some(link.outbound.clone()));
        let identity = self
            .options
            .credentials
            .as_ref()
            .and_then(|c| c.identity.clone());
        tracing::info!(transport, identity = ?identity, "Connected to server");

        if !self
            .emit(ChannelEvent::Lifecycle(Lifecycle::Connected {
                transport,
                identity,
            }))
            .await
        {
            self.link.send_replace(None);
            return LinkEnd::Shutdown;
        }

        if link.outbound.send(Outbound::probe().to_frame()).await.is_err() {
            tracing::warn!(transport, "Liveness probe could not be sent");
        }

        let end = loop {
            tokio::select! {
                frame = link.inbound.recv() => match frame {
                    Some(Ok(frame)) => {
                        let event = InboundEvent::from_frame(frame);
                        tracing::debug!(event = event.event_name(), "Received event");
                        if !self.emit(ChannelEvent::Inbound(event)).await {
                            break LinkEnd::Shutdown;
                        }
                    }
                    Some(Err(e)) => break LinkEnd::Lost(e.to_string()),
                    None => break LinkEnd::Lost("transport closed".to_string()),
                },
                () = self.shutdown.cancelled() => break LinkEnd::Shutdown,
            }
        };

        self.link.send_replace(None);
        end
    }

    /// Returns false once nobody is listening any more
    async fn emit(&self, event: ChannelEvent) -> bool {
        if self.events.send(event).await.is_err() {
            tracing::debug!("Channel event receiver dropped, stopping supervisor");
            return false;
        }
        true
    }
}
