//! In-memory transport for supervisor tests
//!
//! Each successful `open` hands the far end of the link to the test through
//! [`MockTransport::next_remote`].

use super::{ConnectionError, Credentials, Link, Transport, LINK_BUFFER};
use crate::protocol::Frame;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// Server side of one mock link
pub struct MockRemote {
    from_client: mpsc::Receiver<Frame>,
    to_client: mpsc::Sender<Result<Frame, ConnectionError>>,
    pub credentials_token: Option<String>,
}

impl MockRemote {
    /// Next frame sent by the client
    pub async fn recv(&mut self) -> Option<Frame> {
        tokio::time::timeout(Duration::from_secs(2), self.from_client.recv())
            .await
            .ok()
            .flatten()
    }

    /// Deliver a frame to the client
    pub async fn push(&self, frame: Frame) {
        let _ = self.to_client.send(Ok(frame)).await;
    }

    /// Fail the link with a transport error
    pub async fn fail(&self, reason: &str) {
        let _ = self
            .to_client
            .send(Err(ConnectionError::Transport(reason.to_string())))
            .await;
    }
}

pub struct MockTransport {
    name: &'static str,
    failures_left: AtomicUsize,
    hang: bool,
    opens: AtomicUsize,
    remotes_tx: mpsc::UnboundedSender<MockRemote>,
    remotes_rx: Mutex<mpsc::UnboundedReceiver<MockRemote>>,
}

impl MockTransport {
    pub fn new(name: &'static str) -> Self {
        let (remotes_tx, remotes_rx) = mpsc::unbounded_channel();
        Self {
            name,
            failures_left: AtomicUsize::new(0),
            hang: false,
            opens: AtomicUsize::new(0),
            remotes_tx,
            remotes_rx: Mutex::new(remotes_rx),
        }
    }

    /// Fail the next `count` opens
    pub fn failing(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Never complete an open
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Far end of the next successfully opened link
    pub async fn next_remote(&self) -> MockRemote {
        let mut rx = self.remotes_rx.lock().await;
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for a link")
            .expect("transport dropped")
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn open(
        &self,
        _endpoint: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Link, ConnectionError> {
        self.opens.fetch_add(1, Ordering::SeqCst);

        if self.hang {
            std::future::pending::<()>().await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ConnectionError::Handshake(format!("{} refused", self.name)));
        }

        let (outbound_tx, outbound_rx) = mpsc::channel(LINK_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(LINK_BUFFER);
        let _ = self.remotes_tx.send(MockRemote {
            from_client: outbound_rx,
            to_client: inbound_tx,
            credentials_token: credentials.map(|c| c.token.clone()),
        });

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
