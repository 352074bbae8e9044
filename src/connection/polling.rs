//! HTTP long-poll transport tier
//!
//! Fallback for networks that block WebSockets.
//!
//! - `POST {endpoint}/poll` opens a session and returns `{"sid": ...}`
//! - `GET {endpoint}/poll/{sid}` blocks until frames are available and returns
//!   them as a JSON array (empty on idle timeout)
//! - `POST {endpoint}/poll/{sid}` delivers one frame

use super::{ConnectionError, Credentials, Link, Transport, LINK_BUFFER};
use crate::protocol::Frame;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;

/// Upper bound for one long-poll round trip
const POLL_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Deserialize)]
struct Handshake {
    sid: String,
}

#[derive(Debug, Clone)]
pub struct PollingTransport {
    client: reqwest::Client,
}

impl PollingTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for PollingTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn poll_base(endpoint: &str) -> String {
    format!("{}/poll", endpoint.trim_end_matches('/'))
}

fn authorize(request: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

fn transport_error(e: &reqwest::Error) -> ConnectionError {
    ConnectionError::Transport(e.to_string())
}

#[async_trait]
impl Transport for PollingTransport {
    fn name(&self) -> &'static str {
        "polling"
    }

    async fn open(
        &self,
        endpoint: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Link, ConnectionError> {
        let token = credentials.map(|c| c.token.clone());
        let base = poll_base(endpoint);

        let handshake: Handshake = authorize(self.client.post(&base), token.as_deref())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ConnectionError::Handshake(e.to_string()))?
            .json()
            .await
            .map_err(|e| ConnectionError::Handshake(e.to_string()))?;
        let session_url = format!("{base}/{}", handshake.sid);
        tracing::debug!(sid = %handshake.sid, "Long-poll session opened");

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Frame>(LINK_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(LINK_BUFFER);

        // Writer: one POST per frame, in order
        let client = self.client.clone();
        let url = session_url.clone();
        let write_token = token.clone();
        let write_errors = inbound_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let sent = authorize(client.post(&url), write_token.as_deref())
                    .json(&frame)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status);
                if let Err(e) = sent {
                    let _ = write_errors.send(Err(transport_error(&e))).await;
                    break;
                }
            }
        });

        // Reader: long-poll until the link is dropped or fails
        let client = self.client.clone();
        tokio::spawn(async move {
            loop {
                let poll = authorize(client.get(&session_url), token.as_deref())
                    .timeout(POLL_TIMEOUT)
                    .send();
                let response = tokio::select! {
                    response = poll => response,
                    () = inbound_tx.closed() => return,
                };
                let frames = match response.and_then(reqwest::Response::error_for_status) {
                    Ok(response) => response.json::<Vec<Frame>>().await,
                    Err(e) => Err(e),
                };
                match frames {
                    Ok(frames) => {
                        for frame in frames {
                            if inbound_tx.send(Ok(frame)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = inbound_tx.send(Err(transport_error(&e))).await;
                        return;
                    }
                }
            }
        });

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
