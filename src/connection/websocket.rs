//! WebSocket transport tier
//!
//! Preferred tier: one persistent duplex socket, one text message per frame.

use super::{ConnectionError, Credentials, Link, Transport, LINK_BUFFER};
use crate::protocol::Frame;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;

const WS_PATH: &str = "ws";

#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

/// Map the service base URL onto its WebSocket endpoint
pub(crate) fn socket_url(endpoint: &str) -> Result<Url, ConnectionError> {
    let base = format!("{}/{WS_PATH}", endpoint.trim_end_matches('/'));
    let mut url = Url::parse(&base).map_err(|e| ConnectionError::Handshake(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ConnectionError::Handshake(format!(
                "unsupported scheme: {other}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|()| ConnectionError::Handshake(format!("cannot use scheme {scheme}")))?;
    Ok(url)
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn name(&self) -> &'static str {
        "websocket"
    }

    async fn open(
        &self,
        endpoint: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Link, ConnectionError> {
        let url = socket_url(endpoint)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| ConnectionError::Handshake(e.to_string()))?;
        if let Some(credentials) = credentials {
            let value = HeaderValue::from_str(&format!("Bearer {}", credentials.token))
                .map_err(|e| ConnectionError::Handshake(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (socket, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| ConnectionError::Handshake(e.to_string()))?;
        let (mut sink, mut stream) = socket.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Frame>(LINK_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(LINK_BUFFER);

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let text = match frame.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::warn!(event = %frame.event, error = %e, "Dropping unencodable frame");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::debug!(error = %e, "WebSocket write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            while let Some(message) = stream.next().await {
                let frame = match message {
                    Ok(Message::Text(text)) => match Frame::decode(&text) {
                        Ok(frame) => Ok(frame),
                        Err(e) => {
                            tracing::warn!(error = %e, "Dropping undecodable frame");
                            continue;
                        }
                    },
                    Ok(Message::Close(reason)) => {
                        tracing::debug!(reason = ?reason, "WebSocket closed by server");
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => Err(ConnectionError::Transport(e.to_string())),
                };
                let failed = frame.is_err();
                if inbound_tx.send(frame).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(Link {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
