//! Client configuration from the environment

use crate::connection::{
    ConnectOptions, Credentials, PollingTransport, ReconnectPolicy, Transport, WebSocketTransport,
};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3002";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a whole number of milliseconds, got {value:?}")]
    InvalidDuration { var: &'static str, value: String },
    #[error("Unknown transport {0:?} (expected websocket or polling)")]
    UnknownTransport(String),
    #[error("HELIX_TRANSPORTS must name at least one transport")]
    NoTransports,
    #[error("HELIX_RECONNECT_MAX_MS ({max:?}) is below HELIX_RECONNECT_INITIAL_MS ({initial:?})")]
    InvertedBackoff { initial: Duration, max: Duration },
}

/// Transport tier selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    WebSocket,
    Polling,
}

impl TransportKind {
    fn build(self) -> Arc<dyn Transport> {
        match self {
            TransportKind::WebSocket => Arc::new(WebSocketTransport::new()),
            TransportKind::Polling => Arc::new(PollingTransport::new()),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::WebSocket => f.write_str("websocket"),
            TransportKind::Polling => f.write_str("polling"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "websocket" | "ws" => Ok(TransportKind::WebSocket),
            "polling" | "poll" => Ok(TransportKind::Polling),
            _ => Err(ConfigError::UnknownTransport(s.trim().to_string())),
        }
    }
}

/// Everything the binary needs to open a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub credentials: Option<Credentials>,
    pub transports: Vec<TransportKind>,
    pub policy: ReconnectPolicy,
    /// Persona to choose right after startup
    pub persona: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credentials: None,
            transports: vec![TransportKind::WebSocket, TransportKind::Polling],
            policy: ReconnectPolicy::default(),
            persona: None,
        }
    }
}

impl ClientConfig {
    /// Read `HELIX_*` variables, falling back to defaults for anything unset
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let endpoint = var("HELIX_ENDPOINT").unwrap_or(defaults.endpoint);

        let credentials = var("HELIX_AUTH_TOKEN").map(|token| Credentials {
            token,
            identity: var("HELIX_IDENTITY"),
        });

        let transports = match var("HELIX_TRANSPORTS") {
            Some(list) => {
                let kinds = list
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(TransportKind::from_str)
                    .collect::<Result<Vec<_>, _>>()?;
                if kinds.is_empty() {
                    return Err(ConfigError::NoTransports);
                }
                kinds
            }
            None => defaults.transports,
        };

        let duration = |name: &'static str, fallback: Duration| -> Result<Duration, ConfigError> {
            match var(name) {
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::InvalidDuration { var: name, value }),
                None => Ok(fallback),
            }
        };

        let policy = ReconnectPolicy {
            initial_delay: duration("HELIX_RECONNECT_INITIAL_MS", defaults.policy.initial_delay)?,
            max_delay: duration("HELIX_RECONNECT_MAX_MS", defaults.policy.max_delay)?,
            connect_timeout: duration("HELIX_CONNECT_TIMEOUT_MS", defaults.policy.connect_timeout)?,
            jitter: defaults.policy.jitter,
        };
        if policy.max_delay < policy.initial_delay {
            return Err(ConfigError::InvertedBackoff {
                initial: policy.initial_delay,
                max: policy.max_delay,
            });
        }

        Ok(Self {
            endpoint,
            credentials,
            transports,
            policy,
            persona: var("HELIX_PERSONA"),
        })
    }

    /// Options for [`crate::connection::ConnectionManager::connect`]
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions::new(self.transports.iter().copied().map(TransportKind::build).collect())
            .with_policy(self.policy.clone())
            .with_credentials(self.credentials.clone())
    }
}
