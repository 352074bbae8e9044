//! Trait abstractions for runtime I/O
//!
//! The runtime only needs to put requests on the channel; inbound traffic
//! arrives as a plain receiver. Keeping the send side behind a trait lets the
//! executor run against a recording mock.

use crate::connection::{ConnectionError, ConnectionHandle};
use crate::protocol::Outbound;
use async_trait::async_trait;
use std::sync::Arc;

/// Outbound half of the event channel
#[async_trait]
pub trait Channel: Send + Sync {
    /// Hand one request to the transport. Must fail fast when no link is up.
    async fn send(&self, request: &Outbound) -> Result<(), ConnectionError>;
}

// ============================================================================
// Arc implementation for trait objects
// ============================================================================

#[async_trait]
impl<T: Channel + ?Sized> Channel for Arc<T> {
    async fn send(&self, request: &Outbound) -> Result<(), ConnectionError> {
        (**self).send(request).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

#[async_trait]
impl Channel for ConnectionHandle {
    async fn send(&self, request: &Outbound) -> Result<(), ConnectionError> {
        ConnectionHandle::send(self, request).await
    }
}
