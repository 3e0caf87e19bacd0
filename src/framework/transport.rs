//! # Transport Adapter Boundary
//!
//! Broker-specific connection handling is an external collaborator. The
//! dispatch layer only needs four capabilities from it: declare a destination,
//! open a subscription, publish a payload and close the shared session.
//!
//! Inbound messages arrive as [`Delivery`] handles. A delivery must receive
//! exactly one terminal action: [`Delivery::ack`] or [`Delivery::reject`].
//! Both consume the handle, so taking a second action does not compile.

use crate::framework::binding::Transport;
use crate::framework::error::TransportError;
use async_trait::async_trait;
use tracing::warn;

// =============================================================================
// Deliveries
// =============================================================================

/// Broker-side half of a delivery's terminal action.
#[async_trait]
pub trait Acknowledger: Send + Sync {
    /// Permanently removes the message from its destination.
    async fn ack(self: Box<Self>) -> Result<(), TransportError>;

    /// Drops the message without requeueing it.
    async fn reject(self: Box<Self>) -> Result<(), TransportError>;
}

/// One inbound message plus its pending terminal action.
pub struct Delivery {
    destination: String,
    payload: Vec<u8>,
    acker: Option<Box<dyn Acknowledger>>,
}

impl Delivery {
    pub fn new(
        destination: impl Into<String>,
        payload: Vec<u8>,
        acker: Box<dyn Acknowledger>,
    ) -> Self {
        Self {
            destination: destination.into(),
            payload,
            acker: Some(acker),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Acknowledges the delivery.
    pub async fn ack(mut self) -> Result<(), TransportError> {
        match self.acker.take() {
            Some(acker) => acker.ack().await,
            None => Err(TransportError::Fault("delivery already settled".to_string())),
        }
    }

    /// Rejects the delivery without requeue.
    pub async fn reject(mut self) -> Result<(), TransportError> {
        match self.acker.take() {
            Some(acker) => acker.reject().await,
            None => Err(TransportError::Fault("delivery already settled".to_string())),
        }
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("destination", &self.destination)
            .field("payload_len", &self.payload.len())
            .field("settled", &self.acker.is_none())
            .finish()
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if self.acker.is_some() {
            warn!(
                destination = %self.destination,
                "Delivery dropped without a terminal action"
            );
        }
    }
}

// =============================================================================
// Subscriptions and sessions
// =============================================================================

/// The receiving end of one subscription.
///
/// `next` must be cancel-safe: if the returned future is dropped before it
/// completes, no delivery may be lost. Consumers rely on this when a shutdown
/// signal wins the race against an incoming delivery.
#[async_trait]
pub trait DeliveryStream: Send {
    /// Waits for the next delivery. `None` means the subscription ended.
    async fn next(&mut self) -> Option<Result<Delivery, TransportError>>;
}

pub type Subscription = Box<dyn DeliveryStream>;

/// Connection/session management for one broker.
///
/// The adapter is shared by the producer and every consumer of its transport.
/// Only the supervisor calls [`TransportAdapter::close`], after all consumers
/// have stopped.
#[async_trait]
pub trait TransportAdapter: Send + Sync + 'static {
    fn transport(&self) -> Transport;

    /// Ensures `destination` exists. Idempotent.
    async fn declare(&self, destination: &str) -> Result<(), TransportError>;

    /// Opens the single subscription of `destination`.
    async fn subscribe(&self, destination: &str) -> Result<Subscription, TransportError>;

    /// Transmits `payload` to `destination` once.
    async fn publish(&self, destination: &str, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Releases the shared session.
    async fn close(&self) -> Result<(), TransportError>;
}
