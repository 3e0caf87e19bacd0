//! In-memory transport adapter for tests and single-process runs.
//!
//! [`InMemoryBroker`] implements [`TransportAdapter`] for one transport:
//! - Destinations are FIFO queues, created on declare or on first publish
//! - Each destination accepts a single subscriber at a time
//! - Every terminal action is recorded per destination ([`InMemoryBroker::outcomes`])
//! - [`TransportAdapter::close`] ends all subscriptions and fails later publishes
//! - [`InMemoryBroker::inject_fault`] pushes a transport failure into a stream

use crate::framework::binding::Transport;
use crate::framework::error::TransportError;
use crate::framework::transport::{
    Acknowledger, Delivery, DeliveryStream, Subscription, TransportAdapter,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Notify};
use tracing::debug;

/// Terminal action taken on a delivered payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Acked(Vec<u8>),
    Rejected(Vec<u8>),
}

enum Frame {
    Message(Vec<u8>),
    Fault(String),
}

#[derive(Default)]
struct Queue {
    frames: VecDeque<Frame>,
    notify: Arc<Notify>,
    subscribed: bool,
    outcomes: Vec<Outcome>,
}

#[derive(Default)]
struct State {
    closed: bool,
    queues: HashMap<String, Queue>,
}

struct Inner {
    transport: Transport,
    state: Mutex<State>,
    /// Bumped on every recorded outcome.
    settled: watch::Sender<u64>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, destination: &str, outcome: Outcome) -> Result<(), TransportError> {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(TransportError::Closed);
            }
            state
                .queues
                .entry(destination.to_string())
                .or_default()
                .outcomes
                .push(outcome);
        }
        self.settled.send_modify(|n| *n += 1);
        Ok(())
    }
}

/// Thread-safe, cheap to clone; clones share the same queues.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<Inner>,
}

impl InMemoryBroker {
    pub fn new(transport: Transport) -> Self {
        let (settled, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                transport,
                state: Mutex::new(State::default()),
                settled,
            }),
        }
    }

    /// Declared or auto-created destinations, sorted by name.
    pub fn destinations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().queues.keys().cloned().collect();
        names.sort();
        names
    }

    /// Messages published to `destination` and not yet pulled by a consumer.
    pub fn pending(&self, destination: &str) -> usize {
        self.inner
            .lock()
            .queues
            .get(destination)
            .map(|q| {
                q.frames
                    .iter()
                    .filter(|f| matches!(f, Frame::Message(_)))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Terminal actions taken on `destination`, in order.
    pub fn outcomes(&self, destination: &str) -> Vec<Outcome> {
        self.inner
            .lock()
            .queues
            .get(destination)
            .map(|q| q.outcomes.clone())
            .unwrap_or_default()
    }

    /// Waits until `destination` has at least `count` recorded outcomes.
    pub async fn wait_for_outcomes(&self, destination: &str, count: usize) {
        let mut settled = self.inner.settled.subscribe();
        let _ = settled
            .wait_for(|_| self.outcomes(destination).len() >= count)
            .await;
    }

    /// Makes the subscription of `destination` yield a transport failure
    /// after the messages already queued.
    pub fn inject_fault(&self, destination: &str, reason: impl Into<String>) {
        let mut state = self.inner.lock();
        let queue = state.queues.entry(destination.to_string()).or_default();
        queue.frames.push_back(Frame::Fault(reason.into()));
        queue.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

#[async_trait]
impl TransportAdapter for InMemoryBroker {
    fn transport(&self) -> Transport {
        self.inner.transport
    }

    async fn declare(&self, destination: &str) -> Result<(), TransportError> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        state.queues.entry(destination.to_string()).or_default();
        debug!(transport = %self.inner.transport, destination, "Declared");
        Ok(())
    }

    async fn subscribe(&self, destination: &str) -> Result<Subscription, TransportError> {
        let notify = {
            let mut state = self.inner.lock();
            if state.closed {
                return Err(TransportError::Closed);
            }
            let queue = state.queues.entry(destination.to_string()).or_default();
            if queue.subscribed {
                return Err(TransportError::AlreadySubscribed(destination.to_string()));
            }
            queue.subscribed = true;
            queue.notify.clone()
        };

        debug!(transport = %self.inner.transport, destination, "Subscribed");
        Ok(Box::new(MemoryStream {
            inner: self.inner.clone(),
            destination: destination.to_string(),
            notify,
        }))
    }

    async fn publish(&self, destination: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        let queue = state.queues.entry(destination.to_string()).or_default();
        queue.frames.push_back(Frame::Message(payload));
        queue.notify.notify_one();
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut state = self.inner.lock();
        if !state.closed {
            state.closed = true;
            for queue in state.queues.values() {
                queue.notify.notify_one();
            }
            debug!(transport = %self.inner.transport, "Closed");
        }
        Ok(())
    }
}

struct MemoryStream {
    inner: Arc<Inner>,
    destination: String,
    notify: Arc<Notify>,
}

#[async_trait]
impl DeliveryStream for MemoryStream {
    async fn next(&mut self) -> Option<Result<Delivery, TransportError>> {
        loop {
            {
                let mut state = self.inner.lock();
                if state.closed {
                    return None;
                }
                let frame = state
                    .queues
                    .get_mut(&self.destination)
                    .and_then(|q| q.frames.pop_front());
                match frame {
                    Some(Frame::Message(payload)) => {
                        let acker = MemoryAcker {
                            inner: self.inner.clone(),
                            destination: self.destination.clone(),
                            payload: payload.clone(),
                        };
                        return Some(Ok(Delivery::new(
                            self.destination.clone(),
                            payload,
                            Box::new(acker),
                        )));
                    }
                    Some(Frame::Fault(reason)) => return Some(Err(TransportError::Fault(reason))),
                    None => {}
                }
            }
            // A single waiter per queue, so a stored permit is never lost
            self.notify.notified().await;
        }
    }
}

impl Drop for MemoryStream {
    fn drop(&mut self) {
        if let Some(queue) = self.inner.lock().queues.get_mut(&self.destination) {
            queue.subscribed = false;
        }
    }
}

struct MemoryAcker {
    inner: Arc<Inner>,
    destination: String,
    payload: Vec<u8>,
}

#[async_trait]
impl Acknowledger for MemoryAcker {
    async fn ack(self: Box<Self>) -> Result<(), TransportError> {
        self.inner
            .record(&self.destination, Outcome::Acked(self.payload.clone()))
    }

    async fn reject(self: Box<Self>) -> Result<(), TransportError> {
        self.inner
            .record(&self.destination, Outcome::Rejected(self.payload.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_delivery_and_outcomes() {
        let broker = InMemoryBroker::new(Transport::RabbitMq);
        broker.publish("Q", b"one".to_vec()).await.unwrap();
        broker.publish("Q", b"two".to_vec()).await.unwrap();

        let mut stream = broker.subscribe("Q").await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.payload(), b"one");
        assert_eq!(first.destination(), "Q");
        first.ack().await.unwrap();

        let second = stream.next().await.unwrap().unwrap();
        second.reject().await.unwrap();

        assert_eq!(
            broker.outcomes("Q"),
            vec![Outcome::Acked(b"one".to_vec()), Outcome::Rejected(b"two".to_vec())]
        );
        assert_eq!(broker.pending("Q"), 0);
    }

    #[tokio::test]
    async fn test_single_subscriber_per_destination() {
        let broker = InMemoryBroker::new(Transport::Kafka);
        let stream = broker.subscribe("Q").await.unwrap();

        let err = broker.subscribe("Q").await.err().unwrap();
        assert_eq!(err, TransportError::AlreadySubscribed("Q".to_string()));

        drop(stream);
        assert!(broker.subscribe("Q").await.is_ok());
    }

    #[tokio::test]
    async fn test_close_ends_streams_and_publishes() {
        let broker = InMemoryBroker::new(Transport::Kafka);
        broker.declare("Q").await.unwrap();
        let mut stream = broker.subscribe("Q").await.unwrap();

        let waiter = tokio::spawn(async move { stream.next().await.is_none() });
        broker.close().await.unwrap();

        assert!(waiter.await.unwrap());
        assert_eq!(
            broker.publish("Q", b"late".to_vec()).await,
            Err(TransportError::Closed)
        );
        assert_eq!(broker.declare("R").await, Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn test_wakes_waiting_subscriber() {
        let broker = InMemoryBroker::new(Transport::RabbitMq);
        let mut stream = broker.subscribe("Q").await.unwrap();

        let reader = tokio::spawn(async move {
            let delivery = stream.next().await.unwrap().unwrap();
            let payload = delivery.payload().to_vec();
            delivery.ack().await.unwrap();
            payload
        });

        broker.publish("Q", b"late".to_vec()).await.unwrap();
        assert_eq!(reader.await.unwrap(), b"late".to_vec());
        broker.wait_for_outcomes("Q", 1).await;
    }
}
