//! # Per-Destination Consumer
//!
//! A [`Consumer`] owns one subscription and processes its deliveries one at a
//! time, in the order the transport yields them:
//!
//! 1. **Decode** the payload with the binding resolved at subscription time.
//! 2. **Dispatch** the command to the matching [`CommandExecutor`](crate::framework::CommandExecutor).
//! 3. **Settle** the delivery: acknowledge on success, reject without requeue
//!    on a decode or executor failure. Nothing is retried.
//!
//! ## State machine
//!
//! ```text
//! Idle ──subscribe──▶ Running ──shutdown──▶ Draining ──▶ Stopped
//!                        │                                  ▲
//!                        └──────── transport failure ───────┘
//! ```
//!
//! While `Running`, the consumer suspends on "next delivery OR shutdown" and
//! nothing else. A delivery that has been pulled is always settled before the
//! shutdown signal is looked at again, so stopping never leaks an unsettled
//! delivery. Deliveries still queued on the broker side are left there.

use crate::framework::binding::{DestinationDescriptor, Transport};
use crate::framework::command::Command;
use crate::framework::error::TransportError;
use crate::framework::executor::Executors;
use crate::framework::transport::{Delivery, DeliveryStream, Subscription};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

// =============================================================================
// State and reports
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Running,
    Draining,
    Stopped,
}

/// Why a consumer left its loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerExit {
    /// The supervisor asked it to stop.
    Shutdown,
    /// The subscription failed; the destination stays undelivered until restart.
    Transport(TransportError),
}

/// Final tally of one consumer, returned when its task finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport {
    pub transport: Transport,
    pub destination: String,
    pub received: u64,
    pub acknowledged: u64,
    pub rejected: u64,
    pub exit: ConsumerExit,
}

enum Settlement {
    Ack,
    Reject,
}

// =============================================================================
// Consumer loop
// =============================================================================

/// Drives one subscription until shutdown or transport failure.
pub struct Consumer {
    descriptor: DestinationDescriptor,
    subscription: Subscription,
    executors: Executors,
    shutdown: watch::Receiver<bool>,
    state: ConsumerState,
    received: u64,
    acknowledged: u64,
    rejected: u64,
}

impl Consumer {
    pub fn new(
        descriptor: DestinationDescriptor,
        subscription: Subscription,
        executors: Executors,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            descriptor,
            subscription,
            executors,
            shutdown,
            state: ConsumerState::Idle,
            received: 0,
            acknowledged: 0,
            rejected: 0,
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Runs the consumer loop to completion.
    ///
    /// Decode and executor failures only affect the delivery at hand. The loop
    /// ends on the shutdown signal or on a transport failure.
    pub async fn run(mut self) -> ConsumerReport {
        self.transition(ConsumerState::Running);
        info!(
            transport = %self.descriptor.transport,
            destination = %self.descriptor.name,
            operation = %self.descriptor.binding,
            "Consumer started"
        );

        let exit = loop {
            let next = tokio::select! {
                biased;
                _ = shutdown_requested(&mut self.shutdown) => None,
                next = self.subscription.next() => Some(next),
            };

            match next {
                None => {
                    self.transition(ConsumerState::Draining);
                    break ConsumerExit::Shutdown;
                }
                Some(None) => {
                    let err = TransportError::StreamEnded(self.descriptor.name.clone());
                    error!(destination = %self.descriptor.name, error = %err, "Subscription lost");
                    break ConsumerExit::Transport(err);
                }
                Some(Some(Err(err))) => {
                    error!(destination = %self.descriptor.name, error = %err, "Transport failure");
                    break ConsumerExit::Transport(err);
                }
                Some(Some(Ok(delivery))) => {
                    if let Err(err) = self.handle(delivery).await {
                        error!(
                            destination = %self.descriptor.name,
                            error = %err,
                            "Failed to settle delivery"
                        );
                        break ConsumerExit::Transport(err);
                    }
                }
            }
        };

        self.transition(ConsumerState::Stopped);
        info!(
            destination = %self.descriptor.name,
            received = self.received,
            acknowledged = self.acknowledged,
            rejected = self.rejected,
            "Consumer stopped"
        );

        ConsumerReport {
            transport: self.descriptor.transport,
            destination: self.descriptor.name,
            received: self.received,
            acknowledged: self.acknowledged,
            rejected: self.rejected,
            exit,
        }
    }

    async fn handle(&mut self, delivery: Delivery) -> Result<(), TransportError> {
        self.received += 1;
        let binding = self.descriptor.binding;
        debug!(
            destination = %self.descriptor.name,
            payload = %String::from_utf8_lossy(delivery.payload()),
            "Received"
        );

        let command = match Command::decode(binding, delivery.payload()) {
            Ok(command) => command,
            Err(e) => {
                warn!(
                    destination = %self.descriptor.name,
                    operation = %binding,
                    error = %e,
                    "Decode failed, rejecting"
                );
                return self.settle(delivery, Settlement::Reject).await;
            }
        };

        match self.executors.execute(command).await {
            Ok(outcome) => {
                info!(destination = %self.descriptor.name, operation = %binding, ?outcome, "Executed");
                self.settle(delivery, Settlement::Ack).await
            }
            Err(e) => {
                error!(
                    destination = %self.descriptor.name,
                    operation = %binding,
                    error = %e,
                    "Executor failed, rejecting"
                );
                self.settle(delivery, Settlement::Reject).await
            }
        }
    }

    async fn settle(
        &mut self,
        delivery: Delivery,
        settlement: Settlement,
    ) -> Result<(), TransportError> {
        match settlement {
            Settlement::Ack => {
                delivery.ack().await?;
                self.acknowledged += 1;
            }
            Settlement::Reject => {
                delivery.reject().await?;
                self.rejected += 1;
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: ConsumerState) {
        debug!(destination = %self.descriptor.name, from = ?self.state, to = ?next, "State");
        self.state = next;
    }
}

/// Resolves once shutdown is requested. A dropped sender counts as a request.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{InMemoryBroker, Outcome};
    use crate::framework::binding::{Binding, EntityKind, OperationKind};
    use crate::framework::error::ExecutorError;
    use crate::framework::mock::MockExecutor;
    use crate::framework::transport::TransportAdapter;
    use crate::model::{Computer, User};

    fn descriptor(name: &str, entity: EntityKind, operation: OperationKind) -> DestinationDescriptor {
        DestinationDescriptor::new(Transport::RabbitMq, name, Binding::new(entity, operation))
    }

    #[tokio::test]
    async fn test_consumer_acks_and_rejects() {
        let broker = InMemoryBroker::new(Transport::RabbitMq);
        let subscription = broker.subscribe("USER_DELETED").await.unwrap();

        let mut users = MockExecutor::<User>::new();
        users.expect_delete("u-1").return_ok("u-1".to_string());
        users.expect_delete("u-2").return_err(ExecutorError::NotFound("u-2".to_string()));
        let computers = MockExecutor::<Computer>::new();
        let executors = Executors::new(users.executor(), computers.executor());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let consumer = Consumer::new(
            descriptor("USER_DELETED", EntityKind::User, OperationKind::Delete),
            subscription,
            executors,
            shutdown_rx,
        );
        assert_eq!(consumer.state(), ConsumerState::Idle);
        let task = tokio::spawn(consumer.run());

        broker.publish("USER_DELETED", b"u-1".to_vec()).await.unwrap();
        broker.publish("USER_DELETED", b"u-2".to_vec()).await.unwrap();
        broker.wait_for_outcomes("USER_DELETED", 2).await;

        shutdown_tx.send(true).unwrap();
        let report = task.await.unwrap();

        assert_eq!(report.exit, ConsumerExit::Shutdown);
        assert_eq!(report.received, 2);
        assert_eq!(report.acknowledged, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(
            broker.outcomes("USER_DELETED"),
            vec![Outcome::Acked(b"u-1".to_vec()), Outcome::Rejected(b"u-2".to_vec())]
        );
        users.verify();
    }

    #[tokio::test]
    async fn test_consumer_exits_on_transport_fault() {
        let broker = InMemoryBroker::new(Transport::Kafka);
        let subscription = broker.subscribe("COMPUTER_CREATED").await.unwrap();
        let executors = Executors::new(
            MockExecutor::<User>::new().executor(),
            MockExecutor::<Computer>::new().executor(),
        );

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let consumer = Consumer::new(
            DestinationDescriptor::new(
                Transport::Kafka,
                "COMPUTER_CREATED",
                Binding::new(EntityKind::Computer, OperationKind::Create),
            ),
            subscription,
            executors,
            shutdown_rx,
        );
        let task = tokio::spawn(consumer.run());

        broker.inject_fault("COMPUTER_CREATED", "partition revoked");
        let report = task.await.unwrap();

        assert_eq!(
            report.exit,
            ConsumerExit::Transport(TransportError::Fault("partition revoked".to_string()))
        );
        assert_eq!(report.received, 0);
    }

    #[tokio::test]
    async fn test_consumer_stops_when_already_signalled() {
        let broker = InMemoryBroker::new(Transport::RabbitMq);
        let subscription = broker.subscribe("USER_CREATED").await.unwrap();
        broker.publish("USER_CREATED", b"{}".to_vec()).await.unwrap();

        let executors = Executors::new(
            MockExecutor::<User>::new().executor(),
            MockExecutor::<Computer>::new().executor(),
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();

        let report = Consumer::new(
            descriptor("USER_CREATED", EntityKind::User, OperationKind::Create),
            subscription,
            executors,
            shutdown_rx,
        )
        .run()
        .await;

        // Shutdown wins the race; the queued message is never pulled
        assert_eq!(report.exit, ConsumerExit::Shutdown);
        assert_eq!(report.received, 0);
        assert!(broker.outcomes("USER_CREATED").is_empty());
        assert_eq!(broker.pending("USER_CREATED"), 1);
    }
}
