//! # Dispatch Supervisor
//!
//! Starts one [`Consumer`] per destination of a [`BindingTable`] and stops
//! them together.
//!
//! The supervisor owns the broadcast shutdown signal and the join handles of
//! its consumers; the number of handles always equals the table length. The
//! transport adapter is shared with the producer, and only [`SupervisorHandle::stop`]
//! closes it, after every consumer has reached `Stopped`. A failed start never
//! closes it.

use crate::framework::binding::{BindingTable, Transport};
use crate::framework::consumer::{Consumer, ConsumerExit, ConsumerReport};
use crate::framework::error::{StopError, TransportError};
use crate::framework::executor::Executors;
use crate::framework::transport::TransportAdapter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct Supervisor;

impl Supervisor {
    /// Declares every destination of `bindings`, subscribes to it and spawns
    /// its consumer.
    ///
    /// # Returns
    ///
    /// A [`SupervisorHandle`] owning one running consumer per descriptor.
    ///
    /// # Errors
    ///
    /// Returns the first [`TransportError`] raised while declaring or
    /// subscribing. Consumers spawned before the failure are signalled and
    /// joined before the error is returned; the adapter is left open.
    pub async fn start(
        bindings: Arc<BindingTable>,
        executors: Executors,
        adapter: Arc<dyn TransportAdapter>,
    ) -> Result<SupervisorHandle, TransportError> {
        let transport = bindings.transport();
        if adapter.transport() != transport {
            return Err(TransportError::Fault(format!(
                "{} adapter cannot serve {} destinations",
                adapter.transport(),
                transport
            )));
        }

        let (shutdown, _) = watch::channel(false);
        let mut handles = Vec::with_capacity(bindings.len());

        for descriptor in bindings.iter() {
            let subscription = match open(adapter.as_ref(), &descriptor.name).await {
                Ok(subscription) => subscription,
                Err(e) => {
                    error!(
                        %transport,
                        destination = %descriptor.name,
                        error = %e,
                        "Failed to subscribe, aborting start"
                    );
                    shutdown.send_replace(true);
                    for handle in handles {
                        let _ = handle.await;
                    }
                    return Err(e);
                }
            };

            let consumer = Consumer::new(
                descriptor.clone(),
                subscription,
                executors.clone(),
                shutdown.subscribe(),
            );
            handles.push(tokio::spawn(consumer.run()));
        }

        info!(%transport, consumers = handles.len(), "Dispatch started");
        Ok(SupervisorHandle {
            transport,
            adapter,
            shutdown,
            handles,
        })
    }
}

async fn open(
    adapter: &dyn TransportAdapter,
    destination: &str,
) -> Result<crate::framework::transport::Subscription, TransportError> {
    adapter.declare(destination).await?;
    adapter.subscribe(destination).await
}

/// Running consumers of one transport.
pub struct SupervisorHandle {
    transport: Transport,
    adapter: Arc<dyn TransportAdapter>,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<ConsumerReport>>,
}

impl SupervisorHandle {
    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Number of consumers started, equal to the binding table length.
    pub fn consumers(&self) -> usize {
        self.handles.len()
    }

    /// Consumers whose task has not finished yet.
    pub fn running(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Broadcasts shutdown, waits up to `deadline` for every consumer to stop,
    /// then closes the adapter.
    ///
    /// On timeout no consumer is aborted. The ones still running are handed to
    /// a background task that joins them and closes the adapter after the last
    /// one has settled its in-flight delivery.
    ///
    /// # Returns
    ///
    /// The [`ConsumerReport`] of every consumer, in binding-table order.
    ///
    /// # Errors
    ///
    /// - [`StopError::Timeout`] if a consumer is still running at the deadline.
    /// - [`StopError::Join`] if a consumer task panicked.
    /// - [`StopError::Transport`] if the adapter fails to close.
    pub async fn stop(self, deadline: Duration) -> Result<Vec<ConsumerReport>, StopError> {
        self.shut_down(deadline, true).await
    }

    /// Stops every consumer like [`stop`](Self::stop) but leaves the adapter
    /// open for its owner.
    pub async fn stop_consumers(self, deadline: Duration) -> Result<Vec<ConsumerReport>, StopError> {
        self.shut_down(deadline, false).await
    }

    async fn shut_down(
        mut self,
        deadline: Duration,
        close_adapter: bool,
    ) -> Result<Vec<ConsumerReport>, StopError> {
        // =====================================================================
        // 1. Broadcast
        // =====================================================================
        info!(transport = %self.transport, consumers = self.handles.len(), "Stopping dispatch");
        self.shutdown.send_replace(true);

        // =====================================================================
        // 2. Join in table order until the deadline
        // =====================================================================
        let mut outcomes = Vec::with_capacity(self.handles.len());
        let joined = tokio::time::timeout(deadline, async {
            for handle in self.handles.iter_mut() {
                outcomes.push(handle.await);
            }
        })
        .await;

        if joined.is_err() {
            // Handles before this index have completed and must not be polled again
            let remaining = self.handles.split_off(outcomes.len());
            let pending = remaining.iter().filter(|h| !h.is_finished()).count();
            warn!(transport = %self.transport, pending, ?deadline, "Consumers did not stop in time");
            if close_adapter {
                tokio::spawn(close_when_stopped(self.transport, self.adapter.clone(), remaining));
            }
            return Err(StopError::Timeout { deadline, pending });
        }

        let mut reports = Vec::with_capacity(outcomes.len());
        let mut failure = None;
        for outcome in outcomes {
            match outcome {
                Ok(report) => {
                    if let ConsumerExit::Transport(e) = &report.exit {
                        warn!(destination = %report.destination, error = %e, "Consumer had exited early");
                    }
                    reports.push(report);
                }
                Err(e) => {
                    error!(transport = %self.transport, error = %e, "Consumer task failed");
                    failure.get_or_insert(e);
                }
            }
        }

        // =====================================================================
        // 3. Release the session
        // =====================================================================
        if close_adapter {
            self.adapter.close().await?;
            info!(transport = %self.transport, "Dispatch stopped");
        } else {
            info!(transport = %self.transport, "Consumers stopped, transport left open");
        }

        match failure {
            Some(e) => Err(StopError::Join(e)),
            None => Ok(reports),
        }
    }
}

/// Joins consumers that outlived a stop deadline, then closes their adapter.
async fn close_when_stopped(
    transport: Transport,
    adapter: Arc<dyn TransportAdapter>,
    handles: Vec<JoinHandle<ConsumerReport>>,
) {
    for handle in handles {
        if let Err(e) = handle.await {
            error!(%transport, error = %e, "Consumer task failed");
        }
    }
    match adapter.close().await {
        Ok(()) => info!(%transport, "Dispatch stopped after deadline"),
        Err(e) => error!(%transport, error = %e, "Failed to close transport"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::InMemoryBroker;
    use crate::framework::binding::DestinationNames;
    use crate::framework::mock::MockExecutor;
    use crate::model::{Computer, User};

    fn idle_executors() -> Executors {
        Executors::new(
            MockExecutor::<User>::new().executor(),
            MockExecutor::<Computer>::new().executor(),
        )
    }

    #[tokio::test]
    async fn test_one_consumer_per_destination() {
        let broker = Arc::new(InMemoryBroker::new(Transport::RabbitMq));
        let table = Arc::new(
            BindingTable::for_transport(Transport::RabbitMq, &DestinationNames::default()).unwrap(),
        );

        let handle = Supervisor::start(table.clone(), idle_executors(), broker.clone())
            .await
            .unwrap();
        assert_eq!(handle.consumers(), table.len());
        assert_eq!(broker.destinations().len(), 6);

        let reports = handle.stop(Duration::from_secs(1)).await.unwrap();
        assert_eq!(reports.len(), 6);
        assert!(reports.iter().all(|r| r.exit == ConsumerExit::Shutdown));
        assert!(broker.is_closed());
    }

    #[tokio::test]
    async fn test_start_fails_when_destination_taken() {
        let broker = Arc::new(InMemoryBroker::new(Transport::Kafka));
        // Someone else already consumes the fourth destination
        let _other = broker.subscribe("COMPUTER_CREATED").await.unwrap();

        let table = Arc::new(
            BindingTable::for_transport(Transport::Kafka, &DestinationNames::default()).unwrap(),
        );
        let err = Supervisor::start(table, idle_executors(), broker.clone())
            .await
            .err()
            .unwrap();

        assert_eq!(err, TransportError::AlreadySubscribed("COMPUTER_CREATED".to_string()));
        assert!(!broker.is_closed());
        // The three consumers started before the failure released their queues
        assert!(broker.subscribe("USER_CREATED").await.is_ok());
    }

    #[tokio::test]
    async fn test_start_rejects_foreign_adapter() {
        let broker = Arc::new(InMemoryBroker::new(Transport::Kafka));
        let table = Arc::new(
            BindingTable::for_transport(Transport::RabbitMq, &DestinationNames::default()).unwrap(),
        );

        let result = Supervisor::start(table, idle_executors(), broker).await;
        assert!(matches!(result, Err(TransportError::Fault(_))));
    }

    #[tokio::test]
    async fn test_adapter_closes_once_late_consumer_stops() {
        let users = MockExecutor::<User>::new();
        let mut computers = MockExecutor::<Computer>::new();
        computers
            .expect_delete("late")
            .after(Duration::from_millis(300))
            .return_ok("late".to_string());

        let broker = Arc::new(InMemoryBroker::new(Transport::RabbitMq));
        let table = Arc::new(
            BindingTable::for_transport(Transport::RabbitMq, &DestinationNames::default()).unwrap(),
        );
        let handle = Supervisor::start(
            table,
            Executors::new(users.executor(), computers.executor()),
            broker.clone(),
        )
        .await
        .unwrap();

        broker.publish("COMPUTER_DELETED", b"late".to_vec()).await.unwrap();
        while computers.calls().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let err = handle.stop(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, StopError::Timeout { pending: 1, .. }));
        assert!(!broker.is_closed());

        broker.wait_for_outcomes("COMPUTER_DELETED", 1).await;
        tokio::time::timeout(Duration::from_secs(2), async {
            while !broker.is_closed() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("adapter was never closed");
        computers.verify();
    }

    #[tokio::test]
    async fn test_stop_consumers_leaves_adapter_open() {
        let broker = Arc::new(InMemoryBroker::new(Transport::Kafka));
        let table = Arc::new(
            BindingTable::for_transport(Transport::Kafka, &DestinationNames::default()).unwrap(),
        );
        let handle = Supervisor::start(table, idle_executors(), broker.clone())
            .await
            .unwrap();

        let reports = handle.stop_consumers(Duration::from_secs(1)).await.unwrap();

        assert_eq!(reports.len(), 6);
        assert!(!broker.is_closed());
        assert!(broker.subscribe("USER_DELETED").await.is_ok());
    }
}
