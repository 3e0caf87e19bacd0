use crate::config::DispatchConfig;
use crate::framework::{
    BindingTable, ConsumerReport, DispatchError, Executors, Producer, Supervisor,
    SupervisorHandle, Transport, TransportAdapter,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

// =============================================================================
// Endpoint
// =============================================================================

/// One transport's binding table and adapter session.
#[derive(Clone)]
pub struct Endpoint {
    pub bindings: Arc<BindingTable>,
    pub adapter: Arc<dyn TransportAdapter>,
}

impl Endpoint {
    pub fn new(bindings: BindingTable, adapter: Arc<dyn TransportAdapter>) -> Self {
        Self {
            bindings: Arc::new(bindings),
            adapter,
        }
    }
}

// =============================================================================
// DispatchSystem
// =============================================================================

/// The runtime orchestrator for both transports.
///
/// `DispatchSystem` is responsible for:
/// - **Lifecycle Management**: Starting and stopping the consumers of the
///   topic transport and the queue transport side by side
/// - **Dependency Wiring**: Sharing one set of executors between all consumers
///   and one adapter session between each transport's consumers and producer
///
/// # Example
///
/// ```ignore
/// let system = DispatchSystem::start(executors, kafka, rabbitmq).await?;
///
/// system.producer(Transport::Kafka).publish_command(&command).await?;
///
/// let reports = system.stop(Duration::from_secs(10)).await?;
/// ```
pub struct DispatchSystem {
    kafka_producer: Producer,
    rabbitmq_producer: Producer,
    kafka: SupervisorHandle,
    rabbitmq: SupervisorHandle,
}

impl DispatchSystem {
    /// Starts one supervisor per transport.
    ///
    /// This method:
    /// 1. Builds one producer per transport on the transport's adapter
    /// 2. Starts the topic transport's consumers
    /// 3. Starts the queue transport's consumers
    ///
    /// If the queue transport fails to start, the topic transport's consumers
    /// are stopped again before the error is returned. Neither adapter is
    /// closed: both belong to the caller.
    ///
    /// # Returns
    ///
    /// A `DispatchSystem` with one consumer running per destination of both
    /// binding tables.
    pub async fn start(
        executors: Executors,
        kafka: Endpoint,
        rabbitmq: Endpoint,
    ) -> Result<Self, DispatchError> {
        // 1. Producers share the consumers' sessions
        let kafka_producer = Producer::new(kafka.adapter.clone(), kafka.bindings.clone());
        let rabbitmq_producer = Producer::new(rabbitmq.adapter.clone(), rabbitmq.bindings.clone());

        // 2. Topic transport
        let kafka_handle =
            Supervisor::start(kafka.bindings, executors.clone(), kafka.adapter).await?;

        // 3. Queue transport, unwinding the topic transport on failure
        let rabbitmq_handle =
            match Supervisor::start(rabbitmq.bindings, executors, rabbitmq.adapter).await {
                Ok(handle) => handle,
                Err(e) => {
                    error!(error = %e, "Queue transport failed to start, stopping topic transport");
                    if let Err(stop) = kafka_handle.stop_consumers(Duration::from_secs(1)).await {
                        error!(error = %stop, "Topic transport did not stop cleanly");
                    }
                    return Err(e.into());
                }
            };

        info!(
            kafka = kafka_handle.consumers(),
            rabbitmq = rabbitmq_handle.consumers(),
            "Dispatch system started"
        );

        Ok(Self {
            kafka_producer,
            rabbitmq_producer,
            kafka: kafka_handle,
            rabbitmq: rabbitmq_handle,
        })
    }

    /// Builds both binding tables from `config` and starts the system.
    pub async fn from_config(
        config: &DispatchConfig,
        executors: Executors,
        kafka: Arc<dyn TransportAdapter>,
        rabbitmq: Arc<dyn TransportAdapter>,
    ) -> Result<Self, DispatchError> {
        let kafka = Endpoint::new(config.binding_table(Transport::Kafka)?, kafka);
        let rabbitmq = Endpoint::new(config.binding_table(Transport::RabbitMq)?, rabbitmq);
        Self::start(executors, kafka, rabbitmq).await
    }

    /// The producer sharing `transport`'s session.
    pub fn producer(&self, transport: Transport) -> &Producer {
        match transport {
            Transport::Kafka => &self.kafka_producer,
            Transport::RabbitMq => &self.rabbitmq_producer,
        }
    }

    /// Total number of running consumers across both transports.
    pub fn running(&self) -> usize {
        self.kafka.running() + self.rabbitmq.running()
    }

    /// Stops both transports concurrently, each under `deadline`.
    ///
    /// This method:
    /// 1. Broadcasts shutdown to both supervisors at once
    /// 2. Waits for each to drain its consumers and close its adapter
    /// 3. Merges the reports, or returns the first error
    ///
    /// # Returns
    ///
    /// - `Ok(reports)` with every consumer's report, topic transport first
    /// - `Err(DispatchError::Stop)` if either side failed; the other side has
    ///   still been given the chance to stop
    pub async fn stop(self, deadline: Duration) -> Result<Vec<ConsumerReport>, DispatchError> {
        info!("Shutting down dispatch system...");

        // 1 & 2. Both sides drain in parallel
        let (kafka, rabbitmq) = tokio::join!(self.kafka.stop(deadline), self.rabbitmq.stop(deadline));

        // 3. Merge
        match (kafka, rabbitmq) {
            (Ok(mut reports), Ok(more)) => {
                reports.extend(more);
                info!(consumers = reports.len(), "Dispatch system shutdown complete.");
                Ok(reports)
            }
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => {
                error!(error = %e, "Dispatch system shutdown failed");
                Err(e.into())
            }
            (Err(e), Err(second)) => {
                error!(error = %second, "Queue transport also failed to stop");
                error!(error = %e, "Dispatch system shutdown failed");
                Err(e.into())
            }
        }
    }
}
