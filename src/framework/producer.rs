//! # Producer
//!
//! Publishes encoded commands to named destinations of one transport.
//!
//! A producer never opens its own connection: it holds the same long-lived
//! [`TransportAdapter`] session as the consumers of its transport. Each call
//! transmits exactly once; there is no retry.

use crate::framework::binding::{BindingTable, Transport};
use crate::framework::command::Command;
use crate::framework::error::PublishError;
use crate::framework::transport::TransportAdapter;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Cheap to clone; all clones share the adapter session.
///
/// # Example
///
/// ```ignore
/// let producer = Producer::new(broker.clone(), bindings.clone());
///
/// // By destination name
/// producer.publish("USER_DELETED", b"u-123".to_vec()).await?;
///
/// // By command, resolving the destination from the binding table
/// let command = Command::CreateUser(User::new("u-1", "Alice", 28, "a@x.com"));
/// producer.publish_command(&command).await?;
/// ```
#[derive(Clone)]
pub struct Producer {
    adapter: Arc<dyn TransportAdapter>,
    bindings: Arc<BindingTable>,
}

impl Producer {
    pub fn new(adapter: Arc<dyn TransportAdapter>, bindings: Arc<BindingTable>) -> Self {
        Self { adapter, bindings }
    }

    pub fn transport(&self) -> Transport {
        self.adapter.transport()
    }

    /// Publishes `payload` to `destination`.
    #[instrument(skip(self, payload), fields(transport = %self.adapter.transport(), bytes = payload.len()))]
    pub async fn publish(&self, destination: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        match self.adapter.publish(destination, payload).await {
            Ok(()) => {
                debug!("Published");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Publish failed");
                Err(e.into())
            }
        }
    }

    /// Publishes with a bounded wait, as request handlers do.
    ///
    /// # Errors
    ///
    /// [`PublishError::Timeout`] if the adapter has not answered within
    /// `timeout`. The write may still reach the broker afterwards.
    pub async fn publish_with_timeout(
        &self,
        destination: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<(), PublishError> {
        tokio::time::timeout(timeout, self.publish(destination, payload))
            .await
            .map_err(|_| PublishError::Timeout(timeout))?
    }

    /// Encodes `command` and publishes it to the destination bound to it.
    #[instrument(skip(self, command), fields(operation = %command.binding()))]
    pub async fn publish_command(&self, command: &Command) -> Result<(), PublishError> {
        let binding = command.binding();
        let destination = self
            .bindings
            .destination_for(binding)
            .ok_or_else(|| PublishError::Unbound {
                transport: self.bindings.transport(),
                operation: binding.to_string(),
            })?;

        let payload = command.encode()?;
        self.publish(&destination.name, payload).await
    }
}
