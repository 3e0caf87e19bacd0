//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through the environment variable
//! named next to it. Destination names default to the six standard names and
//! are set per transport: the same destination may carry a different name on
//! the topic transport and on the queue transport.
//!
//! Broker connection settings are not part of this configuration. Both
//! transports are served by [`InMemoryBroker`](crate::broker::InMemoryBroker)
//! in this binary; a networked adapter brings its own settings.

use crate::framework::{BindingError, BindingTable, DestinationNames, Transport};
use clap::{Args, Parser};
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Consumes CRUD commands from Kafka and RabbitMQ destinations", long_about = None)]
pub struct DispatchConfig {
    #[command(flatten)]
    pub kafka: KafkaArgs,

    #[command(flatten)]
    pub rabbitmq: RabbitMqArgs,

    /// Seconds to wait for consumers to drain on shutdown.
    #[arg(long = "shutdown-timeout", env = "SHUTDOWN_TIMEOUT", default_value_t = 10)]
    pub shutdown_timeout_secs: u64,

    /// Seconds a publish may take before it is reported as timed out.
    #[arg(long = "publish-timeout", env = "PUBLISH_TIMEOUT", default_value_t = 5)]
    pub publish_timeout_secs: u64,
}

/// Topic names of the topic transport.
#[derive(Args, Debug, Clone)]
pub struct KafkaArgs {
    #[arg(long = "kafka-topic-user-created", env = "KAFKA_TOPIC_USER_CREATED", default_value = "USER_CREATED")]
    pub kafka_user_created: String,

    #[arg(long = "kafka-topic-user-updated", env = "KAFKA_TOPIC_USER_UPDATED", default_value = "USER_UPDATED")]
    pub kafka_user_updated: String,

    #[arg(long = "kafka-topic-user-deleted", env = "KAFKA_TOPIC_USER_DELETED", default_value = "USER_DELETED")]
    pub kafka_user_deleted: String,

    #[arg(long = "kafka-topic-computer-created", env = "KAFKA_TOPIC_COMPUTER_CREATED", default_value = "COMPUTER_CREATED")]
    pub kafka_computer_created: String,

    #[arg(long = "kafka-topic-computer-updated", env = "KAFKA_TOPIC_COMPUTER_UPDATED", default_value = "COMPUTER_UPDATED")]
    pub kafka_computer_updated: String,

    #[arg(long = "kafka-topic-computer-deleted", env = "KAFKA_TOPIC_COMPUTER_DELETED", default_value = "COMPUTER_DELETED")]
    pub kafka_computer_deleted: String,
}

/// Queue names of the queue transport.
#[derive(Args, Debug, Clone)]
pub struct RabbitMqArgs {
    #[arg(long = "rabbitmq-queue-user-created", env = "RabbitMQ_QUEUE_USER_CREATED", default_value = "USER_CREATED")]
    pub rabbitmq_user_created: String,

    #[arg(long = "rabbitmq-queue-user-updated", env = "RabbitMQ_QUEUE_USER_UPDATED", default_value = "USER_UPDATED")]
    pub rabbitmq_user_updated: String,

    #[arg(long = "rabbitmq-queue-user-deleted", env = "RabbitMQ_QUEUE_USER_DELETED", default_value = "USER_DELETED")]
    pub rabbitmq_user_deleted: String,

    #[arg(long = "rabbitmq-queue-computer-created", env = "RabbitMQ_QUEUE_COMPUTER_CREATED", default_value = "COMPUTER_CREATED")]
    pub rabbitmq_computer_created: String,

    #[arg(long = "rabbitmq-queue-computer-updated", env = "RabbitMQ_QUEUE_COMPUTER_UPDATED", default_value = "COMPUTER_UPDATED")]
    pub rabbitmq_computer_updated: String,

    #[arg(long = "rabbitmq-queue-computer-deleted", env = "RabbitMQ_QUEUE_COMPUTER_DELETED", default_value = "COMPUTER_DELETED")]
    pub rabbitmq_computer_deleted: String,
}

impl KafkaArgs {
    pub fn names(&self) -> DestinationNames {
        DestinationNames {
            user_created: self.kafka_user_created.clone(),
            user_updated: self.kafka_user_updated.clone(),
            user_deleted: self.kafka_user_deleted.clone(),
            computer_created: self.kafka_computer_created.clone(),
            computer_updated: self.kafka_computer_updated.clone(),
            computer_deleted: self.kafka_computer_deleted.clone(),
        }
    }
}

impl RabbitMqArgs {
    pub fn names(&self) -> DestinationNames {
        DestinationNames {
            user_created: self.rabbitmq_user_created.clone(),
            user_updated: self.rabbitmq_user_updated.clone(),
            user_deleted: self.rabbitmq_user_deleted.clone(),
            computer_created: self.rabbitmq_computer_created.clone(),
            computer_updated: self.rabbitmq_computer_updated.clone(),
            computer_deleted: self.rabbitmq_computer_deleted.clone(),
        }
    }
}

impl DispatchConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs)
    }

    /// Builds the binding table of `transport` from the configured names.
    pub fn binding_table(&self, transport: Transport) -> Result<BindingTable, BindingError> {
        let names = match transport {
            Transport::Kafka => self.kafka.names(),
            Transport::RabbitMq => self.rabbitmq.names(),
        };
        BindingTable::for_transport(transport, &names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_definition_is_valid() {
        DispatchConfig::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = DispatchConfig::try_parse_from([
            "command-dispatch",
            "--kafka-topic-user-created",
            "users.created",
            "--rabbitmq-queue-computer-deleted",
            "pc.gone",
            "--shutdown-timeout",
            "3",
        ])
        .unwrap();

        assert_eq!(config.shutdown_timeout(), Duration::from_secs(3));

        let kafka = config.binding_table(Transport::Kafka).unwrap();
        assert!(kafka.lookup("users.created").is_some());
        assert!(kafka.lookup("USER_UPDATED").is_some());

        let rabbit = config.binding_table(Transport::RabbitMq).unwrap();
        assert!(rabbit.lookup("pc.gone").is_some());
        assert_eq!(rabbit.transport(), Transport::RabbitMq);
    }

    #[test]
    fn test_colliding_names_fail_table_construction() {
        let config = DispatchConfig::try_parse_from([
            "command-dispatch",
            "--kafka-topic-user-updated",
            "USER_CREATED",
        ])
        .unwrap();

        assert!(matches!(
            config.binding_table(Transport::Kafka),
            Err(BindingError::Duplicate { .. })
        ));
        assert!(config.binding_table(Transport::RabbitMq).is_ok());
    }

    #[test]
    fn test_transports_are_named_independently() {
        let config = DispatchConfig::try_parse_from([
            "command-dispatch",
            "--kafka-topic-user-created",
            "topic.users.new",
            "--rabbitmq-queue-user-created",
            "queue.users.new",
        ])
        .unwrap();

        assert_eq!(config.kafka.names().user_created, "topic.users.new");
        assert_eq!(config.rabbitmq.names().user_created, "queue.users.new");

        let kafka = config.binding_table(Transport::Kafka).unwrap();
        let rabbit = config.binding_table(Transport::RabbitMq).unwrap();
        assert!(kafka.lookup("queue.users.new").is_none());
        assert_eq!(
            kafka.lookup("topic.users.new").map(|d| d.binding),
            rabbit.lookup("queue.users.new").map(|d| d.binding)
        );
    }

    #[test]
    fn test_defaults_without_arguments() {
        let config = DispatchConfig::try_parse_from(["command-dispatch"]).unwrap();

        assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
        assert_eq!(config.publish_timeout(), Duration::from_secs(5));
        assert_eq!(config.kafka.names(), DestinationNames::default());
        assert_eq!(config.rabbitmq.names(), DestinationNames::default());
    }

    #[test]
    fn test_broker_address_is_not_an_option() {
        let result = DispatchConfig::try_parse_from([
            "command-dispatch",
            "--kafka-address",
            "localhost:9092",
        ]);
        assert!(result.is_err());
    }
}
