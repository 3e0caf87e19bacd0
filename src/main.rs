use clap::Parser;
use command_dispatch::broker::InMemoryBroker;
use command_dispatch::config::DispatchConfig;
use command_dispatch::framework::{Command, ConsumerExit, Transport};
use command_dispatch::lifecycle::{setup_tracing, DispatchSystem, Services};
use command_dispatch::model::User;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();
    let config = DispatchConfig::parse();

    info!(
        shutdown_timeout = ?config.shutdown_timeout(),
        "Starting command dispatch on in-memory brokers"
    );

    let services = Services::start();
    let kafka = Arc::new(InMemoryBroker::new(Transport::Kafka));
    let rabbitmq = Arc::new(InMemoryBroker::new(Transport::RabbitMq));

    let system =
        DispatchSystem::from_config(&config, services.executors(), kafka, rabbitmq).await?;

    // Self-check: one command round-trips through the topic transport
    let span = tracing::info_span!("self_check");
    async {
        let command = Command::CreateUser(User::new("user_1", "Alice", 28, "alice@example.com"));
        let producer = system.producer(Transport::Kafka);
        let published = match command.encode() {
            Ok(payload) => {
                let destination = config.kafka.kafka_user_created.clone();
                producer
                    .publish_with_timeout(&destination, payload, config.publish_timeout())
                    .await
            }
            Err(e) => Err(e.into()),
        };
        match published {
            Ok(()) => info!("Published sample command"),
            Err(e) => warn!(error = %e, "Sample command not published"),
        }
    }
    .instrument(span)
    .await;

    info!("Running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    let reports = match system.stop(config.shutdown_timeout()).await {
        Ok(reports) => reports,
        Err(e) => {
            error!(error = %e, "Dispatch did not stop cleanly");
            return Err(e.into());
        }
    };

    for report in &reports {
        match &report.exit {
            ConsumerExit::Shutdown => info!(
                transport = %report.transport,
                destination = %report.destination,
                received = report.received,
                acknowledged = report.acknowledged,
                rejected = report.rejected,
                "Consumer report"
            ),
            ConsumerExit::Transport(e) => warn!(
                transport = %report.transport,
                destination = %report.destination,
                received = report.received,
                error = %e,
                "Consumer report"
            ),
        }
    }

    services.shutdown().await?;
    Ok(())
}
