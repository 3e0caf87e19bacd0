//! # Command Dispatch
//!
//! > **Asynchronous CRUD command ingestion over topic and queue transports.**
//!
//! Users and computers can be created, updated and deleted by publishing a
//! command to one of six destinations on either transport. This crate is the
//! layer that listens on all of them at once: it decodes each payload into a
//! typed command, hands it to the right service and acknowledges or rejects the
//! delivery.
//!
//! ## 🏗️ Design
//!
//! ### One consumer per destination
//! Every destination gets its own Tokio task. Within a destination, deliveries
//! are processed in order, one at a time. Across destinations nothing is
//! ordered, so an update may overtake its create; services are expected to
//! cope.
//!
//! ### Bindings are resolved once
//! The [`BindingTable`](framework::BindingTable) maps every destination name to
//! an (entity, operation) [`Binding`](framework::Binding) at startup. Consumers
//! match on that enum; they never look at the destination name again.
//!
//! ### Exactly one terminal action
//! A [`Delivery`](framework::Delivery) is acknowledged when its command
//! succeeds and rejected without requeue when decoding or the service fails.
//! Both actions consume the delivery. Nothing is retried.
//!
//! ### Graceful shutdown
//! A supervisor broadcasts one shutdown signal to all of its consumers, waits
//! for each to settle its in-flight delivery, then closes the transport
//! session.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`framework`])
//! Codec, binding table, consumer, supervisor, producer and the two boundaries
//! ([`CommandExecutor`](framework::CommandExecutor),
//! [`TransportAdapter`](framework::TransportAdapter)).
//!
//! ### 2. The Orchestrator ([`lifecycle`])
//! [`DispatchSystem`](lifecycle::DispatchSystem) runs both transports side by
//! side; [`Services`](lifecycle::Services) spawns the stores.
//!
//! ### 3. The Implementations ([`service`], [`store`], [`broker`])
//! Reference command executors over an in-memory store actor, and an in-memory
//! transport adapter.
//!
//! ### 4. Data and Settings ([`model`], [`config`])
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run
//! # Override a destination name
//! KAFKA_TOPIC_USER_CREATED=users.created cargo run
//! ```

pub mod broker;
pub mod config;
pub mod framework;
pub mod lifecycle;
pub mod model;
pub mod service;
pub mod store;
