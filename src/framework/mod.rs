//! Asynchronous command dispatch.
//!
//! This module receives serialized commands from many independently addressed
//! destinations, decodes them into typed operations, routes them to the right
//! command executor and settles every delivery.
//!
//! # Main Components
//!
//! - [`BindingTable`] - Immutable destination name → (entity, operation) mapping
//! - [`Command`] - Typed command plus its wire codec
//! - [`CommandExecutor`] - Per-entity service boundary
//! - [`TransportAdapter`] - Broker session boundary yielding [`Delivery`] handles
//! - [`Consumer`] - One per destination; decode, dispatch, ack or reject
//! - [`Supervisor`] - Starts the consumers of one transport and stops them together
//! - [`Producer`] - Publishes commands over the shared adapter session
//!
//! # Testing
//!
//! See the [`mock`] module for an expectation-driven executor, and
//! [`crate::broker`] for an in-memory transport adapter.

pub mod binding;
pub mod command;
pub mod consumer;
pub mod error;
pub mod executor;
pub mod mock;
pub mod producer;
pub mod supervisor;
pub mod transport;

pub use binding::{
    Binding, BindingTable, DestinationDescriptor, DestinationNames, EntityKind, OperationKind,
    Transport,
};
pub use command::Command;
pub use consumer::{Consumer, ConsumerExit, ConsumerReport, ConsumerState};
pub use error::{
    BindingError, DecodeError, DispatchError, ExecutorError, PublishError, StopError,
    TransportError,
};
pub use executor::{CommandExecutor, ComputerExecutor, ExecutionOutcome, Executors, UserExecutor};
pub use producer::Producer;
pub use supervisor::{Supervisor, SupervisorHandle};
pub use transport::{Acknowledger, Delivery, DeliveryStream, Subscription, TransportAdapter};
