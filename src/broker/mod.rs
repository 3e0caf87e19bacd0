//! Transport adapters shipped with the crate.
//!
//! Real broker clients live outside this crate and plug in through
//! [`TransportAdapter`](crate::framework::TransportAdapter). The in-memory
//! broker here backs the tests and the demo binary.

pub mod memory;

pub use memory::{InMemoryBroker, Outcome};
