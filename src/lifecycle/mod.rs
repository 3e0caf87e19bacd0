//! Runtime orchestration and lifecycle management.
//!
//! - [`DispatchSystem`] - Starts and stops the consumers of both transports
//! - [`Services`] - Spawns the store actors behind the reference services
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod dispatch_system;
pub mod services;
pub mod tracing;

pub use dispatch_system::{DispatchSystem, Endpoint};
pub use services::Services;
pub use self::tracing::setup_tracing;
