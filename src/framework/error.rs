//! # Dispatch Errors
//!
//! This module defines the error taxonomy of the dispatch layer. Each error
//! type maps to exactly one handling policy:
//!
//! | Error | Raised by | Policy |
//! |-------|-----------|--------|
//! | [`DecodeError`] | codec | delivery rejected without requeue |
//! | [`ExecutorError`] | command executor | delivery rejected without requeue |
//! | [`TransportError`] | transport adapter | consumer logs and exits its loop |
//! | [`PublishError`] | producer | returned to the caller |

use crate::framework::binding::Transport;
use std::time::Duration;

/// A payload could not be turned into a typed command.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed {entity} payload: {source}")]
    Malformed {
        entity: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A business-rule or persistence failure reported by a command executor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}

/// A connection, channel or subscription failure in the transport adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("transport session closed")]
    Closed,
    #[error("destination {0} already has a subscriber")]
    AlreadySubscribed(String),
    #[error("subscription to {0} ended")]
    StreamEnded(String),
    #[error("transport fault: {0}")]
    Fault(String),
}

/// A publish that did not reach the broker.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("transport unavailable: {0}")]
    Unavailable(#[from] TransportError),
    #[error("no {transport} destination bound for {operation}")]
    Unbound {
        transport: Transport,
        operation: String,
    },
    #[error("failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("publish timed out after {0:?}")]
    Timeout(Duration),
}

/// The binding table could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("destination {name} registered twice on {transport}")]
    Duplicate { transport: Transport, name: String },
    #[error("binding registered twice on {transport}: {operation}")]
    DuplicateBinding {
        transport: Transport,
        operation: String,
    },
    #[error("descriptor for {name} targets {found}, table is for {expected}")]
    TransportMismatch {
        name: String,
        expected: Transport,
        found: Transport,
    },
}

/// Errors returned by [`SupervisorHandle::stop`](crate::framework::SupervisorHandle::stop).
#[derive(Debug, thiserror::Error)]
pub enum StopError {
    #[error("{pending} consumer(s) still running after {deadline:?}")]
    Timeout { deadline: Duration, pending: usize },
    #[error("consumer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("failed to release transport: {0}")]
    Transport(#[from] TransportError),
}

/// Top-level error for starting and stopping the dispatch layer.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Binding(#[from] BindingError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Stop(#[from] StopError),
}
