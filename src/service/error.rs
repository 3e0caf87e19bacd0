//! Error types for the reference services.

use crate::framework::ExecutorError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors that can occur in a service operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The record or identifier failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No live record carries the identifier.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A record with the same identifier already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// The backing store is unavailable.
    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => ServiceError::NotFound(id),
            StoreError::Conflict(id) => ServiceError::AlreadyExists(id),
            other => ServiceError::Store(other.to_string()),
        }
    }
}

impl From<ServiceError> for ExecutorError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => ExecutorError::Validation(msg),
            ServiceError::NotFound(id) => ExecutorError::NotFound(id),
            ServiceError::AlreadyExists(id) => {
                ExecutorError::Storage(format!("record already exists: {id}"))
            }
            ServiceError::Store(msg) => ExecutorError::Storage(msg),
        }
    }
}
