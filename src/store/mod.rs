//! # Record Store
//!
//! In-memory persistence for the reference services, built as an actor: one
//! Tokio task owns a `HashMap` of records and serves requests sent through a
//! cloneable [`StoreClient`].
//!
//! Deletion is soft. A deleted record stays in the map with its deletion flag
//! set; it is invisible to `get`, `replace` and `list`.

pub mod actor;
pub mod client;

pub use actor::RecordStore;
pub use client::StoreClient;

use crate::model::{Computer, User};
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;

/// A record the store can hold.
pub trait Record: Clone + Debug + Send + Sync + 'static {
    /// The identifier, if one has been assigned.
    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: String);

    fn is_deleted(&self) -> bool;

    fn set_deleted(&mut self, deleted: bool);
}

impl Record for User {
    fn id(&self) -> Option<&str> {
        Some(self.id.as_str()).filter(|id| !id.is_empty())
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn set_deleted(&mut self, deleted: bool) {
        self.is_deleted = deleted;
    }
}

impl Record for Computer {
    fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    fn set_deleted(&mut self, deleted: bool) {
        self.is_deleted = deleted;
    }
}

/// Errors raised by the store itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store closed")]
    Closed,
    #[error("store dropped response channel")]
    Dropped,
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("record already exists: {0}")]
    Conflict(String),
}

/// One-shot response channel of a store request.
pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

#[derive(Debug)]
pub enum StoreRequest<T: Record> {
    Insert {
        record: T,
        respond_to: Response<T>,
    },
    Get {
        id: String,
        respond_to: Response<Option<T>>,
    },
    Replace {
        record: T,
        respond_to: Response<T>,
    },
    Delete {
        id: String,
        respond_to: Response<()>,
    },
    List {
        respond_to: Response<Vec<T>>,
    },
}

/// Generates 24-hex-digit identifiers: 8 digits of start-up time in seconds,
/// then a 16-digit counter.
pub fn hex_id_generator() -> impl Fn() -> String + Send + Sync + 'static {
    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or_default();
    let counter = AtomicU64::new(1);
    move || format!("{:08x}{:016x}", epoch, counter.fetch_add(1, Ordering::Relaxed))
}
