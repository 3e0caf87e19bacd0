use crate::store::{Record, StoreError, StoreRequest};
use tokio::sync::{mpsc, oneshot};

/// A type-safe, cloneable handle to a [`RecordStore`](crate::store::RecordStore).
#[derive(Clone)]
pub struct StoreClient<T: Record> {
    sender: mpsc::Sender<StoreRequest<T>>,
}

impl<T: Record> StoreClient<T> {
    pub fn new(sender: mpsc::Sender<StoreRequest<T>>) -> Self {
        Self { sender }
    }

    /// Stores a new record, assigning an id when it has none.
    pub async fn insert(&self, record: T) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Insert { record, respond_to })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }

    /// Returns the live record stored under `id`.
    pub async fn get(&self, id: String) -> Result<Option<T>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Get { id, respond_to })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }

    /// Overwrites the live record carrying the same id.
    pub async fn replace(&self, record: T) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Replace { record, respond_to })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }

    /// Marks the record deleted.
    pub async fn delete(&self, id: String) -> Result<(), StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Delete { id, respond_to })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }

    pub async fn list(&self) -> Result<Vec<T>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::List { respond_to })
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }
}
