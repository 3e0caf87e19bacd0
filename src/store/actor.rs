use crate::store::client::StoreClient;
use crate::store::{Record, StoreError, StoreRequest};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The server half of the store.
///
/// Requests are processed one at a time in the actor's own task, so the map
/// needs no lock. Callers on any number of tasks go through [`StoreClient`].
pub struct RecordStore<T: Record> {
    receiver: mpsc::Receiver<StoreRequest<T>>,
    records: HashMap<String, T>,
    next_id_fn: Box<dyn Fn() -> String + Send + Sync>,
}

impl<T: Record> RecordStore<T> {
    pub fn new(
        buffer_size: usize,
        next_id_fn: impl Fn() -> String + Send + Sync + 'static,
    ) -> (Self, StoreClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let store = Self {
            receiver,
            records: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        (store, StoreClient::new(sender))
    }

    /// Runs the event loop until every client has been dropped.
    pub async fn run(mut self) {
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(entity_type, "Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Insert { record, respond_to } => {
                    let _ = respond_to.send(self.insert(entity_type, record));
                }
                StoreRequest::Get { id, respond_to } => {
                    let record = self.records.get(&id).filter(|r| !r.is_deleted()).cloned();
                    debug!(entity_type, %id, found = record.is_some(), "Get");
                    let _ = respond_to.send(Ok(record));
                }
                StoreRequest::Replace { record, respond_to } => {
                    let _ = respond_to.send(self.replace(entity_type, record));
                }
                StoreRequest::Delete { id, respond_to } => {
                    debug!(entity_type, %id, "Delete");
                    let result = match self.records.get_mut(&id) {
                        Some(record) => {
                            record.set_deleted(true);
                            info!(entity_type, %id, "Deleted");
                            Ok(())
                        }
                        None => {
                            warn!(entity_type, %id, "Not found");
                            Err(StoreError::NotFound(id))
                        }
                    };
                    let _ = respond_to.send(result);
                }
                StoreRequest::List { respond_to } => {
                    let mut live: Vec<T> = self
                        .records
                        .values()
                        .filter(|r| !r.is_deleted())
                        .cloned()
                        .collect();
                    live.sort_by(|a, b| a.id().cmp(&b.id()));
                    debug!(entity_type, count = live.len(), "List");
                    let _ = respond_to.send(Ok(live));
                }
            }
        }

        info!(entity_type, size = self.records.len(), "Shutdown");
    }

    fn insert(&mut self, entity_type: &str, mut record: T) -> Result<T, StoreError> {
        debug!(entity_type, ?record, "Insert");
        let id = match record.id() {
            Some(id) => id.to_string(),
            None => {
                let id = (self.next_id_fn)();
                record.set_id(id.clone());
                id
            }
        };

        if self.records.contains_key(&id) {
            warn!(entity_type, %id, "Already exists");
            return Err(StoreError::Conflict(id));
        }

        record.set_deleted(false);
        self.records.insert(id.clone(), record.clone());
        info!(entity_type, %id, size = self.records.len(), "Created");
        Ok(record)
    }

    fn replace(&mut self, entity_type: &str, mut record: T) -> Result<T, StoreError> {
        debug!(entity_type, ?record, "Replace");
        let id = record.id().unwrap_or_default().to_string();

        match self.records.get_mut(&id) {
            Some(stored) if !stored.is_deleted() => {
                record.set_deleted(false);
                *stored = record.clone();
                info!(entity_type, %id, "Updated");
                Ok(record)
            }
            _ => {
                warn!(entity_type, %id, "Not found");
                Err(StoreError::NotFound(id))
            }
        }
    }
}
