use crate::framework::{CommandExecutor, ExecutorError};
use crate::model::Computer;
use crate::service::ServiceError;
use crate::store::{hex_id_generator, RecordStore, StoreClient};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Creates a computer store and the service bound to it.
///
/// The store assigns 24-hex-digit ids to created computers.
pub fn new() -> (RecordStore<Computer>, ComputerService) {
    let (store, client) = RecordStore::new(32, hex_id_generator());
    (store, ComputerService::new(client))
}

/// Validates and persists computers.
#[derive(Clone)]
pub struct ComputerService {
    store: StoreClient<Computer>,
}

impl ComputerService {
    pub fn new(store: StoreClient<Computer>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, computer))]
    pub async fn create_computer(&self, computer: Computer) -> Result<Computer, ServiceError> {
        debug!(?computer, "create_computer called");
        validate(&computer)?;
        if let Some(id) = computer.id.as_deref() {
            parse_id(id)?;
        }
        Ok(self.store.insert(computer).await?)
    }

    #[instrument(skip(self))]
    pub async fn read_computer(&self, id: &str) -> Result<Computer, ServiceError> {
        parse_id(id)?;
        self.store
            .get(id.to_string())
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    #[instrument(skip(self, computer), fields(computer_id = computer.id_str()))]
    pub async fn update_computer(&self, computer: Computer) -> Result<String, ServiceError> {
        debug!(?computer, "update_computer called");
        validate(&computer)?;
        parse_id(computer.id_str())?;
        let stored = self.store.replace(computer).await?;
        Ok(stored.id.unwrap_or_default())
    }

    #[instrument(skip(self))]
    pub async fn delete_computer(&self, id: &str) -> Result<String, ServiceError> {
        parse_id(id)?;
        self.store.delete(id.to_string()).await?;
        Ok(id.to_string())
    }

    /// Every computer that has not been deleted, ordered by id.
    #[instrument(skip(self))]
    pub async fn list_computers(&self) -> Result<Vec<Computer>, ServiceError> {
        Ok(self.store.list().await?)
    }
}

/// Identifiers are 24 hex digits.
fn parse_id(id: &str) -> Result<(), ServiceError> {
    if id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!("invalid computer id {id:?}")))
    }
}

fn validate(computer: &Computer) -> Result<(), ServiceError> {
    let fields = [
        ("ip", &computer.ip),
        ("manufacturer", &computer.manufacturer),
        ("cpu", &computer.cpu),
        ("ram", &computer.ram),
        ("hdd", &computer.hdd),
        ("gpu", &computer.gpu),
        ("os", &computer.os),
    ];

    match fields.iter().find(|(_, value)| value.is_empty()) {
        Some((name, _)) => {
            warn!(computer_id = computer.id_str(), field = *name, "Invalid computer");
            Err(ServiceError::Validation(format!("computer {name} is required")))
        }
        None => Ok(()),
    }
}

#[async_trait]
impl CommandExecutor for ComputerService {
    type Entity = Computer;

    async fn create(&self, computer: Computer) -> Result<Computer, ExecutorError> {
        Ok(self.create_computer(computer).await?)
    }

    async fn read(&self, id: &str) -> Result<Computer, ExecutorError> {
        Ok(self.read_computer(id).await?)
    }

    async fn update(&self, computer: Computer) -> Result<String, ExecutorError> {
        Ok(self.update_computer(computer).await?)
    }

    async fn delete(&self, id: &str) -> Result<String, ExecutorError> {
        Ok(self.delete_computer(id).await?)
    }

    async fn list(&self) -> Result<Vec<Computer>, ExecutorError> {
        Ok(self.list_computers().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ComputerService {
        let (store, service) = new();
        tokio::spawn(store.run());
        service
    }

    fn workstation(ip: &str) -> Computer {
        Computer {
            id: None,
            ip: ip.to_string(),
            manufacturer: "Lenovo".to_string(),
            cpu: "i7".to_string(),
            ram: "32GB".to_string(),
            hdd: "1TB".to_string(),
            gpu: "RTX".to_string(),
            os: "Linux".to_string(),
            is_deleted: false,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_list_skips_deleted() {
        let computers = service();

        let first = computers.create(workstation("10.0.0.1")).await.unwrap();
        let second = computers.create(workstation("10.0.0.2")).await.unwrap();
        let first_id = first.id.clone().unwrap();
        assert_eq!(first_id.len(), 24);
        assert_ne!(first.id, second.id);

        assert_eq!(computers.delete(&first_id).await.unwrap(), first_id);
        let live = computers.list().await.unwrap();
        assert_eq!(live, vec![second]);
        assert_eq!(
            computers.read(&first_id).await,
            Err(ExecutorError::NotFound(first_id.clone()))
        );
    }

    #[tokio::test]
    async fn test_update_requires_id_and_every_field() {
        let computers = service();
        let created = computers.create(workstation("10.0.0.1")).await.unwrap();

        let missing_id = workstation("10.0.0.9");
        assert!(matches!(
            computers.update(missing_id).await,
            Err(ExecutorError::Validation(_))
        ));

        let mut no_gpu = created.clone();
        no_gpu.gpu.clear();
        assert_eq!(
            computers.update(no_gpu).await,
            Err(ExecutorError::Validation("computer gpu is required".to_string()))
        );

        let mut upgraded = created.clone();
        upgraded.ram = "64GB".to_string();
        let id = computers.update(upgraded).await.unwrap();
        assert_eq!(computers.read(&id).await.unwrap().ram, "64GB");
    }

    #[tokio::test]
    async fn test_delete_rejects_malformed_id() {
        let computers = service();

        assert!(matches!(
            computers.delete("not-an-object-id").await,
            Err(ExecutorError::Validation(_))
        ));
        assert_eq!(
            computers.delete("0123456789abcdef01234567").await,
            Err(ExecutorError::NotFound("0123456789abcdef01234567".to_string()))
        );
    }
}
