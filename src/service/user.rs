use crate::framework::{CommandExecutor, ExecutorError};
use crate::model::User;
use crate::service::ServiceError;
use crate::store::{RecordStore, StoreClient};
use async_trait::async_trait;
use tracing::{debug, instrument, warn};

/// Creates a user store and the service bound to it.
///
/// User ids are supplied by callers, so the store's generator only names
/// records that somehow arrive without one.
pub fn new() -> (RecordStore<User>, UserService) {
    let (store, client) = RecordStore::new(32, crate::store::hex_id_generator());
    (store, UserService::new(client))
}

/// Validates and persists users.
#[derive(Clone)]
pub struct UserService {
    store: StoreClient<User>,
}

impl UserService {
    pub fn new(store: StoreClient<User>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn create_user(&self, user: User) -> Result<User, ServiceError> {
        debug!(?user, "create_user called");
        validate(&user)?;
        Ok(self.store.insert(user).await?)
    }

    #[instrument(skip(self))]
    pub async fn read_user(&self, id: &str) -> Result<User, ServiceError> {
        require_id(id)?;
        self.store
            .get(id.to_string())
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn update_user(&self, user: User) -> Result<String, ServiceError> {
        debug!(?user, "update_user called");
        validate(&user)?;
        let stored = self.store.replace(user).await?;
        Ok(stored.id)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &str) -> Result<String, ServiceError> {
        require_id(id)?;
        self.store.delete(id.to_string()).await?;
        Ok(id.to_string())
    }
}

fn require_id(id: &str) -> Result<(), ServiceError> {
    if id.is_empty() {
        return Err(ServiceError::Validation("user id is required".to_string()));
    }
    Ok(())
}

fn validate(user: &User) -> Result<(), ServiceError> {
    let problem = if user.id.is_empty() {
        "user id is required"
    } else if user.name.is_empty() {
        "user name is required"
    } else if user.age < 1 {
        "user age must be at least 1"
    } else if user.email.is_empty() {
        "user email is required"
    } else {
        return Ok(());
    };

    warn!(user_id = %user.id, problem, "Invalid user");
    Err(ServiceError::Validation(problem.to_string()))
}

#[async_trait]
impl CommandExecutor for UserService {
    type Entity = User;

    async fn create(&self, user: User) -> Result<User, ExecutorError> {
        Ok(self.create_user(user).await?)
    }

    async fn read(&self, id: &str) -> Result<User, ExecutorError> {
        Ok(self.read_user(id).await?)
    }

    async fn update(&self, user: User) -> Result<String, ExecutorError> {
        Ok(self.update_user(user).await?)
    }

    async fn delete(&self, id: &str) -> Result<String, ExecutorError> {
        Ok(self.delete_user(id).await?)
    }
}
