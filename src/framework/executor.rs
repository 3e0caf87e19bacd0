//! # Command Executor Boundary
//!
//! The domain services that actually perform Create / Read / Update / Delete
//! live outside the dispatch layer. They are reached through the
//! [`CommandExecutor`] trait, one implementation per entity kind.
//!
//! Executors are invoked concurrently from every consumer bound to their
//! entity, so implementations must be `Send + Sync`. No locking is added on
//! this side of the boundary.

use crate::framework::command::Command;
use crate::framework::error::ExecutorError;
use crate::model::{Computer, User};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// CRUD capability set of one entity kind.
///
/// Commands may arrive out of order across destinations (an update can
/// overtake its create), so implementations are expected to be idempotent or
/// last-write-wins.
#[async_trait]
pub trait CommandExecutor: Send + Sync + 'static {
    /// The record this executor manages.
    type Entity: Send + Sync + Debug + 'static;

    /// Persists a new record and returns it as stored.
    async fn create(&self, entity: Self::Entity) -> Result<Self::Entity, ExecutorError>;

    /// Fetches a live record by identifier.
    async fn read(&self, id: &str) -> Result<Self::Entity, ExecutorError>;

    /// Replaces an existing record and returns its identifier.
    async fn update(&self, entity: Self::Entity) -> Result<String, ExecutorError>;

    /// Marks a record deleted and returns its identifier.
    async fn delete(&self, id: &str) -> Result<String, ExecutorError>;

    /// Lists live records. Optional; the default reports it as unsupported.
    async fn list(&self) -> Result<Vec<Self::Entity>, ExecutorError> {
        Err(ExecutorError::Unsupported("list"))
    }
}

pub type UserExecutor = Arc<dyn CommandExecutor<Entity = User>>;
pub type ComputerExecutor = Arc<dyn CommandExecutor<Entity = Computer>>;

/// What an executor returned for a successfully dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    User(User),
    Computer(Computer),
    Id(String),
}

/// The executors of every entity kind, shared by all consumers.
#[derive(Clone)]
pub struct Executors {
    pub user: UserExecutor,
    pub computer: ComputerExecutor,
}

impl Executors {
    pub fn new(user: UserExecutor, computer: ComputerExecutor) -> Self {
        Self { user, computer }
    }

    /// Routes `command` to the matching executor operation.
    pub async fn execute(&self, command: Command) -> Result<ExecutionOutcome, ExecutorError> {
        match command {
            Command::CreateUser(user) => self.user.create(user).await.map(ExecutionOutcome::User),
            Command::UpdateUser(user) => self.user.update(user).await.map(ExecutionOutcome::Id),
            Command::DeleteUser(id) => self.user.delete(&id).await.map(ExecutionOutcome::Id),
            Command::CreateComputer(computer) => self
                .computer
                .create(computer)
                .await
                .map(ExecutionOutcome::Computer),
            Command::UpdateComputer(computer) => {
                self.computer.update(computer).await.map(ExecutionOutcome::Id)
            }
            Command::DeleteComputer(id) => {
                self.computer.delete(&id).await.map(ExecutionOutcome::Id)
            }
        }
    }
}
