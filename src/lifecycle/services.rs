use crate::framework::Executors;
use crate::service::{self, ComputerService, UserService};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The reference services and the store actors behind them.
pub struct Services {
    pub users: UserService,
    pub computers: ComputerService,
    handles: Vec<JoinHandle<()>>,
}

impl Services {
    /// Spawns one store actor per entity kind.
    pub fn start() -> Self {
        let (user_store, users) = service::user::new();
        let (computer_store, computers) = service::computer::new();

        let user_handle = tokio::spawn(user_store.run());
        let computer_handle = tokio::spawn(computer_store.run());

        Self {
            users,
            computers,
            handles: vec![user_handle, computer_handle],
        }
    }

    /// Executor handles over these services, for the dispatch layer.
    pub fn executors(&self) -> Executors {
        Executors::new(
            Arc::new(self.users.clone()),
            Arc::new(self.computers.clone()),
        )
    }

    /// Drops the service handles and waits for the stores to stop.
    ///
    /// Stores only stop once every other clone of their services is gone, so
    /// call this after the dispatch layer has stopped.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down stores...");
        drop(self.users);
        drop(self.computers);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Store task failed: {:?}", e);
                return Err(format!("Store task failed: {:?}", e));
            }
        }

        info!("Store shutdown complete.");
        Ok(())
    }
}
