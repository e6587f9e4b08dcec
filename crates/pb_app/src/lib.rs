//! Application layer: configuration, the background runner and the publish
//! controller, wired together by [`App`].

use std::sync::Arc;

use pb_core::Result;
use pb_publishers::{create_publishers, PublishManager};
use pb_storage::{create_storage, Storage, StorageKind};
use tracing::info;

pub mod config;
pub mod controller;
pub mod runner;

pub use config::{default_config_path, AppConfig};
pub use controller::PublishController;
pub use runner::AsyncRunner;

/// Everything a front end needs, built from one [`AppConfig`].
pub struct App {
    pub config: AppConfig,
    pub storage: Storage,
    pub manager: Arc<PublishManager>,
    pub runner: Arc<AsyncRunner>,
    pub controller: PublishController,
}

impl App {
    /// Opens storage, registers every configured publisher and prepares the
    /// runner. The runner thread starts lazily on first use.
    pub async fn init(config: AppConfig) -> Result<Self> {
        let kind: StorageKind = config.storage.backend.parse()?;
        let storage = create_storage(kind, config.storage.path.as_deref()).await?;
        info!("💾 Storage ready ({})", kind);

        let manager = Arc::new(PublishManager::new());
        for publisher in create_publishers(&config.services)? {
            manager.register(publisher);
        }
        info!("📮 Publishers registered: {}", manager.service_names().join(", "));

        let runner = Arc::new(AsyncRunner::with_shutdown_grace(config.shutdown_grace()));
        let controller = PublishController::new(manager.clone(), storage.history.clone(), runner.clone());

        Ok(Self {
            config,
            storage,
            manager,
            runner,
            controller,
        })
    }

    pub fn shutdown(&self) {
        self.runner.stop();
    }
}

pub mod prelude {
    pub use super::config::AppConfig;
    pub use super::controller::PublishController;
    pub use super::runner::AsyncRunner;
    pub use super::App;
    pub use pb_core::{Article, Error, PublishResult, PublishStatus, Result};
}
