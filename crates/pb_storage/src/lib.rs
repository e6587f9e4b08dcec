use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use pb_core::{DraftStorage, Error, HistoryStorage, Result};

pub mod backends;

pub use backends::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    #[default]
    Sqlite,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Memory => f.write_str("memory"),
            StorageKind::Sqlite => f.write_str("sqlite"),
        }
    }
}

impl FromStr for StorageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "sqlite" => Ok(StorageKind::Sqlite),
            other => Err(Error::Config(format!("unknown storage backend: {}", other))),
        }
    }
}

/// Draft and history repositories backed by the same store.
#[derive(Clone)]
pub struct Storage {
    pub drafts: Arc<dyn DraftStorage>,
    pub history: Arc<dyn HistoryStorage>,
}

impl Storage {
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStorage::new());
        Self {
            drafts: store.clone(),
            history: store,
        }
    }
}

/// `~/.postblog/postblog.db`.
pub fn default_database_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".postblog")
        .join("postblog.db")
}

/// Opens the selected backend. `path` is only used by SQLite and defaults
/// to [`default_database_path`].
pub async fn create_storage(kind: StorageKind, path: Option<&Path>) -> Result<Storage> {
    match kind {
        StorageKind::Memory => Ok(Storage::memory()),
        #[cfg(feature = "sqlite")]
        StorageKind::Sqlite => {
            let path = path.map(Path::to_path_buf).unwrap_or_else(default_database_path);
            let store = Arc::new(SqliteStorage::new_with_path(&path).await?);
            Ok(Storage {
                drafts: store.clone(),
                history: store,
            })
        }
        #[cfg(not(feature = "sqlite"))]
        StorageKind::Sqlite => {
            let _ = path;
            Err(Error::Config(
                "SQLite storage is not available in this build".to_string(),
            ))
        }
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_storage, Storage, StorageKind};
}
