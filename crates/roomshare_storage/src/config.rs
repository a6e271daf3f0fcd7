use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::Deserialize;
use tracing::info;

use crate::backend::{BlobBackend, InMemoryBlobBackend};
use crate::file::FileBlobBackend;
use crate::repository::{
    CorruptBlobPolicy, RecordStore, StoreOptions, DEFAULT_MAX_WRITE_ATTEMPTS, DEFAULT_STORAGE_KEY,
};
use crate::sqlite::SqliteBlobBackend;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Memory,
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendKind,
    /// Blob directory for `file`, database path for `sqlite`.
    pub path: Option<PathBuf>,
    pub key: String,
    pub on_corrupt: CorruptBlobPolicy,
    pub max_write_attempts: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            path: None,
            key: DEFAULT_STORAGE_KEY.to_string(),
            on_corrupt: CorruptBlobPolicy::default(),
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}

impl StorageConfig {
    fn store_options(&self) -> StoreOptions {
        StoreOptions {
            key: self.key.clone(),
            on_corrupt: self.on_corrupt,
            max_write_attempts: self.max_write_attempts,
        }
    }
}

pub async fn open_store(config: &StorageConfig) -> Result<RecordStore> {
    if config.key.trim().is_empty() {
        bail!("storage.key cannot be empty");
    }

    let backend: Arc<dyn BlobBackend> = match config.backend {
        BackendKind::Memory => Arc::new(InMemoryBlobBackend::new()),
        BackendKind::File => {
            let dir = config.path.clone().unwrap_or_else(|| PathBuf::from("data"));
            Arc::new(FileBlobBackend::new(dir))
        }
        BackendKind::Sqlite => {
            let path = config
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from("data/roomshare.db"));
            Arc::new(SqliteBlobBackend::connect(&path.to_string_lossy()).await?)
        }
    };

    let store = RecordStore::new(backend, config.store_options());
    info!(store = %store.describe(), "record store opened");
    Ok(store)
}
