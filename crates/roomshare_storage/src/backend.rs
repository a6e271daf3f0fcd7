use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedBlob {
    pub contents: String,
    pub version: u64,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("blob {key} changed since version {expected:?} was read")]
    Conflict { key: String, expected: Option<u64> },
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("blob file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite query failed: {0}")]
    Sqlite(#[from] sqlx::Error),
}

/// Key-value persistence holding one versioned string per key.
///
/// `compare_and_swap` only succeeds when the stored version still equals
/// `expected`; `None` means the key must not exist yet.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<VersionedBlob>, BackendError>;

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        contents: String,
    ) -> Result<u64, BackendError>;

    fn describe(&self) -> String;
}

pub(crate) fn validate_key(key: &str) -> Result<(), BackendError> {
    let acceptable = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if acceptable {
        Ok(())
    } else {
        Err(BackendError::InvalidKey(key.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBlobBackend {
    blobs: RwLock<HashMap<String, VersionedBlob>>,
}

impl InMemoryBlobBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobBackend for InMemoryBlobBackend {
    async fn read(&self, key: &str) -> Result<Option<VersionedBlob>, BackendError> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        contents: String,
    ) -> Result<u64, BackendError> {
        validate_key(key)?;
        let mut blobs = self.blobs.write().await;
        let current = blobs.get(key).map(|blob| blob.version);
        if current != expected {
            return Err(BackendError::Conflict {
                key: key.to_string(),
                expected,
            });
        }

        let version = current.map_or(1, |v| v + 1);
        blobs.insert(key.to_string(), VersionedBlob { contents, version });
        Ok(version)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
