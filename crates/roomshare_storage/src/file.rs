use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::backend::{validate_key, BackendError, BlobBackend, VersionedBlob};

/// Stores each key as `<dir>/<key>.json`.
///
/// The version of a blob is the leading 8 bytes of the SHA-256 of its
/// contents; swaps also check the full digest last handed out for the key.
/// Writes are serialized in-process and replace the file through a rename,
/// so readers never observe a half-written blob.
#[derive(Debug)]
pub struct FileBlobBackend {
    dir: PathBuf,
    write_lock: Mutex<()>,
    issued: std::sync::Mutex<HashMap<String, ContentDigest>>,
}

type ContentDigest = [u8; 32];

impl FileBlobBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
            issued: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    async fn read_with_digest(
        &self,
        key: &str,
    ) -> Result<Option<(String, ContentDigest)>, BackendError> {
        validate_key(key)?;
        match fs::read_to_string(self.blob_path(key)).await {
            Ok(contents) => {
                let digest = content_digest(&contents);
                Ok(Some((contents, digest)))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn remember(&self, key: &str, digest: ContentDigest) {
        let mut issued = self.issued.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        issued.insert(key.to_string(), digest);
    }

    fn was_issued(&self, key: &str, digest: &ContentDigest) -> bool {
        let issued = self.issued.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        issued.get(key) == Some(digest)
    }
}

fn content_digest(contents: &str) -> ContentDigest {
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::digest(contents.as_bytes()));
    digest
}

/// Writes `contents` to `staging` and renames it over `target`. The staging
/// file is removed whenever either step fails.
async fn replace_file(staging: &Path, target: &Path, contents: &str) -> std::io::Result<()> {
    let replaced = match fs::write(staging, contents.as_bytes()).await {
        Ok(()) => fs::rename(staging, target).await,
        Err(err) => Err(err),
    };
    if replaced.is_err() {
        let _ = fs::remove_file(staging).await;
    }
    replaced
}

fn version_of(digest: &ContentDigest) -> u64 {
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

#[async_trait]
impl BlobBackend for FileBlobBackend {
    async fn read(&self, key: &str) -> Result<Option<VersionedBlob>, BackendError> {
        let Some((contents, digest)) = self.read_with_digest(key).await? else {
            return Ok(None);
        };
        self.remember(key, digest);
        Ok(Some(VersionedBlob {
            version: version_of(&digest),
            contents,
        }))
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        contents: String,
    ) -> Result<u64, BackendError> {
        let _guard = self.write_lock.lock().await;

        let current = self.read_with_digest(key).await?.map(|(_, digest)| digest);
        let unchanged = match (&current, expected) {
            (None, None) => true,
            (Some(digest), Some(version)) => {
                version_of(digest) == version && self.was_issued(key, digest)
            }
            _ => false,
        };
        if !unchanged {
            return Err(BackendError::Conflict {
                key: key.to_string(),
                expected,
            });
        }

        fs::create_dir_all(&self.dir).await?;
        let target = self.blob_path(key);
        let staging = self.dir.join(format!(".{key}.{}.tmp", Uuid::now_v7().simple()));
        replace_file(&staging, &target, &contents).await?;

        let digest = content_digest(&contents);
        self.remember(key, digest);
        debug!(path = %target.display(), bytes = contents.len(), "blob file replaced");
        Ok(version_of(&digest))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.dir.display())
    }
}
