use std::sync::Arc;

use roomshare_contract::{decode_collection, encode_collection, CodecError, FileHandle, SharedRecord};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::backend::{BackendError, BlobBackend};

pub const DEFAULT_STORAGE_KEY: &str = "faculty_pdfs";
pub const DEFAULT_MAX_WRITE_ATTEMPTS: usize = 5;

/// What a write does when the stored blob cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptBlobPolicy {
    #[default]
    Refuse,
    Reset,
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub key: String,
    pub on_corrupt: CorruptBlobPolicy,
    pub max_write_attempts: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_STORAGE_KEY.to_string(),
            on_corrupt: CorruptBlobPolicy::default(),
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Missing,
    Loaded(Vec<SharedRecord>),
    Corrupt { reason: String },
}

impl LoadOutcome {
    pub fn into_records(self) -> Vec<SharedRecord> {
        match self {
            LoadOutcome::Loaded(records) => records,
            LoadOutcome::Missing | LoadOutcome::Corrupt { .. } => Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Encode(#[from] CodecError),
    #[error("stored blob {key} is unreadable: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("gave up writing blob {key} after {attempts} conflicting attempts")]
    Contention { key: String, attempts: usize },
}

/// All shared records, kept as one JSON blob under a single key and
/// partitioned by room number.
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn BlobBackend>,
    options: StoreOptions,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn BlobBackend>, options: StoreOptions) -> Self {
        Self { backend, options }
    }

    pub fn key(&self) -> &str {
        &self.options.key
    }

    pub fn describe(&self) -> String {
        format!("{} (key {})", self.backend.describe(), self.options.key)
    }

    pub async fn load(&self) -> Result<LoadOutcome, StoreError> {
        Ok(self.snapshot().await?.1)
    }

    /// Every record across all rooms, oldest first. Unreadable storage is
    /// logged and reported as empty.
    pub async fn list_all(&self) -> Vec<SharedRecord> {
        match self.load().await {
            Ok(LoadOutcome::Corrupt { reason }) => {
                warn!(key = %self.options.key, %reason, "error loading shared records");
                Vec::new()
            }
            Ok(outcome) => outcome.into_records(),
            Err(err) => {
                error!(key = %self.options.key, error = %err, "error loading shared records");
                Vec::new()
            }
        }
    }

    pub async fn list_for_room(&self, room_number: &str) -> Vec<SharedRecord> {
        self.list_all()
            .await
            .into_iter()
            .filter(|record| record.belongs_to(room_number))
            .collect()
    }

    pub async fn append(
        &self,
        file: FileHandle,
        room_number: &str,
    ) -> Result<SharedRecord, StoreError> {
        let record = SharedRecord::new(file, room_number);
        let total = self
            .mutate(|records| {
                records.push(record.clone());
                records.len()
            })
            .await?;

        debug!(
            id = %record.id,
            name = %record.name,
            room = %record.room_number,
            total,
            "shared record appended"
        );
        Ok(record)
    }

    /// Drops every record of `room_number`, leaving other rooms intact.
    /// Returns how many records were removed.
    pub async fn clear_room(&self, room_number: &str) -> Result<usize, StoreError> {
        let removed = self
            .mutate(|records| {
                let before = records.len();
                records.retain(|record| !record.belongs_to(room_number));
                before - records.len()
            })
            .await?;

        debug!(room = %room_number, removed, "room records cleared");
        Ok(removed)
    }

    async fn snapshot(&self) -> Result<(Option<u64>, LoadOutcome), StoreError> {
        let Some(blob) = self.backend.read(&self.options.key).await? else {
            return Ok((None, LoadOutcome::Missing));
        };

        // an empty value counts as no data and is simply written over
        if blob.contents.trim().is_empty() {
            return Ok((Some(blob.version), LoadOutcome::Missing));
        }

        let outcome = match decode_collection(&blob.contents) {
            Ok(records) => LoadOutcome::Loaded(records),
            Err(err) => LoadOutcome::Corrupt {
                reason: err.to_string(),
            },
        };
        Ok((Some(blob.version), outcome))
    }

    /// Read-modify-write of the whole collection, retried while another
    /// writer got in between the read and the swap.
    async fn mutate<T, F>(&self, mut apply: F) -> Result<T, StoreError>
    where
        F: FnMut(&mut Vec<SharedRecord>) -> T,
    {
        let key = &self.options.key;
        let attempts = self.options.max_write_attempts.max(1);

        for attempt in 1..=attempts {
            let (version, outcome) = self.snapshot().await?;
            let mut records = match outcome {
                LoadOutcome::Missing => Vec::new(),
                LoadOutcome::Loaded(records) => records,
                LoadOutcome::Corrupt { reason } => match self.options.on_corrupt {
                    CorruptBlobPolicy::Refuse => {
                        return Err(StoreError::Corrupt {
                            key: key.clone(),
                            reason,
                        })
                    }
                    CorruptBlobPolicy::Reset => {
                        warn!(%key, %reason, "overwriting unreadable blob");
                        Vec::new()
                    }
                },
            };

            let output = apply(&mut records);
            let blob = encode_collection(&records)?;

            match self.backend.compare_and_swap(key, version, blob).await {
                Ok(new_version) => {
                    debug!(%key, version = new_version, attempt, "blob written");
                    return Ok(output);
                }
                Err(BackendError::Conflict { .. }) => {
                    info!(%key, attempt, "blob changed during write, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(StoreError::Contention {
            key: key.clone(),
            attempts,
        })
    }
}
