use std::time::Duration;

use roomshare_contract::{SharedRecord, UploadError, UploadRequest};
use roomshare_storage::{LoadOutcome, RecordStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::registry::RoomRegistry;

const UPDATE_BUS_CAPACITY: usize = 256;

/// Pauses applied before a share is stored and before a refresh is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTiming {
    pub share_delay: Duration,
    pub refresh_delay: Duration,
}

impl ServiceTiming {
    pub fn immediate() -> Self {
        Self {
            share_delay: Duration::ZERO,
            refresh_delay: Duration::ZERO,
        }
    }
}

impl Default for ServiceTiming {
    fn default() -> Self {
        Self {
            share_delay: Duration::from_millis(1000),
            refresh_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoomUpdate {
    Shared {
        room_number: String,
        record_id: String,
        name: String,
    },
    Cleared {
        room_number: String,
        removed: usize,
    },
}

impl RoomUpdate {
    pub fn room_number(&self) -> &str {
        match self {
            RoomUpdate::Shared { room_number, .. } | RoomUpdate::Cleared { room_number, .. } => {
                room_number
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ShareError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("a classroom must be selected")]
    MissingRoom,
    #[error("room {0} is not a known classroom")]
    UnknownRoom(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct ClassroomService {
    store: RecordStore,
    registry: RoomRegistry,
    enforce_registry: bool,
    timing: ServiceTiming,
    updates: broadcast::Sender<RoomUpdate>,
}

impl ClassroomService {
    pub fn new(
        store: RecordStore,
        registry: RoomRegistry,
        enforce_registry: bool,
        timing: ServiceTiming,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUS_CAPACITY);
        Self {
            store,
            registry,
            enforce_registry,
            timing,
            updates,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn rooms(&self) -> &[String] {
        self.registry.rooms()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomUpdate> {
        self.updates.subscribe()
    }

    /// Faculty side: validates the picked file and target room, then stores
    /// the file's metadata for that room.
    pub async fn share_pdf(
        &self,
        upload: UploadRequest,
        room_number: &str,
    ) -> Result<SharedRecord, ShareError> {
        let file = upload.into_pdf()?;

        let room_number = room_number.trim();
        if room_number.is_empty() {
            return Err(ShareError::MissingRoom);
        }
        if self.enforce_registry && !self.registry.contains(room_number) {
            return Err(ShareError::UnknownRoom(room_number.to_string()));
        }

        tokio::time::sleep(self.timing.share_delay).await;
        let record = self.store.append(file, room_number).await?;

        info!(
            room = %record.room_number,
            id = %record.id,
            "PDF \"{}\" saved to Room {}",
            record.name,
            record.room_number
        );
        self.emit(RoomUpdate::Shared {
            room_number: record.room_number.clone(),
            record_id: record.id.clone(),
            name: record.name.clone(),
        });
        Ok(record)
    }

    pub async fn room_contents(&self, room_number: &str) -> Vec<SharedRecord> {
        let records = self.store.list_for_room(room_number).await;
        debug!(room = %room_number, count = records.len(), "loaded PDFs for room");
        records
    }

    /// Classroom side: re-reads the room after the refresh pause.
    pub async fn refresh(&self, room_number: &str) -> Vec<SharedRecord> {
        tokio::time::sleep(self.timing.refresh_delay).await;
        self.room_contents(room_number).await
    }

    /// Removes every PDF of the room. A room that already holds nothing is
    /// left alone; unreadable storage is handed to the store's corrupt-blob
    /// policy instead of being reported as empty.
    pub async fn clear_room(&self, room_number: &str) -> Result<usize, StoreError> {
        let occupied = match self.store.load().await? {
            LoadOutcome::Missing => false,
            LoadOutcome::Loaded(records) => {
                records.iter().any(|record| record.belongs_to(room_number))
            }
            LoadOutcome::Corrupt { .. } => true,
        };
        if !occupied {
            return Ok(0);
        }

        let removed = self.store.clear_room(room_number).await?;
        info!(room = %room_number, removed, "Cleared all PDFs for Room {}", room_number);
        self.emit(RoomUpdate::Cleared {
            room_number: room_number.to_string(),
            removed,
        });
        Ok(removed)
    }

    fn emit(&self, update: RoomUpdate) {
        let _ = self.updates.send(update);
    }
}
