use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RecordId = String;
pub type RoomNumber = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    pub content_type: String,
}

/// A file as seen by callers of the store.
///
/// Only `metadata` is ever persisted. Handles rebuilt from storage carry
/// empty `contents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub metadata: FileMetadata,
    pub contents: Vec<u8>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            metadata: FileMetadata {
                name: name.into(),
                size: contents.len() as u64,
                content_type: content_type.into(),
            },
            contents,
        }
    }

    pub fn placeholder(metadata: FileMetadata) -> Self {
        Self {
            metadata,
            contents: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn is_placeholder(&self) -> bool {
        self.contents.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedRecord {
    pub id: RecordId,
    pub name: String,
    pub room_number: RoomNumber,
    pub uploaded_at: DateTime<Utc>,
    pub file: FileHandle,
}

impl SharedRecord {
    /// Builds a new record stamped with a time-ordered id and the current time.
    pub fn new(file: FileHandle, room_number: impl Into<RoomNumber>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            name: file.metadata.name.clone(),
            room_number: room_number.into(),
            uploaded_at: Utc::now(),
            file,
        }
    }

    pub fn belongs_to(&self, room_number: &str) -> bool {
        self.room_number == room_number
    }
}

#[cfg(test)]
mod tests {
    use super::{FileHandle, SharedRecord};

    #[test]
    fn new_record_copies_file_name_and_room() {
        let file = FileHandle::new("syllabus.pdf", "application/pdf", b"%PDF-1.7".to_vec());
        let record = SharedRecord::new(file, "101");

        assert_eq!(record.name, "syllabus.pdf");
        assert_eq!(record.room_number, "101");
        assert_eq!(record.file.metadata.size, 8);
        assert!(record.belongs_to("101"));
        assert!(!record.belongs_to("1010"));
    }

    #[test]
    fn ids_are_fresh_per_record() {
        let first = SharedRecord::new(FileHandle::new("a.pdf", "application/pdf", Vec::new()), "101");
        let second = SharedRecord::new(FileHandle::new("b.pdf", "application/pdf", Vec::new()), "101");

        assert_ne!(first.id, second.id);
        assert!(first.uploaded_at <= second.uploaded_at);
    }
}
