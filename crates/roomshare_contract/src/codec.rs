use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{FileHandle, FileMetadata, SharedRecord};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to serialize record collection to JSON: {0}")]
    JsonSerialize(#[source] serde_json::Error),
    #[error("failed to parse record collection: {0}")]
    JsonDeserialize(#[source] serde_json::Error),
}

/// On-disk shape of one record: camelCase keys, ISO-8601 `uploadedAt`, and a
/// nested `fileInfo` in place of the file itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub id: String,
    pub name: String,
    pub room_number: String,
    #[serde(with = "iso_millis")]
    pub uploaded_at: DateTime<Utc>,
    pub file_info: PersistedFileInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedFileInfo {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
}

impl From<&SharedRecord> for PersistedRecord {
    fn from(record: &SharedRecord) -> Self {
        let metadata = &record.file.metadata;
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            room_number: record.room_number.clone(),
            uploaded_at: record.uploaded_at,
            file_info: PersistedFileInfo {
                name: metadata.name.clone(),
                size: metadata.size,
                content_type: metadata.content_type.clone(),
            },
        }
    }
}

impl From<PersistedRecord> for SharedRecord {
    fn from(persisted: PersistedRecord) -> Self {
        let info = persisted.file_info;
        Self {
            id: persisted.id,
            name: persisted.name,
            room_number: persisted.room_number,
            uploaded_at: persisted.uploaded_at,
            file: FileHandle::placeholder(FileMetadata {
                name: info.name,
                size: info.size,
                content_type: info.content_type,
            }),
        }
    }
}

pub fn encode_collection(records: &[SharedRecord]) -> Result<String, CodecError> {
    let persisted: Vec<PersistedRecord> = records.iter().map(PersistedRecord::from).collect();
    serde_json::to_string(&persisted).map_err(CodecError::JsonSerialize)
}

pub fn decode_collection(blob: &str) -> Result<Vec<SharedRecord>, CodecError> {
    let persisted: Vec<PersistedRecord> =
        serde_json::from_str(blob).map_err(CodecError::JsonDeserialize)?;
    Ok(persisted.into_iter().map(SharedRecord::from).collect())
}

mod iso_millis {
    use super::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_collection, encode_collection, CodecError};
    use crate::record::{FileHandle, SharedRecord};
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    fn sample(room: &str) -> SharedRecord {
        let mut record = SharedRecord::new(
            FileHandle::new("lecture-01.pdf", "application/pdf", vec![1, 2, 3, 4]),
            room,
        );
        record.uploaded_at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).single().expect("timestamp");
        record
    }

    #[test]
    fn encodes_the_browser_layout() {
        let blob = encode_collection(&[sample("101")]).expect("encode");
        let value: Value = serde_json::from_str(&blob).expect("json");
        let item = &value[0];

        assert_eq!(item["roomNumber"], "101");
        assert_eq!(item["uploadedAt"], "2024-05-01T09:30:00.000Z");
        assert_eq!(item["fileInfo"]["name"], "lecture-01.pdf");
        assert_eq!(item["fileInfo"]["size"], 4);
        assert_eq!(item["fileInfo"]["type"], "application/pdf");
        assert!(item.get("file").is_none());
    }

    #[test]
    fn decoded_records_keep_metadata_but_drop_contents() {
        let original = sample("204");
        let blob = encode_collection(&[original.clone()]).expect("encode");
        let decoded = decode_collection(&blob).expect("decode");

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].id, original.id);
        assert_eq!(decoded[0].uploaded_at, original.uploaded_at);
        assert_eq!(decoded[0].file.metadata, original.file.metadata);
        assert!(decoded[0].file.is_placeholder());
    }

    #[test]
    fn accepts_legacy_blobs_with_numeric_ids_and_file_artifacts() {
        let blob = r#"[{"id":"1714555800000","name":"x.pdf","roomNumber":"101",
            "uploadedAt":"2024-05-01T09:30:00.000Z","file":{},
            "fileInfo":{"name":"x.pdf","size":2048,"type":"application/pdf"}}]"#;

        let decoded = decode_collection(blob).expect("decode");

        assert_eq!(decoded[0].id, "1714555800000");
        assert_eq!(decoded[0].file.metadata.size, 2048);
    }

    #[test]
    fn missing_file_info_is_a_decode_failure() {
        let blob = r#"[{"id":"1","name":"x.pdf","roomNumber":"101","uploadedAt":"2024-05-01T09:30:00.000Z"}]"#;

        assert!(matches!(
            decode_collection(blob),
            Err(CodecError::JsonDeserialize(_))
        ));
    }

    #[test]
    fn malformed_json_is_a_decode_failure() {
        assert!(decode_collection("[{not json").is_err());
        assert!(decode_collection(r#"{"id":"1"}"#).is_err());
    }
}
