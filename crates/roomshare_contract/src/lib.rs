pub mod codec;
pub mod record;
pub mod upload;

pub use codec::{decode_collection, encode_collection, CodecError, PersistedRecord};
pub use record::{FileHandle, FileMetadata, RecordId, RoomNumber, SharedRecord};
pub use upload::{UploadError, UploadRequest, PDF_CONTENT_TYPE};
