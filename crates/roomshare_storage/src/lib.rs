pub mod backend;
pub mod config;
pub mod file;
pub mod repository;
pub mod sqlite;

pub use backend::{BackendError, BlobBackend, InMemoryBlobBackend, VersionedBlob};
pub use config::{open_store, BackendKind, StorageConfig};
pub use file::FileBlobBackend;
pub use repository::{CorruptBlobPolicy, LoadOutcome, RecordStore, StoreError, StoreOptions};
pub use sqlite::SqliteBlobBackend;
