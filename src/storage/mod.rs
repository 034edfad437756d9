pub mod base;
pub mod disk;
pub mod entries;
pub mod factory;
#[cfg(feature = "mongodb")]
pub mod mongo;

pub use base::{StorageBackend, StorageError, StorageItem};
pub use disk::DiskStorage;
pub use entries::{EntryStore, MemoryEntryStore, SqlEntryStore};
pub use factory::{create_storage, Storage, StorageType};
#[cfg(feature = "mongodb")]
pub use mongo::MongoStorage;
