#[cfg(feature = "mongodb")]
use super::MongoStorage;
use super::{DiskStorage, StorageBackend, StorageError, StorageItem};
use async_trait::async_trait;

pub enum StorageType {
    Disk {
        path: String,
    },
    #[cfg(feature = "mongodb")]
    Mongo {
        connection_string: String,
        database: String,
    },
}

#[derive(Clone)]
pub enum Storage {
    Disk(Box<DiskStorage>),
    #[cfg(feature = "mongodb")]
    Mongo(Box<MongoStorage>),
}

#[async_trait]
impl StorageBackend for Storage {
    async fn store(&self, item: StorageItem, collection: &str) -> Result<(), StorageError> {
        match self {
            Storage::Disk(storage) => storage.store(item, collection).await,
            #[cfg(feature = "mongodb")]
            Storage::Mongo(storage) => storage.store(item, collection).await,
        }
    }
}

pub async fn create_storage(storage_type: StorageType) -> Result<Storage, StorageError> {
    match storage_type {
        StorageType::Disk { path } => Ok(Storage::Disk(Box::new(DiskStorage::new(path)?))),
        #[cfg(feature = "mongodb")]
        StorageType::Mongo {
            connection_string,
            database,
        } => Ok(Storage::Mongo(Box::new(
            MongoStorage::new(&connection_string, &database).await?,
        ))),
    }
}
