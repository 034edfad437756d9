use super::base::{StorageBackend, StorageError, StorageItem};
use async_trait::async_trait;
use mongodb::bson::{self, doc, Document};
use mongodb::Client;

#[derive(Clone)]
pub struct MongoStorage {
    database_name: String,
    client: Client,
}

impl MongoStorage {
    pub async fn new(connection_string: &str, database_name: &str) -> Result<Self, StorageError> {
        let client = Client::with_uri_str(connection_string)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;
        Ok(Self {
            database_name: database_name.to_string(),
            client,
        })
    }
}

#[async_trait]
impl StorageBackend for MongoStorage {
    async fn store(&self, item: StorageItem, collection: &str) -> Result<(), StorageError> {
        let collection = self
            .client
            .database(&self.database_name)
            .collection::<Document>(collection);

        let metadata = match &item.metadata {
            Some(m) => bson::to_bson(m)?,
            None => bson::Bson::Null,
        };
        let document = doc! {
            "url": item.url.to_string(),
            "timestamp": item.timestamp.to_rfc3339(),
            "data": bson::to_bson(&item.data)?,
            "metadata": metadata,
        };
        collection.insert_one(document).await?;
        Ok(())
    }
}

impl From<bson::ser::Error> for StorageError {
    fn from(err: bson::ser::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

impl From<mongodb::error::Error> for StorageError {
    fn from(err: mongodb::error::Error) -> Self {
        StorageError::OperationError(err.to_string())
    }
}
