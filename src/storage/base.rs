use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Operation error: {0}")]
    OperationError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        StorageError::OperationError(error.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::SerializationError(error.to_string())
    }
}

/// One scraped record together with where and when it was found.
#[derive(Debug, Clone, Serialize)]
pub struct StorageItem {
    pub url: Url,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
    pub metadata: Option<Value>,
}

impl StorageItem {
    pub fn new<T: Serialize>(url: Url, data: &T) -> Result<Self, StorageError> {
        Ok(Self {
            url,
            timestamp: Utc::now(),
            data: serde_json::to_value(data)?,
            metadata: None,
        })
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn store(&self, item: StorageItem, collection: &str) -> Result<(), StorageError>;
}
