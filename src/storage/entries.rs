//! Persistence for dictionary entries.
//!
//! The `words` table doubles as the existence index the dictionary spider
//! consults before fetching a character's detail page. Checking and
//! inserting are independent statements; two tasks may both see a name as
//! missing, in which case the second insert fails on the primary key.

use super::base::StorageError;
use crate::spiders::dictionary::DictionaryEntry;
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::RwLock;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::collections::HashMap;
use std::sync::Arc;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS words (\
    name VARCHAR(100) PRIMARY KEY, \
    strokes VARCHAR(100), \
    pinyin VARCHAR(100), \
    radical VARCHAR(100), \
    basic_definition TEXT, \
    detailed_meaning TEXT, \
    word_class_change TEXT, \
    homophones TEXT, \
    general_dictionary TEXT)";

const COUNT_BY_NAME: &str = "SELECT COUNT(*) FROM words WHERE name = ?";

const INSERT_ENTRY: &str = "INSERT INTO words \
    (name, strokes, pinyin, radical, basic_definition, detailed_meaning, \
    word_class_change, homophones, general_dictionary) \
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";

#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Creates the backing table if needed. Safe to call on every run.
    async fn ensure_schema(&self) -> Result<(), StorageError>;

    async fn entry_exists(&self, name: &str) -> Result<bool, StorageError>;

    async fn insert(&self, entry: &DictionaryEntry) -> Result<(), StorageError>;
}

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        StorageError::OperationError(error.to_string())
    }
}

#[derive(Clone)]
pub struct SqlEntryStore {
    pool: AnyPool,
}

impl SqlEntryStore {
    /// Connects to any URL sqlx understands, e.g. `mysql://root@localhost/dictionary`
    /// or `sqlite://words.db?mode=rwc`.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;
        info!("Connected entry store");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl EntryStore for SqlEntryStore {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    async fn entry_exists(&self, name: &str) -> Result<bool, StorageError> {
        let count: i64 = sqlx::query_scalar(COUNT_BY_NAME)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn insert(&self, entry: &DictionaryEntry) -> Result<(), StorageError> {
        sqlx::query(INSERT_ENTRY)
            .bind(&entry.name)
            .bind(&entry.strokes)
            .bind(&entry.pinyin)
            .bind(&entry.radical)
            .bind(&entry.basic_definition)
            .bind(&entry.detailed_meaning)
            .bind(&entry.word_class_change)
            .bind(&entry.homophones)
            .bind(&entry.general_dictionary)
            .execute(&self.pool)
            .await?;
        debug!("Inserted entry {}", entry.name);
        Ok(())
    }
}

/// Keeps entries in process memory. Useful for dry runs and tests.
#[derive(Clone, Default)]
pub struct MemoryEntryStore {
    entries: Arc<RwLock<HashMap<String, DictionaryEntry>>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut entries = store.entries.write();
            for name in names {
                let entry = DictionaryEntry::named(name);
                entries.insert(entry.name.clone(), entry);
            }
        }
        store
    }

    pub fn get(&self, name: &str) -> Option<DictionaryEntry> {
        self.entries.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn ensure_schema(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn entry_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.entries.read().contains_key(name))
    }

    async fn insert(&self, entry: &DictionaryEntry) -> Result<(), StorageError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&entry.name) {
            return Err(StorageError::OperationError(format!(
                "duplicate entry '{}' for key 'PRIMARY'",
                entry.name
            )));
        }
        entries.insert(entry.name.clone(), entry.clone());
        Ok(())
    }
}
