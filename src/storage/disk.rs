use super::base::{StorageBackend, StorageError, StorageItem};
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Appends records as JSON lines to `<base>/<collection>.jsonl`.
#[derive(Clone)]
pub struct DiskStorage {
    base_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl DiskStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", collection))
    }
}

#[async_trait]
impl StorageBackend for DiskStorage {
    async fn store(&self, item: StorageItem, collection: &str) -> Result<(), StorageError> {
        let mut line = serde_json::to_string(&item)?;
        line.push('\n');

        let path = self.collection_path(collection);
        let write_lock = Arc::clone(&self.write_lock);
        let target = path.clone();
        // File writes block, so they run off the async workers.
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let _guard = write_lock.lock();
            let mut file = OpenOptions::new().create(true).append(true).open(&target)?;
            file.write_all(line.as_bytes())?;
            Ok(())
        })
        .await
        .map_err(|e| StorageError::OperationError(format!("write task failed: {}", e)))??;

        debug!("Appended record from {} to {}", item.url, path.display());
        Ok(())
    }
}
