//! Local filesystem storage implementation.
//!
//! Records are held in memory and mirrored to JSON files. Every mutation rewrites
//! the affected file atomically while the table lock is held, so the files never
//! lag behind an acknowledged write.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── notices.json      # NoticeRecord[] in key order
//! └── warnings.json     # WarningRecord[] in key order
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{NoticeRecord, WarningKey, WarningRecord};
use crate::storage::memory::Tables;
use crate::storage::{NoticeStore, WarningStore};

const NOTICES_FILE: &str = "notices.json";
const WARNINGS_FILE: &str = "warnings.json";

/// File-backed record store.
pub struct LocalStorage {
    root_dir: PathBuf,
    tables: Mutex<Tables>,
}

impl LocalStorage {
    /// Open (or create) a store rooted at the given directory.
    pub async fn open(root_dir: impl Into<PathBuf>) -> Result<Self> {
        let root_dir = root_dir.into();
        tokio::fs::create_dir_all(&root_dir).await?;

        let notices: Vec<NoticeRecord> = read_json(&root_dir.join(NOTICES_FILE))
            .await?
            .unwrap_or_default();
        let warnings: Vec<WarningRecord> = read_json(&root_dir.join(WARNINGS_FILE))
            .await?
            .unwrap_or_default();
        log::debug!(
            "Opened storage at {:?}: {} notices, {} warnings",
            root_dir,
            notices.len(),
            warnings.len()
        );

        Ok(Self {
            root_dir,
            tables: Mutex::new(Tables::from_records(notices, warnings)),
        })
    }

    /// Directory holding the data files.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    async fn persist_notices(&self, tables: &Tables) -> Result<()> {
        let records: Vec<&NoticeRecord> = tables.notices.values().collect();
        write_json(&self.root_dir.join(NOTICES_FILE), &records).await
    }

    async fn persist_warnings(&self, tables: &Tables) -> Result<()> {
        let records: Vec<&WarningRecord> = tables.warnings.values().collect();
        write_json(&self.root_dir.join(WARNINGS_FILE), &records).await
    }
}

/// Write bytes atomically (write to temp, then rename).
async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    write_bytes(path, &bytes).await
}

/// Read JSON data, returning None if the file doesn't exist.
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            AppError::storage(format!("{} is not a valid record file: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[async_trait]
impl NoticeStore for LocalStorage {
    async fn find_notice(&self, exchange: &str, external_id: &str) -> Result<Option<NoticeRecord>> {
        Ok(self.tables.lock().await.find_notice(exchange, external_id))
    }

    async fn insert_notice(&self, record: NoticeRecord) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let key = record.key();
        tables.insert_notice(record)?;
        if let Err(e) = self.persist_notices(&tables).await {
            tables.notices.remove(&key);
            return Err(e);
        }
        Ok(())
    }

    async fn update_notice(&self, record: NoticeRecord) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let previous = tables.update_notice(record)?;
        if let Err(e) = self.persist_notices(&tables).await {
            tables.notices.insert(previous.key(), previous);
            return Err(e);
        }
        Ok(())
    }

    async fn notice_count(&self) -> Result<usize> {
        Ok(self.tables.lock().await.notices.len())
    }
}

#[async_trait]
impl WarningStore for LocalStorage {
    async fn find_warning(&self, key: &WarningKey) -> Result<Option<WarningRecord>> {
        Ok(self.tables.lock().await.warnings.get(key).cloned())
    }

    async fn insert_warning(&self, record: WarningRecord) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let key = record.key();
        tables.insert_warning(record)?;
        if let Err(e) = self.persist_warnings(&tables).await {
            tables.warnings.remove(&key);
            return Err(e);
        }
        Ok(())
    }

    async fn update_warning(&self, record: WarningRecord) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let previous = tables.update_warning(record)?;
        if let Err(e) = self.persist_warnings(&tables).await {
            tables.warnings.insert(previous.key(), previous);
            return Err(e);
        }
        Ok(())
    }

    async fn warning_count(&self) -> Result<usize> {
        Ok(self.tables.lock().await.warnings.len())
    }
}
