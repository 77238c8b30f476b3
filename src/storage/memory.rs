//! In-memory storage backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{NoticeRecord, WarningKey, WarningRecord};
use crate::storage::{NoticeStore, WarningStore};

/// Keyed record tables shared by the in-memory and file-backed stores.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) notices: BTreeMap<(String, String), NoticeRecord>,
    pub(crate) warnings: BTreeMap<WarningKey, WarningRecord>,
}

impl Tables {
    pub(crate) fn from_records(notices: Vec<NoticeRecord>, warnings: Vec<WarningRecord>) -> Self {
        Self {
            notices: notices.into_iter().map(|r| (r.key(), r)).collect(),
            warnings: warnings.into_iter().map(|r| (r.key(), r)).collect(),
        }
    }

    pub(crate) fn find_notice(&self, exchange: &str, external_id: &str) -> Option<NoticeRecord> {
        self.notices
            .get(&(exchange.to_string(), external_id.to_string()))
            .cloned()
    }

    pub(crate) fn insert_notice(&mut self, record: NoticeRecord) -> Result<()> {
        let key = record.key();
        if self.notices.contains_key(&key) {
            return Err(AppError::duplicate(format!("{}/{}", key.0, key.1)));
        }
        self.notices.insert(key, record);
        Ok(())
    }

    /// Replace a notice, returning the previous version.
    pub(crate) fn update_notice(&mut self, record: NoticeRecord) -> Result<NoticeRecord> {
        let key = record.key();
        match self.notices.get_mut(&key) {
            Some(slot) => Ok(std::mem::replace(slot, record)),
            None => Err(AppError::storage(format!(
                "notice {}/{} does not exist",
                key.0, key.1
            ))),
        }
    }

    pub(crate) fn insert_warning(&mut self, record: WarningRecord) -> Result<()> {
        let key = record.key();
        if self.warnings.contains_key(&key) {
            return Err(AppError::duplicate(key.to_string()));
        }
        self.warnings.insert(key, record);
        Ok(())
    }

    /// Replace a warning, returning the previous version.
    pub(crate) fn update_warning(&mut self, record: WarningRecord) -> Result<WarningRecord> {
        let key = record.key();
        match self.warnings.get_mut(&key) {
            Some(slot) => Ok(std::mem::replace(slot, record)),
            None => Err(AppError::storage(format!("warning {key} does not exist"))),
        }
    }
}

/// Process-local store. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all notices, in key order.
    pub async fn notices(&self) -> Vec<NoticeRecord> {
        self.tables.lock().await.notices.values().cloned().collect()
    }

    /// Snapshot of all warnings, in key order.
    pub async fn warnings(&self) -> Vec<WarningRecord> {
        self.tables.lock().await.warnings.values().cloned().collect()
    }
}

#[async_trait]
impl NoticeStore for MemoryStore {
    async fn find_notice(&self, exchange: &str, external_id: &str) -> Result<Option<NoticeRecord>> {
        Ok(self.tables.lock().await.find_notice(exchange, external_id))
    }

    async fn insert_notice(&self, record: NoticeRecord) -> Result<()> {
        self.tables.lock().await.insert_notice(record)
    }

    async fn update_notice(&self, record: NoticeRecord) -> Result<()> {
        self.tables.lock().await.update_notice(record).map(|_| ())
    }

    async fn notice_count(&self) -> Result<usize> {
        Ok(self.tables.lock().await.notices.len())
    }
}

#[async_trait]
impl WarningStore for MemoryStore {
    async fn find_warning(&self, key: &WarningKey) -> Result<Option<WarningRecord>> {
        Ok(self.tables.lock().await.warnings.get(key).cloned())
    }

    async fn insert_warning(&self, record: WarningRecord) -> Result<()> {
        self.tables.lock().await.insert_warning(record)
    }

    async fn update_warning(&self, record: WarningRecord) -> Result<()> {
        self.tables.lock().await.update_warning(record).map(|_| ())
    }

    async fn warning_count(&self) -> Result<usize> {
        Ok(self.tables.lock().await.warnings.len())
    }
}
