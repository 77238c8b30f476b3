// src/services/warnings.rs

//! Market warning ingestion service.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::Upsert;
use crate::error::{AppError, Result};
use crate::models::{IngestionResult, WarningItem, WarningKey, WarningRecord};
use crate::storage::WarningStore;

/// Service for persisting warning batches.
///
/// Warnings that disappear from a feed are left in place.
pub struct WarningIngestionService {
    store: Arc<dyn WarningStore>,
}

impl WarningIngestionService {
    pub fn new(store: Arc<dyn WarningStore>) -> Self {
        Self { store }
    }

    /// Ingest a batch observed now.
    pub async fn ingest(&self, exchange: &str, items: Vec<WarningItem>) -> Result<IngestionResult> {
        self.ingest_at(exchange, items, Utc::now()).await
    }

    /// Ingest a batch observed at `now`.
    pub async fn ingest_at(
        &self,
        exchange: &str,
        items: Vec<WarningItem>,
        now: DateTime<Utc>,
    ) -> Result<IngestionResult> {
        let mut result = IngestionResult::fetched(items.len());

        for item in items {
            if item.is_invalid() {
                log::debug!("exchange={exchange} skipping incomplete warning: {item:?}");
                continue;
            }
            match self.upsert(exchange, item, now).await? {
                Upsert::Inserted => result.inserted_count += 1,
                Upsert::Updated => result.updated_count += 1,
            }
        }

        log::info!(
            "exchange={} warnings fetched={} inserted={} updated={} skipped={}",
            exchange,
            result.fetched_count,
            result.inserted_count,
            result.updated_count,
            result.skipped_count()
        );
        Ok(result)
    }

    async fn upsert(&self, exchange: &str, item: WarningItem, now: DateTime<Utc>) -> Result<Upsert> {
        let key = WarningKey::new(exchange, &item);
        if let Some(existing) = self.store.find_warning(&key).await? {
            return self.refresh(existing, now).await;
        }

        match self.store.insert_warning(WarningRecord::create(exchange, item, now)).await {
            Ok(()) => Ok(Upsert::Inserted),
            Err(AppError::Duplicate { .. }) => {
                log::debug!("exchange={exchange} lost insert race on {key}, updating instead");
                let existing = self
                    .store
                    .find_warning(&key)
                    .await?
                    .ok_or_else(|| AppError::storage(format!("warning {key} vanished after duplicate insert")))?;
                self.refresh(existing, now).await
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh(&self, mut existing: WarningRecord, now: DateTime<Utc>) -> Result<Upsert> {
        existing.observe(now);
        self.store.update_warning(existing).await?;
        Ok(Upsert::Updated)
    }
}
