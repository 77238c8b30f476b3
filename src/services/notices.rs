// src/services/notices.rs

//! Notice ingestion service.
//!
//! Upserts a source's batch into the notice store keyed by
//! `(exchange, external_id)`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::Upsert;
use crate::error::{AppError, Result};
use crate::models::{IngestionResult, NoticeItem, NoticeRecord};
use crate::storage::NoticeStore;
use crate::utils::is_blank;

/// Service for persisting notice batches.
pub struct NoticeIngestionService {
    store: Arc<dyn NoticeStore>,
}

impl NoticeIngestionService {
    pub fn new(store: Arc<dyn NoticeStore>) -> Self {
        Self { store }
    }

    /// Ingest a batch observed now.
    pub async fn ingest(&self, exchange: &str, items: Vec<NoticeItem>) -> Result<IngestionResult> {
        self.ingest_at(exchange, items, Utc::now()).await
    }

    /// Ingest a batch observed at `now`.
    ///
    /// Items without an external id count as fetched but are not stored.
    pub async fn ingest_at(
        &self,
        exchange: &str,
        items: Vec<NoticeItem>,
        now: DateTime<Utc>,
    ) -> Result<IngestionResult> {
        let mut result = IngestionResult::fetched(items.len());

        for item in items {
            if is_blank(&item.external_id) {
                log::debug!("exchange={exchange} skipping notice without id: {:?}", item.title);
                continue;
            }
            match self.upsert(exchange, item, now).await? {
                Upsert::Inserted => result.inserted_count += 1,
                Upsert::Updated => result.updated_count += 1,
            }
        }

        log::info!(
            "exchange={} notices fetched={} inserted={} updated={} skipped={}",
            exchange,
            result.fetched_count,
            result.inserted_count,
            result.updated_count,
            result.skipped_count()
        );
        Ok(result)
    }

    async fn upsert(&self, exchange: &str, item: NoticeItem, now: DateTime<Utc>) -> Result<Upsert> {
        if let Some(existing) = self.store.find_notice(exchange, &item.external_id).await? {
            return self.refresh(existing, item, now).await;
        }

        let record = NoticeRecord::create(exchange, item.clone(), now);
        match self.store.insert_notice(record).await {
            Ok(()) => Ok(Upsert::Inserted),
            Err(AppError::Duplicate { key }) => {
                // Another writer inserted between lookup and insert.
                log::debug!("exchange={exchange} lost insert race on {key}, updating instead");
                let existing = self
                    .store
                    .find_notice(exchange, &item.external_id)
                    .await?
                    .ok_or_else(|| AppError::storage(format!("notice {key} vanished after duplicate insert")))?;
                self.refresh(existing, item, now).await
            }
            Err(e) => Err(e),
        }
    }

    async fn refresh(&self, mut existing: NoticeRecord, item: NoticeItem, now: DateTime<Utc>) -> Result<Upsert> {
        existing.observe(item, now);
        self.store.update_notice(existing).await?;
        Ok(Upsert::Updated)
    }
}
