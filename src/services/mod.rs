//! Service layer for the ingestion pipeline.
//!
//! This module contains the business logic for:
//! - Category classification (`classify`)
//! - Notice upserts (`NoticeIngestionService`)
//! - Market warning upserts (`WarningIngestionService`)

pub mod classify;
mod notices;
mod warnings;

pub use notices::NoticeIngestionService;
pub use warnings::WarningIngestionService;

/// What a single upsert did to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Upsert {
    Inserted,
    Updated,
}
