// src/models/mod.rs

//! Domain models for the ingestion pipeline.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod ingestion;
mod notice;
mod notice_type;
pub mod profile;
mod warning;

// Re-export all public types
pub use config::{
    BithumbConfig, Config, CrawlerConfig, ExchangesConfig, GopaxConfig, LoggingConfig,
    RendererConfig, ScheduleConfig, StorageConfig,
};
pub use ingestion::{IngestionReport, IngestionResult};
pub use notice::{NoticeItem, NoticeRecord};
pub use notice_type::NoticeType;
pub use profile::{CrawlerProfile, RowFallback};
pub use warning::{WarningItem, WarningKey, WarningRecord};
