//! Storage abstractions for notice and warning persistence.
//!
//! Both record kinds are keyed uniquely:
//! - notices by `(exchange, external_id)`
//! - warnings by [`WarningKey`] (exchange, market, type, step, end time)
//!
//! Inserting an existing key fails with [`AppError::Duplicate`](crate::error::AppError::Duplicate)
//! so that concurrent writers can detect the race and fall back to an update.
//!
//! ## Backends
//!
//! ```text
//! MemoryStore     # process-local tables (tests, dry runs)
//! LocalStorage    # {dir}/notices.json + {dir}/warnings.json
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NoticeRecord, WarningKey, WarningRecord};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStore;

/// Persistence for notice records.
#[async_trait]
pub trait NoticeStore: Send + Sync {
    /// Point lookup by unique key.
    async fn find_notice(&self, exchange: &str, external_id: &str) -> Result<Option<NoticeRecord>>;

    /// Insert a new record; fails with `Duplicate` if the key exists.
    async fn insert_notice(&self, record: NoticeRecord) -> Result<()>;

    /// Replace an existing record.
    async fn update_notice(&self, record: NoticeRecord) -> Result<()>;

    /// Number of stored records.
    async fn notice_count(&self) -> Result<usize>;
}

/// Persistence for market warning records.
#[async_trait]
pub trait WarningStore: Send + Sync {
    /// Point lookup by unique key.
    async fn find_warning(&self, key: &WarningKey) -> Result<Option<WarningRecord>>;

    /// Insert a new record; fails with `Duplicate` if the key exists.
    async fn insert_warning(&self, record: WarningRecord) -> Result<()>;

    /// Replace an existing record.
    async fn update_warning(&self, record: WarningRecord) -> Result<()>;

    /// Number of stored records.
    async fn warning_count(&self) -> Result<usize>;
}
