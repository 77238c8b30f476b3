//! Per-run ingestion counters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Summary of ingesting one source's batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResult {
    /// Items handed to the ingestion service, valid or not
    pub fetched_count: usize,

    /// Items that created a new record
    pub inserted_count: usize,

    /// Items that refreshed an existing record
    pub updated_count: usize,
}

impl IngestionResult {
    /// Start counting a batch of `fetched` items.
    pub fn fetched(fetched: usize) -> Self {
        Self {
            fetched_count: fetched,
            ..Self::default()
        }
    }

    /// Items that were skipped as invalid.
    pub fn skipped_count(&self) -> usize {
        self.fetched_count
            .saturating_sub(self.inserted_count + self.updated_count)
    }
}

/// Results of one orchestrated run, keyed by exchange identifier.
///
/// Exchanges whose cycle failed are absent.
pub type IngestionReport = BTreeMap<String, IngestionResult>;
