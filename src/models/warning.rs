//! Market warning data structures.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::is_blank;

/// A market warning as produced by a source on a single poll.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WarningItem {
    /// Trading pair or asset identifier
    pub market: String,

    /// Exchange-specific warning category
    pub warning_type: String,

    /// Severity or stage
    pub warning_step: String,

    /// Expiry, when the exchange reports one
    pub end_at: Option<NaiveDateTime>,
}

impl WarningItem {
    /// Whether a required identity field is missing.
    pub fn is_invalid(&self) -> bool {
        is_blank(&self.market) || is_blank(&self.warning_type) || is_blank(&self.warning_step)
    }
}

/// Identity of a stored warning.
///
/// `end_at` is part of the identity: a warning whose expiry changes is a new row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WarningKey {
    pub exchange: String,
    pub market: String,
    pub warning_type: String,
    pub warning_step: String,
    pub end_at: Option<NaiveDateTime>,
}

impl WarningKey {
    pub fn new(exchange: &str, item: &WarningItem) -> Self {
        Self {
            exchange: exchange.to_string(),
            market: item.market.clone(),
            warning_type: item.warning_type.clone(),
            warning_step: item.warning_step.clone(),
            end_at: item.end_at,
        }
    }
}

impl fmt::Display for WarningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end_at = self
            .end_at
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.exchange, self.market, self.warning_type, self.warning_step, end_at
        )
    }
}

/// A persisted market warning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WarningRecord {
    pub exchange: String,
    pub market: String,
    pub warning_type: String,
    pub warning_step: String,
    pub end_at: Option<NaiveDateTime>,
    pub first_seen_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl WarningRecord {
    /// Create a record for a first observation.
    pub fn create(exchange: &str, item: WarningItem, now: DateTime<Utc>) -> Self {
        Self {
            exchange: exchange.to_string(),
            market: item.market,
            warning_type: item.warning_type,
            warning_step: item.warning_step,
            end_at: item.end_at,
            first_seen_at: now,
            last_seen_at: now,
        }
    }

    /// Apply a repeat observation. Only the sighting time moves.
    pub fn observe(&mut self, now: DateTime<Utc>) {
        self.last_seen_at = self.last_seen_at.max(now);
    }

    pub fn key(&self) -> WarningKey {
        WarningKey {
            exchange: self.exchange.clone(),
            market: self.market.clone(),
            warning_type: self.warning_type.clone(),
            warning_step: self.warning_step.clone(),
            end_at: self.end_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_invalid_when_step_blank() {
        let item = WarningItem {
            market: "KRW-BTC".into(),
            warning_type: "PRICE_SUDDEN_FLUCTUATION".into(),
            warning_step: " ".into(),
            end_at: None,
        };
        assert!(item.is_invalid());
    }

    #[test]
    fn test_key_includes_end_at() {
        let base = WarningItem {
            market: "KRW-BTC".into(),
            warning_type: "TRADING_VOLUME_SUDDEN_FLUCTUATION".into(),
            warning_step: "CAUTION".into(),
            end_at: None,
        };
        let later = WarningItem {
            end_at: NaiveDate::from_ymd_opt(2025, 3, 1).and_then(|d| d.and_hms_opt(9, 0, 0)),
            ..base.clone()
        };
        assert_ne!(WarningKey::new("bithumb", &base), WarningKey::new("bithumb", &later));
        assert_eq!(
            WarningKey::new("bithumb", &base).to_string(),
            "bithumb/KRW-BTC/TRADING_VOLUME_SUDDEN_FLUCTUATION/CAUTION/-"
        );
    }
}
