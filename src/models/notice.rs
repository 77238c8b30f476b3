//! Notice data structures.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::NoticeType;
use crate::utils::is_blank;

/// A notice as produced by a source on a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeItem {
    /// Source-assigned identifier, unique per exchange
    pub external_id: String,

    /// Notice title
    pub title: String,

    /// Full URL to the notice (or the list page when no detail URL exists)
    pub url: String,

    /// Serialized JSON array of canonical categories
    pub categories: String,

    /// Classified notice type
    pub notice_type: NoticeType,

    /// Publication time as reported by the exchange
    pub published_at: Option<NaiveDateTime>,

    /// Last modification time as reported by the exchange
    pub modified_at: Option<NaiveDateTime>,

    /// Body text, when the feed carries one
    pub content: Option<String>,
}

impl Default for NoticeItem {
    fn default() -> Self {
        Self {
            external_id: String::new(),
            title: String::new(),
            url: String::new(),
            categories: "[]".to_string(),
            notice_type: NoticeType::Other,
            published_at: None,
            modified_at: None,
            content: None,
        }
    }
}

/// A persisted notice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoticeRecord {
    pub exchange: String,
    pub external_id: String,
    pub title: String,
    pub url: String,
    pub categories: String,
    pub notice_type: NoticeType,
    pub published_at: Option<NaiveDateTime>,
    pub modified_at: Option<NaiveDateTime>,
    pub content: Option<String>,

    /// Set once on creation
    pub first_seen_at: DateTime<Utc>,

    /// Advanced on every observation
    pub last_seen_at: DateTime<Utc>,
}

impl NoticeRecord {
    /// Create a record for a first observation.
    pub fn create(exchange: &str, item: NoticeItem, now: DateTime<Utc>) -> Self {
        Self {
            exchange: exchange.to_string(),
            external_id: item.external_id,
            title: item.title,
            url: item.url,
            categories: item.categories,
            notice_type: item.notice_type,
            published_at: item.published_at,
            modified_at: item.modified_at,
            content: item.content,
            first_seen_at: now,
            last_seen_at: now,
        }
    }

    /// Apply a repeat observation.
    ///
    /// Mutable fields are overwritten, except that stored content is kept when the
    /// new observation carries none.
    pub fn observe(&mut self, item: NoticeItem, now: DateTime<Utc>) {
        self.title = item.title;
        self.url = item.url;
        self.categories = item.categories;
        self.notice_type = item.notice_type;
        self.published_at = item.published_at;
        self.modified_at = item.modified_at;
        if let Some(content) = item.content.filter(|c| !is_blank(c)) {
            self.content = Some(content);
        }
        self.last_seen_at = self.last_seen_at.max(now);
    }

    /// Unique key of this record.
    pub fn key(&self) -> (String, String) {
        (self.exchange.clone(), self.external_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(title: &str, content: Option<&str>) -> NoticeItem {
        NoticeItem {
            external_id: "abc".to_string(),
            title: title.to_string(),
            url: "https://example.com/notice/abc".to_string(),
            content: content.map(str::to_string),
            ..NoticeItem::default()
        }
    }

    #[test]
    fn test_observe_keeps_content_on_blank() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 5, 0).unwrap();
        let mut record = NoticeRecord::create("x", item("A", Some("full body")), t0);

        record.observe(item("A-updated", Some("  ")), t1);

        assert_eq!(record.title, "A-updated");
        assert_eq!(record.content.as_deref(), Some("full body"));
        assert_eq!(record.first_seen_at, t0);
        assert_eq!(record.last_seen_at, t1);
    }

    #[test]
    fn test_observe_never_moves_last_seen_backwards() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2025, 1, 1, 11, 0, 0).unwrap();
        let mut record = NoticeRecord::create("x", item("A", None), t0);

        record.observe(item("A", Some("body")), earlier);

        assert_eq!(record.last_seen_at, t0);
        assert_eq!(record.content.as_deref(), Some("body"));
    }
}
