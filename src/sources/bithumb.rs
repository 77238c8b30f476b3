// src/sources/bithumb.rs

//! Bithumb public API sources.

use async_trait::async_trait;
use serde_json::Value;

use super::{NoticeSource, WarningSource, recover};
use crate::error::Result;
use crate::models::profile::join_path;
use crate::models::{BithumbConfig, NoticeItem, WarningItem};
use crate::services::classify::{classify_categories, normalize_categories, to_categories_json};
use crate::utils::http::fetch_text;
use crate::utils::response::{extract_array_items, parse_exchange_datetime, read_tree, strings_of, text_of};
use crate::utils::{is_blank, normalize_whitespace};

const EXCHANGE: &str = "bithumb";

/// The notice endpoint rejects larger pages.
const MAX_NOTICE_COUNT: usize = 20;

/// Latest notices from `GET /v1/notices`.
pub struct BithumbNoticeSource {
    client: reqwest::Client,
    endpoint: String,
    count: usize,
    url_fallback: String,
}

impl BithumbNoticeSource {
    pub fn new(client: reqwest::Client, config: &BithumbConfig) -> Self {
        Self {
            client,
            endpoint: join_path(&config.base_url, "/v1/notices"),
            count: config.notice_count.min(MAX_NOTICE_COUNT),
            url_fallback: config.notice_url_fallback.clone(),
        }
    }

    /// Parse a notice list response body.
    pub fn parse_notices(&self, body: &str) -> Result<Vec<NoticeItem>> {
        if is_blank(body) {
            return Ok(Vec::new());
        }
        let root = read_tree(body)?;
        Ok(extract_array_items(&root)
            .iter()
            .filter_map(|item| self.notice_from(item))
            .collect())
    }

    fn notice_from(&self, item: &Value) -> Option<NoticeItem> {
        let raw_title = text_of(item, "title")?;
        let title = normalize_whitespace(&raw_title);
        if title.is_empty() {
            return None;
        }

        let published_raw = text_of(item, "published_at");
        let link = text_of(item, "pc_url")
            .filter(|u| !is_blank(u))
            .or_else(|| text_of(item, "mobile_url").filter(|u| !is_blank(u)))
            .map(|u| u.trim().to_string());
        let external_id = match &link {
            Some(url) => url.clone(),
            // Title as served, before whitespace collapsing.
            None => format!("{}::{}", raw_title, published_raw.as_deref().unwrap_or_default()),
        };

        let categories = normalize_categories(strings_of(item, "categories"));
        Some(NoticeItem {
            external_id,
            url: link.unwrap_or_else(|| self.url_fallback.clone()),
            notice_type: classify_categories(&categories),
            categories: to_categories_json(&categories),
            published_at: parse_exchange_datetime(published_raw.as_deref()),
            modified_at: parse_exchange_datetime(text_of(item, "modified_at").as_deref()),
            content: None,
            title,
        })
    }

    async fn fetch(&self) -> Result<Vec<NoticeItem>> {
        let body = fetch_text(&self.client, &self.endpoint, &[("count", self.count)]).await?;
        self.parse_notices(&body)
    }
}

#[async_trait]
impl NoticeSource for BithumbNoticeSource {
    fn exchange(&self) -> &str {
        EXCHANGE
    }

    async fn fetch_latest_notices(&self) -> Result<Vec<NoticeItem>> {
        recover(EXCHANGE, "notices", self.fetch().await)
    }
}

/// Current market warnings from `GET /v1/market/virtual_asset_warning`.
pub struct BithumbWarningSource {
    client: reqwest::Client,
    endpoint: String,
}

impl BithumbWarningSource {
    pub fn new(client: reqwest::Client, config: &BithumbConfig) -> Self {
        Self {
            client,
            endpoint: join_path(&config.base_url, "/v1/market/virtual_asset_warning"),
        }
    }

    /// Parse a warning list response body, dropping entries without identity.
    pub fn parse_warnings(&self, body: &str) -> Result<Vec<WarningItem>> {
        if is_blank(body) {
            return Ok(Vec::new());
        }
        let root = read_tree(body)?;
        Ok(extract_array_items(&root)
            .iter()
            .map(|item| WarningItem {
                market: text_of(item, "market").unwrap_or_default(),
                warning_type: text_of(item, "warning_type").unwrap_or_default(),
                warning_step: text_of(item, "warning_step").unwrap_or_default(),
                end_at: parse_exchange_datetime(text_of(item, "end_date").as_deref()),
            })
            .filter(|w| !w.is_invalid())
            .collect())
    }

    async fn fetch(&self) -> Result<Vec<WarningItem>> {
        let no_query: [(&str, &str); 0] = [];
        let body = fetch_text(&self.client, &self.endpoint, &no_query).await?;
        self.parse_warnings(&body)
    }
}

#[async_trait]
impl WarningSource for BithumbWarningSource {
    fn exchange(&self) -> &str {
        EXCHANGE
    }

    async fn fetch_latest_warnings(&self) -> Result<Vec<WarningItem>> {
        recover(EXCHANGE, "warnings", self.fetch().await)
    }
}
