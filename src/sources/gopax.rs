// src/sources/gopax.rs

//! GOPAX public API notice source.

use async_trait::async_trait;
use serde_json::Value;

use super::{NoticeSource, recover};
use crate::error::Result;
use crate::models::profile::join_path;
use crate::models::{GopaxConfig, NoticeItem};
use crate::services::classify::{classify_gopax_type, to_categories_json};
use crate::utils::http::fetch_text;
use crate::utils::is_blank;
use crate::utils::response::{extract_array_items, int_of, parse_exchange_datetime, read_tree, text_of};

const EXCHANGE: &str = "gopax";

const MAX_NOTICE_LIMIT: usize = 20;

/// Latest notices from `GET /notices`.
pub struct GopaxNoticeSource {
    client: reqwest::Client,
    endpoint: String,
    limit: usize,
    page: i64,
    format: u32,
    url_template: String,
}

impl GopaxNoticeSource {
    pub fn new(client: reqwest::Client, config: &GopaxConfig) -> Self {
        Self {
            client,
            endpoint: join_path(&config.base_url, "/notices"),
            limit: config.notice_limit.min(MAX_NOTICE_LIMIT),
            page: config.notice_page.max(0),
            format: config.notice_format,
            url_template: config.notice_url_template.clone(),
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
        let id = text_of(item, "id").filter(|s| !is_blank(s))?;
        let title = text_of(item, "title").filter(|s| !is_blank(s))?;
        let type_code = int_of(item, "type");

        Some(NoticeItem {
            url: self.url_template.replace("{id}", &id),
            external_id: id,
            title,
            categories: to_categories_json(&[type_label(type_code).to_string()]),
            notice_type: classify_gopax_type(type_code),
            published_at: parse_exchange_datetime(text_of(item, "createdAt").as_deref()),
            modified_at: parse_exchange_datetime(text_of(item, "updatedAt").as_deref()),
            content: text_of(item, "content"),
        })
    }

    async fn fetch(&self) -> Result<Vec<NoticeItem>> {
        let query = [
            ("limit", self.limit.to_string()),
            ("page", self.page.to_string()),
            ("format", self.format.to_string()),
        ];
        let body = fetch_text(&self.client, &self.endpoint, &query).await?;
        self.parse_notices(&body)
    }
}

/// Category label for a numeric notice type.
fn type_label(code: Option<i64>) -> &'static str {
    match code {
        Some(1) => "공지",
        Some(2) => "거래지원",
        Some(3) => "이벤트",
        Some(4) => "입출금",
        _ => "공지사항",
    }
}

#[async_trait]
impl NoticeSource for GopaxNoticeSource {
    fn exchange(&self) -> &str {
        EXCHANGE
    }

    async fn fetch_latest_notices(&self) -> Result<Vec<NoticeItem>> {
        recover(EXCHANGE, "notices", self.fetch().await)
    }
}
