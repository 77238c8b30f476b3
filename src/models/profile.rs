// src/models/profile.rs

//! Scraping profiles for crawler-backed exchanges.
//!
//! Selector lists and thresholds live here rather than in code so they can be
//! retuned from `config.toml` when an exchange changes its markup.

use serde::{Deserialize, Serialize};

/// How to scrape one exchange's rendered notice list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerProfile {
    /// Exchange identifier (e.g., "upbit")
    pub exchange: String,

    /// Whether this profile is registered at startup
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Site root used to resolve relative links
    pub base_url: String,

    /// Path of the notice list page
    pub notice_path: String,

    /// Maximum number of notices per poll
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Anchor selectors tried in order until `limit` URLs are collected
    pub primary_selectors: Vec<String>,

    /// Substrings a detail URL must contain (any of)
    #[serde(default)]
    pub url_includes: Vec<String>,

    /// Substrings that disqualify a URL (FAQ pages, etc.)
    #[serde(default)]
    pub url_excludes: Vec<String>,

    /// Optional regex a URL must match, used to reject the list root itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_url_pattern: Option<String>,

    /// Longest span text treated as a category inside an anchor
    #[serde(default = "default_anchor_category_max_len")]
    pub anchor_category_max_len: usize,

    /// Longest `.category` text treated as a category near an anchor
    #[serde(default = "default_row_category_max_len")]
    pub nearby_category_max_len: usize,

    /// Row-based extraction for lists rendered without stable anchors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_fallback: Option<RowFallback>,
}

impl CrawlerProfile {
    /// Absolute URL of the notice list page.
    pub fn list_url(&self) -> String {
        join_path(&self.base_url, &self.notice_path)
    }
}

/// Selectors for the row-based fallback pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowFallback {
    /// Candidate row elements (list items, cards)
    pub row_selector: String,

    /// A row qualifies only when it contains exactly one match of this selector
    pub row_marker: String,

    /// Title element within a row
    pub title_selector: String,

    /// Date element within a row, text in `YYYY-MM-DD`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_selector: Option<String>,

    /// Anchor within a row that links to the detail page
    pub anchor_selector: String,

    /// Row attributes that may carry a detail link (e.g., `onclick`, `data-href`)
    #[serde(default)]
    pub url_attributes: Vec<String>,

    /// Regex with one capture group locating a detail link in attribute or HTML text
    pub url_pattern: String,

    /// Link built from a capture: `{list}` is the list URL, `{1}` the capture
    #[serde(default = "default_url_template")]
    pub url_template: String,

    /// Longest text treated as a category within a row
    #[serde(default = "default_row_category_max_len")]
    pub category_max_len: usize,
}

/// Join a base URL and a path with exactly one slash between them.
///
/// Absolute `path` values win over the base.
pub fn join_path(base_url: &str, path: &str) -> String {
    if path.trim().is_empty() {
        return base_url.to_string();
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    match (base_url.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", &base_url[..base_url.len() - 1], path),
        (false, false) => format!("{base_url}/{path}"),
        _ => format!("{base_url}{path}"),
    }
}

fn default_enabled() -> bool {
    true
}

fn default_limit() -> usize {
    20
}

fn default_anchor_category_max_len() -> usize {
    14
}

fn default_row_category_max_len() -> usize {
    20
}

fn default_url_template() -> String {
    "{1}".to_string()
}

/// Built-in profiles for the crawler-backed exchanges.
pub fn default_profiles() -> Vec<CrawlerProfile> {
    vec![upbit(), korbit(), coinone()]
}

fn upbit() -> CrawlerProfile {
    CrawlerProfile {
        exchange: "upbit".to_string(),
        enabled: true,
        base_url: "https://upbit.com".to_string(),
        notice_path: "/service_center/notice".to_string(),
        limit: default_limit(),
        primary_selectors: vec![
            "a[href*='/service_center/notice/']".to_string(),
            "a[href*='/service_center/notice?']".to_string(),
            "a[href*='/service_center/notice']".to_string(),
        ],
        url_includes: vec!["/service_center/notice".to_string()],
        url_excludes: vec!["/service_center/faq".to_string()],
        detail_url_pattern: None,
        anchor_category_max_len: default_anchor_category_max_len(),
        nearby_category_max_len: default_row_category_max_len(),
        row_fallback: None,
    }
}

fn korbit() -> CrawlerProfile {
    CrawlerProfile {
        exchange: "korbit".to_string(),
        enabled: true,
        base_url: "https://www.korbit.co.kr".to_string(),
        notice_path: "/notice/".to_string(),
        limit: default_limit(),
        primary_selectors: vec![
            "a[href*='/notice/']".to_string(),
            "a[href*='/notice?']".to_string(),
            "a[href*='/notice']".to_string(),
        ],
        url_includes: vec!["/notice".to_string()],
        url_excludes: vec!["/faq".to_string()],
        detail_url_pattern: None,
        anchor_category_max_len: default_anchor_category_max_len(),
        nearby_category_max_len: default_row_category_max_len(),
        row_fallback: Some(RowFallback {
            row_selector: "li".to_string(),
            row_marker: ".title h4".to_string(),
            title_selector: ".title-wrapper .title h4, .title h4, h4".to_string(),
            date_selector: Some("p.date, .date".to_string()),
            anchor_selector: "a[href*='/notice']".to_string(),
            url_attributes: vec!["onclick".to_string()],
            url_pattern: r"noticeId=([0-9]+)".to_string(),
            url_template: "{list}?noticeId={1}".to_string(),
            category_max_len: default_row_category_max_len(),
        }),
    }
}

fn coinone() -> CrawlerProfile {
    CrawlerProfile {
        exchange: "coinone".to_string(),
        enabled: true,
        base_url: "https://coinone.co.kr".to_string(),
        notice_path: "/info/notice".to_string(),
        limit: default_limit(),
        primary_selectors: vec![
            "a[href*='/info/notice/']".to_string(),
            "a[href*='/info/notice?']".to_string(),
            "a[href*='/info/notice']".to_string(),
        ],
        url_includes: vec!["/info/notice".to_string()],
        url_excludes: vec!["/info/faq".to_string()],
        detail_url_pattern: Some(r"/info/notice(\?|/[^/?#])".to_string()),
        anchor_category_max_len: default_anchor_category_max_len(),
        nearby_category_max_len: default_row_category_max_len(),
        row_fallback: Some(RowFallback {
            row_selector: "li, div, article".to_string(),
            row_marker: "h4, h3, .title".to_string(),
            title_selector: "h4, h3, .title, .subject, [class*='title']".to_string(),
            date_selector: None,
            anchor_selector: "a[href*='/info/notice']".to_string(),
            url_attributes: vec![
                "data-href".to_string(),
                "data-url".to_string(),
                "data-link".to_string(),
                "onclick".to_string(),
            ],
            url_pattern: r#"(/info/notice(?:/[^"'\s)]+|\?[^"'\s)]+)?)"#.to_string(),
            url_template: default_url_template(),
            category_max_len: default_row_category_max_len(),
        }),
    }
}
