// src/sources/crawler.rs

//! Crawler-backed notice source.
//!
//! Renders an exchange's notice list page and extracts notices in up to three
//! passes:
//!
//! 1. anchors matched by the profile's primary selectors
//! 2. every anchor on the page, if pass 1 found nothing
//! 3. list rows without usable anchors, if fewer than `limit` notices so far
//!
//! Unexpected markup yields fewer (or no) notices, never an error.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;
use url::form_urlencoded::byte_serialize;

use super::{NoticeSource, recover};
use crate::error::Result;
use crate::models::{CrawlerProfile, NoticeItem, RowFallback};
use crate::services::classify::{classify_categories, normalize_categories, to_categories_json};
use crate::utils::html::{
    AnchorScan, CrawledNotice, UrlFilter, harvest_categories, parse_selector, parse_selectors,
    text_of_first,
};
use crate::utils::render::PageRenderer;
use crate::utils::response::parse_date;
use crate::utils::{absolute_url, resolve_url};

const ROW_CATEGORY_SELECTOR: &str = ".category, [class*='category'], span";

/// Row fallback with selectors and pattern compiled.
struct RowRules {
    row: Selector,
    marker: Selector,
    title: Selector,
    date: Option<Selector>,
    anchor: Selector,
    categories: Selector,
    attributes: Vec<String>,
    pattern: Regex,
    template: String,
    category_max_len: usize,
}

impl RowRules {
    fn compile(config: &RowFallback) -> Result<Self> {
        Ok(Self {
            row: parse_selector(&config.row_selector)?,
            marker: parse_selector(&config.row_marker)?,
            title: parse_selector(&config.title_selector)?,
            date: config.date_selector.as_deref().map(parse_selector).transpose()?,
            anchor: parse_selector(&config.anchor_selector)?,
            categories: parse_selector(ROW_CATEGORY_SELECTOR)?,
            attributes: config.url_attributes.clone(),
            pattern: Regex::new(&config.url_pattern)?,
            template: config.url_template.clone(),
            category_max_len: config.category_max_len,
        })
    }
}

/// Notice source that scrapes a rendered list page.
pub struct CrawlerNoticeSource {
    profile: CrawlerProfile,
    renderer: Arc<dyn PageRenderer>,
    base: Url,
    list_url: String,
    filter: UrlFilter,
    primary: Vec<Selector>,
    rows: Option<RowRules>,
}

impl CrawlerNoticeSource {
    /// Compile a profile. Invalid URLs, selectors or patterns are errors.
    pub fn new(profile: CrawlerProfile, renderer: Arc<dyn PageRenderer>) -> Result<Self> {
        let base = Url::parse(&profile.base_url)?;
        let filter = UrlFilter::new(
            &profile.url_includes,
            &profile.url_excludes,
            profile.detail_url_pattern.as_deref(),
        )?;
        let primary = parse_selectors(&profile.primary_selectors)?;
        let rows = profile.row_fallback.as_ref().map(RowRules::compile).transpose()?;

        Ok(Self {
            list_url: profile.list_url(),
            profile,
            renderer,
            base,
            filter,
            primary,
            rows,
        })
    }

    fn limit(&self) -> usize {
        self.profile.limit.max(1)
    }

    /// Extract notices from list page HTML.
    pub fn parse_page(&self, html: &str) -> Vec<NoticeItem> {
        let document = Html::parse_document(html);
        let limit = self.limit();
        let scan = AnchorScan {
            base: &self.base,
            filter: &self.filter,
            limit,
            span_category_max_len: self.profile.anchor_category_max_len,
            nearby_category_max_len: self.profile.nearby_category_max_len,
        };

        let mut crawled = scan.by_selectors(&document, &self.primary);
        if crawled.is_empty() {
            crawled = scan.all_anchors(&document);
        }
        let mut items: Vec<NoticeItem> = crawled.into_iter().map(anchor_item).collect();

        if items.len() < limit {
            if let Some(rules) = &self.rows {
                let mut ids: HashSet<String> = items.iter().map(|i| i.external_id.clone()).collect();
                for item in self.row_items(&document, rules, limit) {
                    if ids.insert(item.external_id.clone()) {
                        items.push(item);
                    }
                }
            }
        }

        log::debug!(
            "exchange={} extracted {} notices from {}",
            self.profile.exchange,
            items.len(),
            self.list_url
        );
        items
    }

    /// Rows holding exactly one title marker, first occurrence of each detail URL.
    fn row_items(&self, document: &Html, rules: &RowRules, limit: usize) -> Vec<NoticeItem> {
        let mut items = Vec::new();
        let mut seen_urls = HashSet::new();

        for row in document.select(&rules.row) {
            if items.len() >= limit {
                break;
            }
            if row.select(&rules.marker).count() != 1 {
                continue;
            }
            let Some(title) = text_of_first(row, &rules.title).filter(|t| !t.is_empty()) else {
                continue;
            };
            let url = self.row_url(row, rules, &title);
            if !seen_urls.insert(url.clone()) {
                continue;
            }

            let published_at = rules
                .date
                .as_ref()
                .and_then(|selector| text_of_first(row, selector))
                .and_then(|text| parse_date(Some(&text)));
            let categories = normalize_categories(harvest_categories(
                row,
                &rules.categories,
                rules.category_max_len,
            ));

            items.push(NoticeItem {
                external_id: url.clone(),
                url,
                title,
                notice_type: classify_categories(&categories),
                categories: to_categories_json(&categories),
                published_at,
                ..NoticeItem::default()
            });
        }
        items
    }

    /// Detail link for a row: its anchor, then link-bearing attributes, then its
    /// markup, and finally a title query on the list page.
    fn row_url(&self, row: ElementRef<'_>, rules: &RowRules, title: &str) -> String {
        if let Some(url) = row
            .select(&rules.anchor)
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| absolute_url(&self.base, href))
        {
            return url;
        }

        for attribute in &rules.attributes {
            let Some(value) = row.value().attr(attribute).map(str::trim) else {
                continue;
            };
            if value.starts_with("http://") || value.starts_with("https://") {
                return value.to_string();
            }
            if let Some(url) = self.url_from_pattern(rules, value) {
                return url;
            }
        }

        if let Some(url) = self.url_from_pattern(rules, &row.html()) {
            return url;
        }

        let encoded: String = byte_serialize(title.as_bytes()).collect();
        format!("{}?title={}", self.list_url, encoded)
    }

    fn url_from_pattern(&self, rules: &RowRules, text: &str) -> Option<String> {
        let capture = rules.pattern.captures(text)?.get(1)?.as_str();
        let link = rules
            .template
            .replace("{list}", &self.list_url)
            .replace("{1}", capture);
        Some(resolve_url(&self.base, &link))
    }

    async fn fetch(&self) -> Result<Vec<NoticeItem>> {
        let html = self.renderer.render(&self.list_url).await?;
        Ok(self.parse_page(&html))
    }
}

fn anchor_item(notice: CrawledNotice) -> NoticeItem {
    let categories = normalize_categories(notice.categories);
    NoticeItem {
        external_id: notice.url.clone(),
        url: notice.url,
        title: notice.title,
        notice_type: classify_categories(&categories),
        categories: to_categories_json(&categories),
        ..NoticeItem::default()
    }
}

#[async_trait]
impl NoticeSource for CrawlerNoticeSource {
    fn exchange(&self) -> &str {
        &self.profile.exchange
    }

    async fn fetch_latest_notices(&self) -> Result<Vec<NoticeItem>> {
        recover(&self.profile.exchange, "notices", self.fetch().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::error::AppError;
    use crate::models::NoticeType;
    use crate::models::profile::default_profiles;

    /// Serves a fixed page regardless of URL.
    struct StaticRenderer(&'static str);

    #[async_trait]
    impl PageRenderer for StaticRenderer {
        async fn render(&self, _url: &str) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct FailingRenderer;

    #[async_trait]
    impl PageRenderer for FailingRenderer {
        async fn render(&self, url: &str) -> Result<String> {
            Err(AppError::Timeout(format!("navigating to {url}")))
        }
    }

    fn profile(exchange: &str) -> CrawlerProfile {
        default_profiles()
            .into_iter()
            .find(|p| p.exchange == exchange)
            .unwrap()
    }

    fn source(exchange: &str, page: &'static str) -> CrawlerNoticeSource {
        CrawlerNoticeSource::new(profile(exchange), Arc::new(StaticRenderer(page))).unwrap()
    }

    const UPBIT_PAGE: &str = r#"
        <html><body>
          <table><tbody>
            <tr>
              <td><a href="/service_center/notice?id=4810"><span>점검</span> 이더리움(ETH) 지갑 점검 안내</a></td>
              <td>2025-02-03</td>
            </tr>
            <tr>
              <td class="category">거래</td>
              <td><a href="/service_center/notice?id=4809">아발란체(AVAX) 원화 마켓 추가</a></td>
            </tr>
            <tr><td><a href="/service_center/faq?id=1">자주 묻는 질문</a></td></tr>
            <tr><td><a href="/service_center/notice?id=4810">중복 링크</a></td></tr>
          </tbody></table>
        </body></html>
    "#;

    #[test]
    fn test_upbit_anchor_pass() {
        let items = source("upbit", UPBIT_PAGE).parse_page(UPBIT_PAGE);
        let urls: Vec<&str> = items.iter().map(|i| i.url.as_str()).collect();

        assert!(urls.contains(&"https://upbit.com/service_center/notice?id=4810"));
        assert!(urls.contains(&"https://upbit.com/service_center/notice?id=4809"));
        assert!(!urls.iter().any(|u| u.contains("faq")));
        assert_eq!(urls.iter().filter(|u| u.ends_with("id=4810")).count(), 1);

        let eth = items.iter().find(|i| i.url.ends_with("id=4810")).unwrap();
        assert_eq!(eth.external_id, eth.url);
        assert_eq!(eth.notice_type, NoticeType::Maintenance);
        assert_eq!(eth.categories, r#"["점검"]"#);

        let avax = items.iter().find(|i| i.url.ends_with("id=4809")).unwrap();
        assert_eq!(avax.notice_type, NoticeType::TradingSupport);
    }

    #[test]
    fn test_limit_caps_anchor_pass() {
        let mut profile = profile("upbit");
        profile.limit = 1;
        let source = CrawlerNoticeSource::new(profile, Arc::new(StaticRenderer(UPBIT_PAGE))).unwrap();
        assert_eq!(source.parse_page(UPBIT_PAGE).len(), 1);
    }

    #[test]
    fn test_zero_limit_treated_as_one() {
        let mut profile = profile("upbit");
        profile.limit = 0;
        let source = CrawlerNoticeSource::new(profile, Arc::new(StaticRenderer(UPBIT_PAGE))).unwrap();
        assert_eq!(source.parse_page(UPBIT_PAGE).len(), 1);
    }

    #[test]
    fn test_any_anchor_pass_when_selectors_miss() {
        let page = r#"<html><body><ul>
            <li><a href="https://news.example.com/news/1">첫 번째 소식</a></li>
            <li><a href="/news/2">두 번째 소식</a></li>
            <li><a href="/about">회사 소개</a></li>
        </ul></body></html>"#;
        let profile = CrawlerProfile {
            exchange: "sample".to_string(),
            enabled: true,
            base_url: "https://news.example.com".to_string(),
            notice_path: "/news".to_string(),
            limit: 20,
            primary_selectors: vec!["table a.notice-link".to_string()],
            url_includes: vec!["/news/".to_string()],
            url_excludes: vec![],
            detail_url_pattern: None,
            anchor_category_max_len: 14,
            nearby_category_max_len: 20,
            row_fallback: None,
        };
        let source = CrawlerNoticeSource::new(profile, Arc::new(StaticRenderer(page))).unwrap();

        let items = source.parse_page(page);

        let urls: Vec<&str> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://news.example.com/news/1", "https://news.example.com/news/2"]
        );
    }

    const KORBIT_PAGE: &str = r#"
        <html><body><ul class="notice-list">
          <li onclick="location.href='/notice/?noticeId=501'">
            <div class="title-wrapper"><div class="title"><h4>BTC 입출금 일시 중단 안내</h4></div></div>
            <span class="category">입출금</span>
            <p class="date">2025-02-01</p>
          </li>
          <li onclick="goDetail('noticeId=502')">
            <div class="title"><h4>신규 디지털 자산 거래지원 안내</h4></div>
            <p class="date">2025-02-02</p>
          </li>
          <li>
            <div class="title"><h4>링크 없는 공지</h4></div>
          </li>
          <li onclick="location.href='/notice/?noticeId=599'">
            <div class="title"><h4>BTC 입출금 일시 중단 안내</h4></div>
          </li>
          <li onclick="location.href='/notice/?noticeId=501'">
            <div class="title"><h4>BTC 입출금 일시 중단 안내</h4></div>
          </li>
        </ul></body></html>
    "#;

    #[test]
    fn test_korbit_row_pass() {
        let items = source("korbit", KORBIT_PAGE).parse_page(KORBIT_PAGE);

        assert_eq!(items.len(), 4);

        assert_eq!(items[0].url, "https://www.korbit.co.kr/notice/?noticeId=501");
        assert_eq!(items[0].external_id, items[0].url);
        assert_eq!(items[0].title, "BTC 입출금 일시 중단 안내");
        assert_eq!(items[0].categories, r#"["입출금"]"#);
        assert_eq!(items[0].notice_type, NoticeType::DepositWithdraw);
        assert_eq!(
            items[0].published_at,
            NaiveDate::from_ymd_opt(2025, 2, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
        );

        assert_eq!(items[1].url, "https://www.korbit.co.kr/notice/?noticeId=502");
        assert_eq!(items[1].notice_type, NoticeType::Other);

        assert!(
            items[2]
                .url
                .starts_with("https://www.korbit.co.kr/notice/?title=")
        );
        assert!(items[2].published_at.is_none());

        // Reposted title, distinct notice.
        assert_eq!(items[3].url, "https://www.korbit.co.kr/notice/?noticeId=599");
        assert_eq!(items[3].title, items[0].title);
    }

    #[test]
    fn test_rows_sharing_a_title_are_kept() {
        let page = r#"
            <html><body><ul>
              <li onclick="location.href='/notice/?noticeId=700'"><div class="title"><h4>서비스 점검 안내</h4></div></li>
              <li onclick="location.href='/notice/?noticeId=701'"><div class="title"><h4>서비스 점검 안내</h4></div></li>
            </ul></body></html>
        "#;

        let items = source("korbit", page).parse_page(page);

        let urls: Vec<&str> = items.iter().map(|i| i.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.korbit.co.kr/notice/?noticeId=700",
                "https://www.korbit.co.kr/notice/?noticeId=701"
            ]
        );
        assert!(items.iter().all(|i| i.title == "서비스 점검 안내"));
    }

    const COINONE_PAGE: &str = r#"
        <html><body>
          <a href="/info/notice">공지사항</a>
          <ul>
            <li><a href="/info/notice/1201"><span>점검</span> 서버 점검 안내</a></li>
          </ul>
          <article data-href="/info/notice/1202">
            <h4>출금 수수료 변경 안내</h4>
            <span>수수료</span>
          </article>
          <article data-href="https://coinone.co.kr/info/notice/1203">
            <h4>이벤트 당첨자 발표</h4>
          </article>
        </body></html>
    "#;

    #[test]
    fn test_coinone_anchor_and_row_passes_merge() {
        let items = source("coinone", COINONE_PAGE).parse_page(COINONE_PAGE);
        let urls: Vec<&str> = items.iter().map(|i| i.url.as_str()).collect();

        assert_eq!(
            urls,
            vec![
                "https://coinone.co.kr/info/notice/1201",
                "https://coinone.co.kr/info/notice/1202",
                "https://coinone.co.kr/info/notice/1203",
            ]
        );
        assert_eq!(items[0].notice_type, NoticeType::Maintenance);
        assert_eq!(items[1].notice_type, NoticeType::Fee);
        assert_eq!(items[1].title, "출금 수수료 변경 안내");
    }

    #[test]
    fn test_unexpected_markup_yields_nothing() {
        let page = "<html><body><p>서비스 준비 중입니다</p></body></html>";
        assert!(source("korbit", page).parse_page(page).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_uses_renderer() {
        let items = source("upbit", UPBIT_PAGE).fetch_latest_notices().await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_render_failure_yields_empty_batch() {
        let source = CrawlerNoticeSource::new(profile("upbit"), Arc::new(FailingRenderer)).unwrap();
        assert!(source.fetch_latest_notices().await.unwrap().is_empty());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut profile = profile("korbit");
        if let Some(rows) = profile.row_fallback.as_mut() {
            rows.url_pattern = "noticeId=([0-9]+".to_string();
        }
        let result = CrawlerNoticeSource::new(profile, Arc::new(FailingRenderer));
        assert!(matches!(result.err(), Some(AppError::Regex(_))));
    }
}
