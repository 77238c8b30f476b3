// src/utils/html.rs

//! HTML scraping helpers shared by crawler-backed sources.
//!
//! Everything here works on an already parsed [`Html`] document and degrades to
//! empty results on unexpected markup instead of failing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::utils::{absolute_url, normalize_whitespace, text_length};

static ANY_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("static selector"));
static SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span").expect("static selector"));
static CATEGORY: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".category, [class*='category']").expect("static selector")
});
static DATE_SHAPED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static regex"));

/// Elements whose subtree is treated as one list row around an anchor.
const ROW_TAGS: [&str; 4] = ["tr", "li", "article", "div"];

/// Parse a CSS selector, mapping failures to a configuration-level error.
pub fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Parse a list of CSS selectors, failing on the first invalid one.
pub fn parse_selectors(list: &[String]) -> Result<Vec<Selector>> {
    list.iter().map(|s| parse_selector(s)).collect()
}

/// Whitespace-normalized text content of an element.
pub fn text_of(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text of the first descendant matching `selector`, if any.
pub fn text_of_first(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector).next().map(text_of)
}

/// Whether text looks like a bare `YYYY-MM-DD` date.
pub fn is_date_shaped(text: &str) -> bool {
    DATE_SHAPED.is_match(text)
}

/// Nearest ancestor whose tag is one of `tags`.
pub fn closest<'a>(element: ElementRef<'a>, tags: &[&str]) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| tags.contains(&el.value().name()))
}

/// Short label-like texts under `root`, in document order without repeats.
///
/// Blank, date-shaped and overlong texts are skipped.
pub fn harvest_categories(root: ElementRef<'_>, selector: &Selector, max_len: usize) -> Vec<String> {
    let mut categories = Vec::new();
    push_categories(&mut categories, root, selector, max_len);
    categories
}

fn push_categories(out: &mut Vec<String>, root: ElementRef<'_>, selector: &Selector, max_len: usize) {
    for node in root.select(selector) {
        let text = text_of(node);
        if text.is_empty() || text_length(&text) > max_len || is_date_shaped(&text) {
            continue;
        }
        if !out.contains(&text) {
            out.push(text);
        }
    }
}

/// A notice link found on a rendered list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawledNotice {
    pub title: String,
    pub url: String,
    pub categories: Vec<String>,
}

/// Decides which absolute URLs point at notice detail pages.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    includes: Vec<String>,
    excludes: Vec<String>,
    detail: Option<Regex>,
}

impl UrlFilter {
    pub fn new(includes: &[String], excludes: &[String], detail_pattern: Option<&str>) -> Result<Self> {
        Ok(Self {
            includes: includes.iter().map(|s| s.to_lowercase()).collect(),
            excludes: excludes.iter().map(|s| s.to_lowercase()).collect(),
            detail: detail_pattern.map(Regex::new).transpose()?,
        })
    }

    /// Case-insensitive check against the include, exclude and detail rules.
    pub fn accepts(&self, url: &str) -> bool {
        let lower = url.to_lowercase();
        if lower.trim().is_empty() {
            return false;
        }
        if !self.includes.is_empty() && !self.includes.iter().any(|p| lower.contains(p)) {
            return false;
        }
        if self.excludes.iter().any(|p| lower.contains(p)) {
            return false;
        }
        self.detail.as_ref().is_none_or(|re| re.is_match(&lower))
    }
}

/// Anchor-based extraction over one document.
pub struct AnchorScan<'a> {
    pub base: &'a Url,
    pub filter: &'a UrlFilter,
    pub limit: usize,
    pub span_category_max_len: usize,
    pub nearby_category_max_len: usize,
}

impl AnchorScan<'_> {
    /// Try each selector in priority order until `limit` distinct URLs are found.
    pub fn by_selectors(&self, document: &Html, selectors: &[Selector]) -> Vec<CrawledNotice> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        for selector in selectors {
            self.collect(&mut found, &mut seen, document.select(selector));
            if found.len() >= self.limit {
                break;
            }
        }
        found
    }

    /// Consider every anchor on the page.
    pub fn all_anchors(&self, document: &Html) -> Vec<CrawledNotice> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();
        self.collect(&mut found, &mut seen, document.select(&ANY_ANCHOR));
        found
    }

    fn collect<'d>(
        &self,
        found: &mut Vec<CrawledNotice>,
        seen: &mut HashSet<String>,
        anchors: impl Iterator<Item = ElementRef<'d>>,
    ) {
        for anchor in anchors {
            if found.len() >= self.limit {
                return;
            }

            let Some(url) = anchor
                .value()
                .attr("href")
                .and_then(|href| absolute_url(self.base, href))
            else {
                continue;
            };
            if !self.filter.accepts(&url) || seen.contains(&url) {
                continue;
            }

            let title = text_of(anchor);
            if title.is_empty() {
                continue;
            }

            seen.insert(url.clone());
            found.push(CrawledNotice {
                title,
                url,
                categories: self.anchor_categories(anchor),
            });
        }
    }

    /// Category labels nested in the anchor or tagged as categories in its row.
    fn anchor_categories(&self, anchor: ElementRef<'_>) -> Vec<String> {
        let mut categories = harvest_categories(anchor, &SPAN, self.span_category_max_len);
        if let Some(row) = closest(anchor, &ROW_TAGS) {
            push_categories(&mut categories, row, &CATEGORY, self.nearby_category_max_len);
        }
        categories
    }
}
