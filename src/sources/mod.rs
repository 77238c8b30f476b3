//! Exchange sources.
//!
//! One adapter per exchange and record kind. API-backed adapters read public JSON
//! endpoints; crawler-backed adapters render the notice list page and scrape it
//! according to a [`CrawlerProfile`](crate::models::CrawlerProfile).
//!
//! Fetch failures caused by the outside world (network, render, malformed payload)
//! are logged and reported as an empty batch. Configuration and programming errors
//! still surface as `Err`.

mod bithumb;
mod crawler;
mod gopax;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Config, NoticeItem, WarningItem};
use crate::utils::render::PageRenderer;

pub use bithumb::{BithumbNoticeSource, BithumbWarningSource};
pub use crawler::CrawlerNoticeSource;
pub use gopax::GopaxNoticeSource;

/// Produces the latest notices of one exchange.
#[async_trait]
pub trait NoticeSource: Send + Sync {
    /// Exchange identifier used as the storage namespace.
    fn exchange(&self) -> &str;

    async fn fetch_latest_notices(&self) -> Result<Vec<NoticeItem>>;
}

/// Produces the current market warnings of one exchange.
#[async_trait]
pub trait WarningSource: Send + Sync {
    /// Exchange identifier used as the storage namespace.
    fn exchange(&self) -> &str;

    async fn fetch_latest_warnings(&self) -> Result<Vec<WarningItem>>;
}

/// Turn an operational failure into an empty batch.
fn recover<T>(exchange: &str, kind: &str, result: Result<Vec<T>>) -> Result<Vec<T>> {
    match result {
        Err(e) if e.is_operational() => {
            log::warn!("exchange={exchange} failed to fetch {kind}: {e}");
            Ok(Vec::new())
        }
        other => other,
    }
}

/// Build the enabled notice sources, in registration order.
///
/// Invalid crawler selectors or patterns fail here.
pub fn notice_sources(
    config: &Config,
    client: reqwest::Client,
    renderer: Arc<dyn PageRenderer>,
) -> Result<Vec<Box<dyn NoticeSource>>> {
    let exchanges = &config.exchanges;
    let mut sources: Vec<Box<dyn NoticeSource>> = Vec::new();

    if exchanges.bithumb.enabled {
        sources.push(Box::new(BithumbNoticeSource::new(
            client.clone(),
            &exchanges.bithumb,
        )));
    }
    if exchanges.gopax.enabled {
        sources.push(Box::new(GopaxNoticeSource::new(client.clone(), &exchanges.gopax)));
    }
    for profile in exchanges.crawlers.iter().filter(|p| p.enabled) {
        sources.push(Box::new(CrawlerNoticeSource::new(
            profile.clone(),
            Arc::clone(&renderer),
        )?));
    }

    Ok(sources)
}

/// Build the enabled warning sources.
pub fn warning_sources(config: &Config, client: reqwest::Client) -> Vec<Box<dyn WarningSource>> {
    let bithumb = &config.exchanges.bithumb;
    let mut sources: Vec<Box<dyn WarningSource>> = Vec::new();
    if bithumb.enabled && bithumb.warnings_enabled {
        sources.push(Box::new(BithumbWarningSource::new(client, bithumb)));
    }
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::utils::http::create_async_client;
    use crate::utils::render::HttpRenderer;

    fn client() -> reqwest::Client {
        create_async_client(&Config::default().crawler).unwrap()
    }

    #[test]
    fn test_default_roster() {
        let config = Config::default();
        let renderer: Arc<dyn PageRenderer> = Arc::new(HttpRenderer::new(client()));

        let notices = notice_sources(&config, client(), renderer).unwrap();
        let names: Vec<&str> = notices.iter().map(|s| s.exchange()).collect();
        assert_eq!(names, vec!["bithumb", "gopax", "upbit", "korbit", "coinone"]);

        let warnings = warning_sources(&config, client());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].exchange(), "bithumb");
    }

    #[test]
    fn test_disabled_sources_are_skipped() {
        let mut config = Config::default();
        config.exchanges.gopax.enabled = false;
        config.exchanges.bithumb.warnings_enabled = false;
        config.exchanges.crawlers[0].enabled = false;
        let renderer: Arc<dyn PageRenderer> = Arc::new(HttpRenderer::new(client()));

        let notices = notice_sources(&config, client(), renderer).unwrap();
        let names: Vec<&str> = notices.iter().map(|s| s.exchange()).collect();
        assert_eq!(names, vec!["bithumb", "korbit", "coinone"]);
        assert!(warning_sources(&config, client()).is_empty());
    }

    #[test]
    fn test_invalid_selector_is_fatal() {
        let mut config = Config::default();
        config.exchanges.crawlers[0].primary_selectors = vec!["a[[".to_string()];
        let renderer: Arc<dyn PageRenderer> = Arc::new(HttpRenderer::new(client()));

        let err = notice_sources(&config, client(), renderer).err().unwrap();
        assert!(matches!(err, AppError::Selector { .. }));
    }

    #[test]
    fn test_recover_swallows_only_operational_errors() {
        let swallowed: Result<Vec<u8>> = recover("x", "notices", Err(AppError::Timeout("t".into())));
        assert!(swallowed.unwrap().is_empty());

        let kept: Result<Vec<u8>> = recover("x", "notices", Err(AppError::config("bad")));
        assert!(kept.is_err());
    }
}
