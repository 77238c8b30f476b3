// src/pipeline/orchestrator.rs

//! Runs every registered source through its ingestion service.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::error::Result;
use crate::models::{IngestionReport, IngestionResult};
use crate::services::{NoticeIngestionService, WarningIngestionService};
use crate::sources::{NoticeSource, WarningSource};

/// Source roster plus the services that persist their batches.
///
/// Sources run one after another. A failing or panicking source is logged and
/// left out of the report; the rest still run.
pub struct Orchestrator {
    notice_sources: Vec<Box<dyn NoticeSource>>,
    warning_sources: Vec<Box<dyn WarningSource>>,
    notices: NoticeIngestionService,
    warnings: WarningIngestionService,
}

impl Orchestrator {
    pub fn new(
        notice_sources: Vec<Box<dyn NoticeSource>>,
        warning_sources: Vec<Box<dyn WarningSource>>,
        notices: NoticeIngestionService,
        warnings: WarningIngestionService,
    ) -> Self {
        Self {
            notice_sources,
            warning_sources,
            notices,
            warnings,
        }
    }

    /// Exchanges with a notice source, in run order.
    pub fn notice_exchanges(&self) -> Vec<&str> {
        self.notice_sources.iter().map(|s| s.exchange()).collect()
    }

    /// Exchanges with a warning source, in run order.
    pub fn warning_exchanges(&self) -> Vec<&str> {
        self.warning_sources.iter().map(|s| s.exchange()).collect()
    }

    /// Fetch and ingest notices from every source.
    pub async fn run_notices(&self) -> IngestionReport {
        let mut report = IngestionReport::new();
        for source in &self.notice_sources {
            let exchange = source.exchange();
            let cycle = async {
                let items = source.fetch_latest_notices().await?;
                self.notices.ingest(exchange, items).await
            };
            if let Some(result) = guarded("notices", exchange, cycle).await {
                report.insert(exchange.to_string(), result);
            }
        }
        log::info!(
            "Notice run complete: {}/{} exchanges succeeded",
            report.len(),
            self.notice_sources.len()
        );
        report
    }

    /// Fetch and ingest warnings from every source.
    pub async fn run_warnings(&self) -> IngestionReport {
        let mut report = IngestionReport::new();
        for source in &self.warning_sources {
            let exchange = source.exchange();
            let cycle = async {
                let items = source.fetch_latest_warnings().await?;
                self.warnings.ingest(exchange, items).await
            };
            if let Some(result) = guarded("warnings", exchange, cycle).await {
                report.insert(exchange.to_string(), result);
            }
        }
        log::info!(
            "Warning run complete: {}/{} exchanges succeeded",
            report.len(),
            self.warning_sources.len()
        );
        report
    }
}

/// Await one source cycle, turning errors and panics into `None`.
async fn guarded<F>(kind: &str, exchange: &str, cycle: F) -> Option<IngestionResult>
where
    F: Future<Output = Result<IngestionResult>>,
{
    match AssertUnwindSafe(cycle).catch_unwind().await {
        Ok(Ok(result)) => Some(result),
        Ok(Err(e)) => {
            log::error!("exchange={exchange} {kind} cycle failed: {e}");
            None
        }
        Err(panic) => {
            log::error!(
                "exchange={exchange} {kind} cycle panicked: {}",
                panic_message(panic.as_ref())
            );
            None
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::error::AppError;
    use crate::models::{NoticeItem, NoticeType, WarningItem};
    use crate::services::classify::{classify_categories, normalize_categories, to_categories_json};
    use crate::storage::{MemoryStore, NoticeStore};

    enum Behavior {
        Fail,
        Panic,
        Items(Vec<NoticeItem>),
    }

    struct FakeNotices {
        exchange: &'static str,
        behavior: Behavior,
    }

    #[async_trait]
    impl NoticeSource for FakeNotices {
        fn exchange(&self) -> &str {
            self.exchange
        }

        async fn fetch_latest_notices(&self) -> Result<Vec<NoticeItem>> {
            match &self.behavior {
                Behavior::Fail => Err(AppError::config("source misconfigured")),
                Behavior::Panic => panic!("parser bug"),
                Behavior::Items(items) => Ok(items.clone()),
            }
        }
    }

    struct FakeWarnings(Vec<WarningItem>);

    #[async_trait]
    impl WarningSource for FakeWarnings {
        fn exchange(&self) -> &str {
            "bithumb"
        }

        async fn fetch_latest_warnings(&self) -> Result<Vec<WarningItem>> {
            Ok(self.0.clone())
        }
    }

    fn notice(id: &str, category: &str, content: Option<&str>) -> NoticeItem {
        let categories = normalize_categories([category]);
        NoticeItem {
            external_id: id.to_string(),
            title: format!("{category} {id}"),
            url: format!("https://example.com/{id}"),
            notice_type: classify_categories(&categories),
            categories: to_categories_json(&categories),
            content: content.map(str::to_string),
            ..NoticeItem::default()
        }
    }

    fn orchestrator(
        notice_sources: Vec<Box<dyn NoticeSource>>,
        warning_sources: Vec<Box<dyn WarningSource>>,
        store: Arc<MemoryStore>,
    ) -> Orchestrator {
        Orchestrator::new(
            notice_sources,
            warning_sources,
            NoticeIngestionService::new(store.clone()),
            WarningIngestionService::new(store),
        )
    }

    #[tokio::test]
    async fn test_failing_sources_are_isolated() {
        let store = Arc::new(MemoryStore::new());
        let sources: Vec<Box<dyn NoticeSource>> = vec![
            Box::new(FakeNotices {
                exchange: "alpha",
                behavior: Behavior::Fail,
            }),
            Box::new(FakeNotices {
                exchange: "beta",
                behavior: Behavior::Items(vec![
                    notice("1", "안내", None),
                    notice("2", "이벤트", None),
                    notice("3", "점검", None),
                ]),
            }),
            Box::new(FakeNotices {
                exchange: "gamma",
                behavior: Behavior::Panic,
            }),
        ];
        let orchestrator = orchestrator(sources, vec![], store.clone());

        let report = orchestrator.run_notices().await;

        assert_eq!(report.len(), 1);
        let beta = report.get("beta").unwrap();
        assert_eq!(beta.fetched_count, 3);
        assert_eq!(beta.inserted_count, 3);
        assert!(!report.contains_key("alpha"));
        assert!(!report.contains_key("gamma"));
        assert_eq!(store.notice_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_maintenance_notice_end_to_end() {
        let store = Arc::new(MemoryStore::new());

        let first: Vec<Box<dyn NoticeSource>> = vec![Box::new(FakeNotices {
            exchange: "upbit",
            behavior: Behavior::Items(vec![notice("n-1", "점검", Some("서버 점검 본문"))]),
        })];
        let report = orchestrator(first, vec![], store.clone()).run_notices().await;
        assert_eq!(report["upbit"].inserted_count, 1);

        let second: Vec<Box<dyn NoticeSource>> = vec![Box::new(FakeNotices {
            exchange: "upbit",
            behavior: Behavior::Items(vec![notice("n-1", "점검", None)]),
        })];
        let report = orchestrator(second, vec![], store.clone()).run_notices().await;
        assert_eq!(report["upbit"].updated_count, 1);
        assert_eq!(report["upbit"].inserted_count, 0);

        let record = store.find_notice("upbit", "n-1").await.unwrap().unwrap();
        assert_eq!(record.notice_type, NoticeType::Maintenance);
        assert_eq!(record.content.as_deref(), Some("서버 점검 본문"));
        assert!(record.last_seen_at >= record.first_seen_at);
    }

    #[tokio::test]
    async fn test_warning_run() {
        let store = Arc::new(MemoryStore::new());
        let warnings: Vec<Box<dyn WarningSource>> = vec![Box::new(FakeWarnings(vec![WarningItem {
            market: "KRW-BTC".to_string(),
            warning_type: "PRICE_SUDDEN_FLUCTUATION".to_string(),
            warning_step: "CAUTION".to_string(),
            end_at: None,
        }]))];
        let orchestrator = orchestrator(vec![], warnings, store.clone());

        let report = orchestrator.run_warnings().await;

        assert_eq!(report["bithumb"].inserted_count, 1);
        assert!(orchestrator.run_notices().await.is_empty());
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
