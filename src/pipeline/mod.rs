//! Pipeline entry points.
//!
//! - `build_orchestrator`: Wire sources and services from configuration
//! - `Orchestrator`: One notice or warning run across every exchange
//! - `Scheduler`: Periodic runs until shutdown

pub mod orchestrator;
pub mod scheduler;

use std::sync::Arc;

use crate::error::Result;
use crate::models::Config;
use crate::services::{NoticeIngestionService, WarningIngestionService};
use crate::sources::{notice_sources, warning_sources};
use crate::storage::{NoticeStore, WarningStore};
use crate::utils::http::create_async_client;
use crate::utils::render::create_renderer;

pub use orchestrator::Orchestrator;
pub use scheduler::Scheduler;

/// Build the orchestrator for a configuration.
///
/// Fails on configuration that cannot work at all (unknown renderer, invalid
/// selectors or patterns), so such mistakes surface at startup.
pub fn build_orchestrator(
    config: &Config,
    notice_store: Arc<dyn NoticeStore>,
    warning_store: Arc<dyn WarningStore>,
) -> Result<Orchestrator> {
    let client = create_async_client(&config.crawler)?;
    let renderer = create_renderer(config, client.clone())?;

    let orchestrator = Orchestrator::new(
        notice_sources(config, client.clone(), renderer)?,
        warning_sources(config, client),
        NoticeIngestionService::new(notice_store),
        WarningIngestionService::new(warning_store),
    );
    log::info!(
        "Registered notice sources: {}; warning sources: {}",
        orchestrator.notice_exchanges().join(", "),
        orchestrator.warning_exchanges().join(", ")
    );
    Ok(orchestrator)
}
