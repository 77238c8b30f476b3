// src/pipeline/scheduler.rs

//! Periodic trigger for notice and warning runs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

use crate::models::{IngestionReport, ScheduleConfig};
use crate::pipeline::Orchestrator;

/// Drives an [`Orchestrator`] on two independent fixed-rate timers.
///
/// Runs never overlap: a tick that falls due while another run is in progress
/// is delivered afterwards, and ticks missed entirely are skipped.
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    schedule: ScheduleConfig,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, schedule: ScheduleConfig) -> Self {
        Self {
            orchestrator,
            schedule,
        }
    }

    /// Run until `shutdown` resolves.
    pub async fn run_until<S>(&self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let mut notice_tick = ticker(
            self.schedule.notice_offset_secs,
            self.schedule.notice_interval_secs,
        );
        let mut warning_tick = ticker(
            self.schedule.warning_offset_secs,
            self.schedule.warning_interval_secs,
        );
        log::info!(
            "Scheduler started: notices every {}s (offset {}s), warnings every {}s (offset {}s)",
            self.schedule.notice_interval_secs,
            self.schedule.notice_offset_secs,
            self.schedule.warning_interval_secs,
            self.schedule.warning_offset_secs
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    log::info!("Scheduler stopping");
                    break;
                }
                _ = notice_tick.tick() => {
                    let report = self.orchestrator.run_notices().await;
                    log_report("notices", &report);
                }
                _ = warning_tick.tick() => {
                    let report = self.orchestrator.run_warnings().await;
                    log_report("warnings", &report);
                }
            }
        }
    }
}

fn ticker(offset_secs: u64, period_secs: u64) -> Interval {
    let start = Instant::now() + Duration::from_secs(offset_secs);
    let mut interval = interval_at(start, Duration::from_secs(period_secs.max(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn log_report(kind: &str, report: &IngestionReport) {
    for (exchange, result) in report {
        log::debug!(
            "exchange={exchange} {kind}: fetched={} inserted={} updated={}",
            result.fetched_count,
            result.inserted_count,
            result.updated_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::Result;
    use crate::models::{NoticeItem, WarningItem};
    use crate::services::{NoticeIngestionService, WarningIngestionService};
    use crate::sources::{NoticeSource, WarningSource};
    use crate::storage::MemoryStore;

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl NoticeSource for Counting {
        fn exchange(&self) -> &str {
            "counting"
        }

        async fn fetch_latest_notices(&self) -> Result<Vec<NoticeItem>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl WarningSource for Counting {
        fn exchange(&self) -> &str {
            "counting"
        }

        async fn fetch_latest_warnings(&self) -> Result<Vec<WarningItem>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_on_both_timers() {
        let notice_runs = Arc::new(AtomicUsize::new(0));
        let warning_runs = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryStore::new());
        let notice_sources: Vec<Box<dyn NoticeSource>> = vec![Box::new(Counting(notice_runs.clone()))];
        let warning_sources: Vec<Box<dyn WarningSource>> = vec![Box::new(Counting(warning_runs.clone()))];
        let orchestrator = Orchestrator::new(
            notice_sources,
            warning_sources,
            NoticeIngestionService::new(store.clone()),
            WarningIngestionService::new(store),
        );
        let scheduler = Scheduler::new(Arc::new(orchestrator), ScheduleConfig::default());

        // Notices at 0, 300, 600; warnings at 30, 330, 630.
        scheduler
            .run_until(tokio::time::sleep(Duration::from_secs(650)))
            .await;

        assert_eq!(notice_runs.load(Ordering::SeqCst), 3);
        assert_eq!(warning_runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_immediately_on_shutdown() {
        let runs = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryStore::new());
        let notice_sources: Vec<Box<dyn NoticeSource>> = vec![Box::new(Counting(runs.clone()))];
        let orchestrator = Orchestrator::new(
            notice_sources,
            vec![],
            NoticeIngestionService::new(store.clone()),
            WarningIngestionService::new(store),
        );
        let schedule = ScheduleConfig {
            notice_offset_secs: 10,
            ..ScheduleConfig::default()
        };
        let scheduler = Scheduler::new(Arc::new(orchestrator), schedule);

        scheduler.run_until(std::future::ready(())).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
