//! Exchange ingest CLI
//!
//! Local execution entry point: one-shot runs or the periodic scheduler.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use exchange_ingest::{
    error::Result,
    models::{Config, IngestionReport},
    pipeline::{self, Scheduler},
    storage::{LocalStorage, NoticeStore, WarningStore},
};

/// Exchange notice and market warning ingester
#[derive(Parser, Debug)]
#[command(
    name = "exchange-ingest",
    version,
    about = "Polls cryptocurrency exchanges for notices and market warnings"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Storage directory (overrides `[storage] dir`)
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and store notices from every exchange once
    Notices,

    /// Fetch and store market warnings once
    Warnings,

    /// Run notices, then warnings, once
    Run,

    /// Run both on their schedules until Ctrl-C
    Schedule,

    /// Validate configuration and crawler profiles
    Validate,

    /// Show stored record counts
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool, configured: &str) {
    let level = if verbose { "debug" } else { configured };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_report(kind: &str, report: &IngestionReport) -> Result<()> {
    log::info!("{} run: {} exchanges reported", kind, report.len());
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, load_error) = Config::load_or_default_with_error(&cli.config);
    init_logging(cli.verbose, &config.logging.level);

    match load_error {
        Some(e) => log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        ),
        None => log::info!("Loaded configuration from {}", cli.config.display()),
    }

    if let Some(dir) = cli.storage_dir {
        config.storage.dir = dir;
    }

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    let storage = Arc::new(LocalStorage::open(&config.storage.dir).await?);

    match cli.command {
        Command::Notices => {
            let orchestrator = pipeline::build_orchestrator(&config, storage.clone(), storage)?;
            print_report("Notice", &orchestrator.run_notices().await)?;
        }

        Command::Warnings => {
            let orchestrator = pipeline::build_orchestrator(&config, storage.clone(), storage)?;
            print_report("Warning", &orchestrator.run_warnings().await)?;
        }

        Command::Run => {
            let orchestrator = pipeline::build_orchestrator(&config, storage.clone(), storage)?;
            print_report("Notice", &orchestrator.run_notices().await)?;
            print_report("Warning", &orchestrator.run_warnings().await)?;
        }

        Command::Schedule => {
            let orchestrator = pipeline::build_orchestrator(&config, storage.clone(), storage)?;
            let scheduler = Scheduler::new(Arc::new(orchestrator), config.schedule.clone());
            scheduler
                .run_until(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        log::error!("Failed to listen for Ctrl-C: {}", e);
                    }
                })
                .await;
        }

        Command::Validate => {
            log::info!("Validating crawler profiles...");
            pipeline::build_orchestrator(&config, storage.clone(), storage)?;
            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", config.storage.dir.display());
            log::info!("Stored notices: {}", storage.notice_count().await?);
            log::info!("Stored warnings: {}", storage.warning_count().await?);
        }
    }

    log::info!("Done!");

    Ok(())
}
