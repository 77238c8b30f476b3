//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{CrawlerProfile, profile};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP client settings shared by every source
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Page rendering for crawler-backed sources
    #[serde(default)]
    pub renderer: RendererConfig,

    /// Per-exchange source settings
    #[serde(default)]
    pub exchanges: ExchangesConfig,

    /// Periodic trigger settings
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Record storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let (config, error) = Self::load_or_default_with_error(&path);
        if let Some(e) = error {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
        }
        config
    }

    /// Like [`Config::load_or_default`], but hands the load error back so the
    /// caller can report it once logging is up.
    pub fn load_or_default_with_error(path: impl AsRef<Path>) -> (Self, Option<AppError>) {
        match Self::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if !matches!(self.renderer.engine.as_str(), "http" | "chromium") {
            return Err(AppError::validation(format!(
                "renderer.engine must be \"http\" or \"chromium\", got {:?}",
                self.renderer.engine
            )));
        }
        if self.renderer.navigate_timeout_ms == 0 {
            return Err(AppError::validation(
                "renderer.navigate_timeout_ms must be > 0",
            ));
        }
        if self.schedule.notice_interval_secs == 0 || self.schedule.warning_interval_secs == 0 {
            return Err(AppError::validation("schedule intervals must be > 0"));
        }
        if self.exchanges.bithumb.notice_count == 0 {
            return Err(AppError::validation(
                "exchanges.bithumb.notice_count must be > 0",
            ));
        }
        if self.exchanges.gopax.notice_limit == 0 {
            return Err(AppError::validation(
                "exchanges.gopax.notice_limit must be > 0",
            ));
        }
        for (name, base_url) in [
            ("exchanges.bithumb.base_url", &self.exchanges.bithumb.base_url),
            ("exchanges.gopax.base_url", &self.exchanges.gopax.base_url),
        ] {
            validate_http_url(name, base_url)?;
        }

        let mut seen = HashSet::new();
        for profile in &self.exchanges.crawlers {
            if profile.exchange.trim().is_empty() {
                return Err(AppError::validation("crawler profile without exchange"));
            }
            if !seen.insert(profile.exchange.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate crawler profile for {}",
                    profile.exchange
                )));
            }
            if profile.limit == 0 {
                return Err(AppError::validation(format!(
                    "{}: limit must be > 0",
                    profile.exchange
                )));
            }
            if profile.primary_selectors.is_empty() {
                return Err(AppError::validation(format!(
                    "{}: primary_selectors is empty",
                    profile.exchange
                )));
            }
        }
        Ok(())
    }
}

fn validate_http_url(name: &str, value: &str) -> Result<()> {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        Ok(_) => Err(AppError::validation(format!(
            "{name} must be an http(s) URL, got {value:?}"
        ))),
        Err(e) => Err(AppError::validation(format!("{name} {value:?}: {e}"))),
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests and browser pages
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Page rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// "http" fetches static HTML; "chromium" renders with a headless browser
    /// and is the default when built with the `browser` feature
    #[serde(default = "defaults::engine")]
    pub engine: String,

    /// Run the browser without a window
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// Deadline for navigation up to DOM content loaded
    #[serde(default = "defaults::navigate_timeout")]
    pub navigate_timeout_ms: u64,

    /// Best-effort wait for network idle; expiry is tolerated
    #[serde(default = "defaults::network_idle_timeout")]
    pub network_idle_timeout_ms: u64,

    /// Fixed settle delay before capturing the DOM
    #[serde(default = "defaults::extra_wait")]
    pub extra_wait_ms: u64,
}

impl RendererConfig {
    pub fn navigate_timeout(&self) -> Duration {
        Duration::from_millis(self.navigate_timeout_ms)
    }

    pub fn network_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.network_idle_timeout_ms)
    }

    pub fn extra_wait(&self) -> Duration {
        Duration::from_millis(self.extra_wait_ms)
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            engine: defaults::engine(),
            headless: defaults::headless(),
            navigate_timeout_ms: defaults::navigate_timeout(),
            network_idle_timeout_ms: defaults::network_idle_timeout(),
            extra_wait_ms: defaults::extra_wait(),
        }
    }
}

/// Source settings for every exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangesConfig {
    #[serde(default)]
    pub bithumb: BithumbConfig,

    #[serde(default)]
    pub gopax: GopaxConfig,

    /// Crawler-backed exchanges
    #[serde(default = "profile::default_profiles")]
    pub crawlers: Vec<CrawlerProfile>,
}

impl Default for ExchangesConfig {
    fn default() -> Self {
        Self {
            bithumb: BithumbConfig::default(),
            gopax: GopaxConfig::default(),
            crawlers: profile::default_profiles(),
        }
    }
}

/// Bithumb public API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BithumbConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::bithumb_base_url")]
    pub base_url: String,

    /// Notices per poll (the API caps this at 20)
    #[serde(default = "defaults::page_size")]
    pub notice_count: usize,

    /// Link used when a notice carries no detail URL
    #[serde(default = "defaults::bithumb_notice_url_fallback")]
    pub notice_url_fallback: String,

    /// Also poll market warnings
    #[serde(default = "defaults::enabled")]
    pub warnings_enabled: bool,
}

impl Default for BithumbConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            base_url: defaults::bithumb_base_url(),
            notice_count: defaults::page_size(),
            notice_url_fallback: defaults::bithumb_notice_url_fallback(),
            warnings_enabled: defaults::enabled(),
        }
    }
}

/// GOPAX public API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GopaxConfig {
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::gopax_base_url")]
    pub base_url: String,

    /// Notices per poll (the API caps this at 20)
    #[serde(default = "defaults::page_size")]
    pub notice_limit: usize,

    #[serde(default)]
    pub notice_page: i64,

    #[serde(default = "defaults::gopax_format")]
    pub notice_format: u32,

    /// Detail link template, `{id}` is replaced by the notice id
    #[serde(default = "defaults::gopax_notice_url_template")]
    pub notice_url_template: String,
}

impl Default for GopaxConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            base_url: defaults::gopax_base_url(),
            notice_limit: defaults::page_size(),
            notice_page: 0,
            notice_format: defaults::gopax_format(),
            notice_url_template: defaults::gopax_notice_url_template(),
        }
    }
}

/// Periodic trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "defaults::interval")]
    pub notice_interval_secs: u64,

    /// Delay before the first notice run
    #[serde(default)]
    pub notice_offset_secs: u64,

    #[serde(default = "defaults::interval")]
    pub warning_interval_secs: u64,

    /// Delay before the first warning run, keeps the two runs apart
    #[serde(default = "defaults::warning_offset")]
    pub warning_offset_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            notice_interval_secs: defaults::interval(),
            notice_offset_secs: 0,
            warning_interval_secs: defaults::interval(),
            warning_offset_secs: defaults::warning_offset(),
        }
    }
}

/// Record storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `notices.json` and `warnings.json`
    #[serde(default = "defaults::storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: defaults::storage_dir(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when RUST_LOG is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        20
    }

    // Renderer defaults
    pub fn engine() -> String {
        if cfg!(feature = "browser") {
            "chromium".into()
        } else {
            "http".into()
        }
    }
    pub fn headless() -> bool {
        true
    }
    pub fn navigate_timeout() -> u64 {
        20_000
    }
    pub fn network_idle_timeout() -> u64 {
        8_000
    }
    pub fn extra_wait() -> u64 {
        1_200
    }

    // Exchange defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn page_size() -> usize {
        20
    }
    pub fn bithumb_base_url() -> String {
        "https://api.bithumb.com".into()
    }
    pub fn bithumb_notice_url_fallback() -> String {
        "https://www.bithumb.com/customer_support/info_notice".into()
    }
    pub fn gopax_base_url() -> String {
        "https://api.gopax.co.kr".into()
    }
    pub fn gopax_format() -> u32 {
        1
    }
    pub fn gopax_notice_url_template() -> String {
        "https://www.gopax.co.kr/notice/detail?id={id}".into()
    }

    // Schedule defaults
    pub fn interval() -> u64 {
        300
    }
    pub fn warning_offset() -> u64 {
        30
    }

    // Storage & logging defaults
    pub fn storage_dir() -> PathBuf {
        PathBuf::from("storage")
    }
    pub fn log_level() -> String {
        "info".into()
    }
}
