// src/utils/render.rs

//! Page rendering for crawler-backed sources.
//!
//! Exchange notice lists are client-rendered, so crawler sources ask a
//! [`PageRenderer`] for the final DOM. The Chromium renderer (feature
//! `browser`, and the default engine when built with it) drives a headless
//! browser per call. The plain HTTP renderer serves static pages and tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{Config, RendererConfig};
use crate::utils::http::fetch_text;

/// Turns a URL into the HTML of the page after rendering.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String>;
}

/// Fetches the page body without executing scripts.
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        let no_query: [(&str, &str); 0] = [];
        fetch_text(&self.client, url, &no_query).await
    }
}

/// Build the renderer selected by `renderer.engine`.
pub fn create_renderer(config: &Config, client: reqwest::Client) -> Result<Arc<dyn PageRenderer>> {
    match config.renderer.engine.as_str() {
        "http" => Ok(Arc::new(HttpRenderer::new(client))),
        "chromium" => chromium_renderer(&config.renderer, &config.crawler.user_agent),
        other => Err(AppError::config(format!("unknown renderer engine {other:?}"))),
    }
}

#[cfg(feature = "browser")]
fn chromium_renderer(config: &RendererConfig, user_agent: &str) -> Result<Arc<dyn PageRenderer>> {
    Ok(Arc::new(chromium::ChromiumRenderer::new(config, user_agent)))
}

#[cfg(not(feature = "browser"))]
fn chromium_renderer(_config: &RendererConfig, _user_agent: &str) -> Result<Arc<dyn PageRenderer>> {
    Err(AppError::config(
        "renderer.engine = \"chromium\" requires building with the `browser` feature",
    ))
}

/// Wait for network idle on the document committed first on `commits`.
///
/// `commits` yields loader ids of main-frame navigations; `lifecycle` yields
/// `(loader id, event name)` pairs. Returns `false` once `limit` expires.
#[cfg_attr(not(feature = "browser"), allow(dead_code))]
async fn network_idle<C, L>(mut commits: C, mut lifecycle: L, limit: Duration) -> bool
where
    C: Stream<Item = String> + Unpin,
    L: Stream<Item = (String, String)> + Unpin,
{
    let settled = async {
        let Some(loader) = commits.next().await else {
            return false;
        };
        while let Some((event_loader, name)) = lifecycle.next().await {
            if name == "networkIdle" && event_loader == loader {
                return true;
            }
        }
        false
    };
    tokio::time::timeout(limit, settled).await.unwrap_or(false)
}

#[cfg(feature = "browser")]
pub use chromium::ChromiumRenderer;

#[cfg(feature = "browser")]
mod chromium {
    use std::time::Duration;

    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
    use chromiumoxide::cdp::browser_protocol::page::{
        EventFrameNavigated, EventLifecycleEvent, SetLifecycleEventsEnabledParams,
    };
    use futures::{StreamExt, future};
    use tokio::time::timeout;

    use super::{PageRenderer, network_idle};
    use crate::error::{AppError, Result};
    use crate::models::RendererConfig;

    /// Renders pages in a fresh headless Chromium per call.
    pub struct ChromiumRenderer {
        headless: bool,
        user_agent: String,
        navigate_timeout: Duration,
        network_idle_timeout: Duration,
        extra_wait: Duration,
    }

    impl ChromiumRenderer {
        pub fn new(config: &RendererConfig, user_agent: &str) -> Self {
            Self {
                headless: config.headless,
                user_agent: user_agent.to_string(),
                navigate_timeout: config.navigate_timeout(),
                network_idle_timeout: config.network_idle_timeout(),
                extra_wait: config.extra_wait(),
            }
        }

        fn browser_config(&self, url: &str) -> Result<BrowserConfig> {
            let mut builder = BrowserConfig::builder().request_timeout(self.navigate_timeout);
            if !self.headless {
                builder = builder.with_head();
            }
            builder.build().map_err(|e| AppError::render(url, e))
        }

        async fn capture(&self, browser: &Browser, url: &str) -> Result<String> {
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| AppError::render(url, e))?;
            page.set_user_agent(SetUserAgentOverrideParams::new(self.user_agent.clone()))
                .await
                .map_err(|e| AppError::render(url, e))?;
            page.execute(SetLifecycleEventsEnabledParams::new(true))
                .await
                .map_err(|e| AppError::render(url, e))?;

            // Subscribe before navigating so no event of the new document is missed.
            let commits = page
                .event_listener::<EventFrameNavigated>()
                .await
                .map_err(|e| AppError::render(url, e))?
                .filter(|event| future::ready(event.frame.parent_id.is_none()))
                .map(|event| event.frame.loader_id.inner().clone());
            let lifecycle = page
                .event_listener::<EventLifecycleEvent>()
                .await
                .map_err(|e| AppError::render(url, e))?
                .map(|event| (event.loader_id.inner().clone(), event.name.clone()));

            timeout(self.navigate_timeout, page.goto(url))
                .await
                .map_err(|_| AppError::Timeout(format!("navigating to {url}")))?
                .map_err(|e| AppError::render(url, e))?;

            // Long-polling pages never go idle.
            if !network_idle(
                Box::pin(commits),
                Box::pin(lifecycle),
                self.network_idle_timeout,
            )
            .await
            {
                log::debug!("Network idle wait expired for {url}");
            }
            tokio::time::sleep(self.extra_wait).await;

            page.content().await.map_err(|e| AppError::render(url, e))
        }
    }

    #[async_trait]
    impl PageRenderer for ChromiumRenderer {
        async fn render(&self, url: &str) -> Result<String> {
            let (mut browser, mut handler) = Browser::launch(self.browser_config(url)?)
                .await
                .map_err(|e| AppError::render(url, e))?;
            let events = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let result = self.capture(&browser, url).await;

            if let Err(e) = browser.close().await {
                log::debug!("Browser close failed after {url}: {e}");
            }
            if let Err(e) = browser.wait().await {
                log::debug!("Browser exit wait failed after {url}: {e}");
            }
            events.abort();

            result
        }
    }
}
