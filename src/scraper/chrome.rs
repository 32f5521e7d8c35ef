use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::time::error::Elapsed;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

use crate::scraper::config::ScraperConfig;
use crate::scraper::{Renderer, ScrapeError};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Chrome-based renderer using chromiumoxide.
///
/// Every call launches its own browser and closes it afterwards; sessions are
/// never shared between URLs.
pub struct ChromeRenderer {
    config: ScraperConfig,
}

impl ChromeRenderer {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }

    /// Create a new Chrome renderer with default configuration
    pub fn with_defaults() -> Self {
        Self::new(ScraperConfig::default())
    }

    fn browser_config(&self) -> Result<BrowserConfig, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .request_timeout(self.config.navigation_timeout());

        if !self.config.headless {
            builder = builder.with_head();
        }

        builder
            .build()
            .map_err(|e| ScrapeError::Unknown(format!("Failed to build browser config: {}", e)))
    }

    async fn render_in(&self, browser: &Browser, url: &str) -> Result<String, ScrapeError> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Unknown(format!("Failed to create page: {}", e)))?;

        let result = self.load(&page, url).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close page: {}", e);
        }

        result
    }

    async fn load(&self, page: &Page, url: &str) -> Result<String, ScrapeError> {
        if let Some(ref ua) = self.config.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| ScrapeError::Unknown(format!("Failed to set user agent: {}", e)))?;
        }

        let outcome = timeout(self.config.navigation_timeout(), page.goto(url)).await;
        navigation_outcome(url, outcome)?;

        self.wait_for_ready(page, url).await;

        page.content()
            .await
            .map_err(|e| ScrapeError::Unknown(format!("Failed to read page content: {}", e)))
    }

    /// Wait for the content-ready selector. Running out of time is not an error.
    async fn wait_for_ready(&self, page: &Page, url: &str) {
        let selector = self.config.ready_selector.as_str();
        let ready = poll_until(self.config.content_wait(), move || async move {
            page.find_element(selector).await.is_ok()
        })
        .await;

        if !ready {
            info!(
                %url,
                selector = %self.config.ready_selector,
                "Content-ready selector did not appear in time, continuing"
            );
        }
    }
}

/// Map the result of a bounded `goto` onto the scrape error taxonomy.
fn navigation_outcome<T>(
    url: &str,
    outcome: Result<Result<T, CdpError>, Elapsed>,
) -> Result<(), ScrapeError> {
    match outcome {
        Ok(Ok(_)) => Ok(()),
        Err(_) | Ok(Err(CdpError::Timeout)) => {
            warn!(%url, "Timeout while loading page");
            Err(ScrapeError::Timeout {
                url: url.to_string(),
            })
        }
        Ok(Err(e)) => Err(ScrapeError::Unknown(format!("Navigation failed: {}", e))),
    }
}

/// Run `probe` until it returns true or `wait` has passed. The probe always
/// runs at least once.
async fn poll_until<F, Fut>(wait: Duration, mut probe: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + wait;
    loop {
        if probe().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(READY_POLL_INTERVAL).await;
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<String, ScrapeError> {
        let browser_config = self.browser_config()?;

        let (mut browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            ScrapeError::Unknown(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        // Spawn the browser handler
        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {
                // Handle browser events
            }
        });

        let result = self.render_in(&browser, url).await;

        if let Err(e) = browser.close().await {
            debug!("Failed to close browser: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Failed to wait for browser exit: {}", e);
        }
        handler_task.abort();

        result
    }
}
