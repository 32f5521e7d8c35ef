//! Fetch-and-extract: render a URL in a headless browser and turn the
//! resulting HTML into an [`ArticleRecord`].
//!
//! # Architecture
//!
//! ```text
//! URL → Renderer (Chrome) → HTML → bot check → ArticleExtractor → ArticleRecord
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use coletor::scraper::{ArticleScraper, ChromeRenderer, Scraper, ScraperConfig};
//!
//! let config = ScraperConfig::default();
//! let scraper = ArticleScraper::new(ChromeRenderer::new(config.clone()), config);
//!
//! let article = scraper.scrape("https://example.com/article").await?;
//! ```

mod chrome;
mod config;
mod extractor;

pub use chrome::ChromeRenderer;
pub use config::ScraperConfig;
pub use extractor::ArticleExtractor;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{ArticleRecord, FailureKind};

/// Why a single URL could not be scraped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScrapeError {
    #[error("Timeout loading URL: {url}")]
    Timeout { url: String },

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Store failure: {0}")]
    Store(String),

    #[error("Unexpected failure: {0}")]
    Unknown(String),
}

impl ScrapeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScrapeError::Timeout { .. } => FailureKind::Timeout,
            ScrapeError::Extraction(_) => FailureKind::ExtractionFailure,
            ScrapeError::Store(_) => FailureKind::StoreFailure,
            ScrapeError::Unknown(_) => FailureKind::Unknown,
        }
    }
}

/// Produces fully rendered HTML for a URL
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, ScrapeError>;
}

/// Trait for fetch-and-extract implementations
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Scrape an article from a URL
    async fn scrape(&self, url: &str) -> Result<ArticleRecord, ScrapeError>;
}

/// Renders a page, rejects bot-verification interstitials, extracts the
/// article and validates it.
pub struct ArticleScraper<R: Renderer> {
    renderer: R,
    extractor: ArticleExtractor,
}

impl<R: Renderer> ArticleScraper<R> {
    pub fn new(renderer: R, config: ScraperConfig) -> Self {
        Self {
            renderer,
            extractor: ArticleExtractor::new(config),
        }
    }
}

#[async_trait]
impl<R: Renderer> Scraper for ArticleScraper<R> {
    async fn scrape(&self, url: &str) -> Result<ArticleRecord, ScrapeError> {
        info!(%url, "Starting scrape");

        let html = self.renderer.render(url).await?;

        if html.trim().is_empty() {
            return Err(ScrapeError::Extraction("Page content is empty".to_string()));
        }

        if let Some(marker) = self.extractor.find_bot_marker(&html) {
            warn!(%url, %marker, "Bot verification page detected");
            return Err(ScrapeError::Extraction(format!(
                "Bot verification page detected (marker '{}')",
                marker
            )));
        }

        let record = self.extractor.extract(url, &html)?;

        if !record.is_valid() {
            return Err(ScrapeError::Extraction(
                "Scraping produced an empty title or text".to_string(),
            ));
        }

        info!(%url, "Scrape succeeded");
        Ok(record)
    }
}
