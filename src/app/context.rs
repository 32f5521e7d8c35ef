use std::sync::Arc;

use crate::app::error::{ColetorError, Result};
use crate::batch::BatchClassifier;
use crate::config::Config;
use crate::scraper::{ArticleScraper, ChromeRenderer, Scraper};
use crate::store::{DocumentStore, ErrorLog, SqliteStore};

/// Process-wide components, built once at startup and shared by reference.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub scraper: Arc<dyn Scraper>,
    pub classifier: Arc<BatchClassifier>,
    pub error_log: ErrorLog,
}

impl AppContext {
    /// Open the configured store and wire the Chrome-backed scraper.
    pub fn new(config: Config) -> Result<Self> {
        let db_path = config
            .db_path()
            .map_err(|e| ColetorError::Config(e.to_string()))?;
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteStore::new(&db_path)?);

        let renderer = ChromeRenderer::new(config.scraper.clone());
        let scraper: Arc<dyn Scraper> =
            Arc::new(ArticleScraper::new(renderer, config.scraper.clone()));

        Ok(Self::with_parts(config, store, scraper))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn DocumentStore>,
        scraper: Arc<dyn Scraper>,
    ) -> Self {
        let collections = config.store.collections.clone();
        let error_log = ErrorLog::new(store.clone(), collections.errors.clone());
        let classifier = Arc::new(BatchClassifier::new(
            scraper.clone(),
            store.clone(),
            collections,
            config.scraper.scraped_by.clone(),
        ));

        Self {
            config,
            store,
            scraper,
            classifier,
            error_log,
        }
    }
}
