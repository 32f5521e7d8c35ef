use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use crate::domain::{FailureKind, FailureRecord};
use crate::scraper::{ScrapeError, Scraper};
use crate::store::{append_record, Collections, DocumentStore, ErrorLog};

/// Outcome counts for one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub timeouts: usize,
    pub extraction_failures: usize,
    pub store_failures: usize,
    pub unknown_failures: usize,
    /// Set when the store was unreachable at batch start and nothing ran
    #[serde(default)]
    pub aborted: bool,
}

impl BatchReport {
    fn record_failure(&mut self, kind: FailureKind) {
        self.failed += 1;
        match kind {
            FailureKind::Timeout => self.timeouts += 1,
            FailureKind::ExtractionFailure => self.extraction_failures += 1,
            FailureKind::StoreFailure => self.store_failures += 1,
            FailureKind::Unknown => self.unknown_failures += 1,
        }
    }
}

/// Scrapes URLs strictly in order and persists each outcome.
pub struct BatchClassifier {
    scraper: Arc<dyn Scraper>,
    store: Arc<dyn DocumentStore>,
    error_log: ErrorLog,
    collections: Collections,
    scraped_by: String,
}

impl BatchClassifier {
    pub fn new(
        scraper: Arc<dyn Scraper>,
        store: Arc<dyn DocumentStore>,
        collections: Collections,
        scraped_by: impl Into<String>,
    ) -> Self {
        let error_log = ErrorLog::new(store.clone(), collections.errors.clone());
        Self {
            scraper,
            store,
            error_log,
            collections,
            scraped_by: scraped_by.into(),
        }
    }

    /// Process every URL in order. Per-URL failures never stop the batch; an
    /// unreachable store at the start aborts it before any URL is scraped.
    pub async fn run(&self, urls: &[String]) -> BatchReport {
        let mut report = BatchReport {
            total: urls.len(),
            ..Default::default()
        };

        if let Err(e) = self.store.ping() {
            error!("Document store unavailable, aborting batch of {} URLs: {}", urls.len(), e);
            let mut details = Map::new();
            details.insert("error".into(), Value::String(e.to_string()));
            details.insert("urls".into(), json!(urls.len()));
            self.error_log
                .record("Scraping batch aborted: document store unavailable.", Some(details));
            report.aborted = true;
            return report;
        }

        info!("Starting scraping process for {} URLs", urls.len());

        for url in urls {
            match self.process(url).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    report.record_failure(e.kind());
                    self.record_failure(url, &e);
                }
            }
        }

        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "Scraping batch finished"
        );
        report
    }

    async fn process(&self, url: &str) -> Result<(), ScrapeError> {
        // Run in its own task so a panic is contained to this URL
        let scraper = self.scraper.clone();
        let target = url.to_string();
        let outcome = tokio::spawn(async move { scraper.scrape(&target).await })
            .await
            .map_err(|e| ScrapeError::Unknown(format!("Scrape task failed: {}", e)))?;

        let mut record = outcome?;
        record.stamp(&self.scraped_by);

        append_record(self.store.as_ref(), &self.collections.articles, &record)
            .map_err(|e| ScrapeError::Store(e.to_string()))?;

        info!(%url, collection = %self.collections.articles, "Article saved");
        Ok(())
    }

    fn record_failure(&self, url: &str, err: &ScrapeError) {
        match err {
            ScrapeError::Timeout { .. } => warn!(%url, "Timeout while scraping: {}", err),
            ScrapeError::Extraction(_) => warn!(%url, "Extraction failed: {}", err),
            ScrapeError::Store(_) => error!(%url, "Could not store article: {}", err),
            ScrapeError::Unknown(_) => error!(%url, "Unexpected scraping failure: {}", err),
        }

        let failure = FailureRecord::new(url, err.to_string(), err.kind(), &self.scraped_by);
        match append_record(self.store.as_ref(), &self.collections.failures, &failure) {
            Ok(_) => info!(%url, collection = %self.collections.failures, "Failed URL recorded"),
            Err(e) => error!(%url, "Failed to record failed URL: {}", e),
        }

        let mut details = Map::new();
        details.insert("error".into(), Value::String(err.to_string()));
        details.insert("kind".into(), json!(err.kind()));
        details.insert("url".into(), Value::String(url.to_string()));
        self.error_log
            .record(&format!("Scraping failed for URL: {}", url), Some(details));
    }
}
