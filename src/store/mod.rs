pub mod error_log;
pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::Result;

pub use error_log::ErrorLog;
pub use sqlite::SqliteStore;

pub const ARTICLES_COLLECTION: &str = "scraped_articles";
pub const FAILURES_COLLECTION: &str = "urls_com_falha";
pub const ERRORS_COLLECTION: &str = "erros_de_execucao";

/// A stored JSON document.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub collection: String,
    pub body: Value,
    pub created_at: DateTime<Utc>,
}

/// Append-only document storage grouped into named collections.
pub trait DocumentStore: Send + Sync {
    /// Check the store is reachable
    fn ping(&self) -> Result<()>;

    /// Append a document and return its generated id
    fn append(&self, collection: &str, body: &Value) -> Result<String>;

    /// Oldest-first listing of at most `limit` documents
    fn list(&self, collection: &str, limit: usize) -> Result<Vec<Document>>;

    fn count(&self, collection: &str) -> Result<usize>;
}

/// Serialize `record` and append it to `collection`.
pub fn append_record<T: Serialize>(
    store: &dyn DocumentStore,
    collection: &str,
    record: &T,
) -> Result<String> {
    let body = serde_json::to_value(record)?;
    store.append(collection, &body)
}

/// Collection names used by the scraper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collections {
    /// Successfully extracted articles
    pub articles: String,
    /// Failed URLs; also where retry batches are read from
    pub failures: String,
    /// Execution error log
    pub errors: String,
}

impl Default for Collections {
    fn default() -> Self {
        Self {
            articles: ARTICLES_COLLECTION.to_string(),
            failures: FAILURES_COLLECTION.to_string(),
            errors: ERRORS_COLLECTION.to_string(),
        }
    }
}
