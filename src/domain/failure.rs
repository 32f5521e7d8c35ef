use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a URL could not be turned into an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    ExtractionFailure,
    StoreFailure,
    Unknown,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Timeout => "timeout",
            FailureKind::ExtractionFailure => "extraction_failure",
            FailureKind::StoreFailure => "store_failure",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL that failed to scrape. These documents double as the work queue
/// for the next retry batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub url: String,
    pub reason: String,
    /// Older documents may predate the kind tag
    #[serde(default)]
    pub kind: Option<FailureKind>,
    pub scraped_by: String,
    pub failed_at: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new(url: &str, reason: impl Into<String>, kind: FailureKind, scraped_by: &str) -> Self {
        Self {
            url: url.to_string(),
            reason: reason.into(),
            kind: Some(kind),
            scraped_by: scraped_by.to_string(),
            failed_at: Utc::now(),
        }
    }

    /// A URL queued by hand, with no failure behind it yet.
    pub fn queued(url: &str, scraped_by: &str) -> Self {
        Self {
            url: url.to_string(),
            reason: "Queued for scraping".to_string(),
            kind: None,
            scraped_by: scraped_by.to_string(),
            failed_at: Utc::now(),
        }
    }
}
