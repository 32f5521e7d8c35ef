use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An article extracted from a rendered page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub text: String,
    pub authors: Vec<String>,
    /// ISO-8601 publish date, when the page declares one
    pub publish_date: Option<String>,
    pub top_image: Option<String>,
    /// Embedded video URLs
    pub movies: Vec<String>,
    pub url: String,
    pub domain: String,
    pub scraped_at: DateTime<Utc>,
    pub scraped_by: String,
}

impl ArticleRecord {
    pub fn new(url: &str, domain: &str) -> Self {
        Self {
            title: String::new(),
            text: String::new(),
            authors: Vec::new(),
            publish_date: None,
            top_image: None,
            movies: Vec::new(),
            url: url.to_string(),
            domain: domain.to_string(),
            scraped_at: Utc::now(),
            scraped_by: String::new(),
        }
    }

    /// A record only counts as an article when both title and body carry text.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.text.trim().is_empty()
    }

    /// Attach provenance metadata before the record is persisted.
    pub fn stamp(&mut self, scraped_by: &str) {
        self.scraped_by = scraped_by.to_string();
        self.scraped_at = Utc::now();
    }
}
