//! # Coletor
//!
//! Scrapes articles with a headless browser and keeps retrying the URLs that
//! failed.
//!
//! ## Architecture
//!
//! ```text
//! POST /scrape/start-jobs → failed URLs (≤100) → BatchDispatcher
//!     → BatchClassifier → Scraper → scraped_articles | urls_com_falha + erros_de_execucao
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Queue a URL for the next batch
//! coletor enqueue https://example.com/article
//!
//! # Start the API and trigger a batch
//! coletor serve
//! curl -X POST http://localhost:8000/scrape/start-jobs
//!
//! # Scrape one URL and print the article
//! coletor scrape https://example.com/article
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// the scraper and the batch classifier.
pub mod app;

/// HTTP API built with axum.
pub mod api;

/// Retry batches: enumeration, sequential classification and the
/// background dispatcher.
pub mod batch;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/coletor/config.toml`.
pub mod config;

/// Stored records: [`ArticleRecord`](domain::ArticleRecord),
/// [`FailureRecord`](domain::FailureRecord) and
/// [`ErrorLogEntry`](domain::ErrorLogEntry).
pub mod domain;

/// Headless Chrome rendering and article extraction.
///
/// - [`ChromeRenderer`](scraper::ChromeRenderer): one browser per URL
/// - [`ArticleExtractor`](scraper::ArticleExtractor): DOM heuristics
/// - [`Scraper`](scraper::Scraper): async trait for fetch-and-extract
pub mod scraper;

/// SQLite-backed document store.
///
/// - [`DocumentStore`](store::DocumentStore): trait over named collections
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
/// - [`ErrorLog`](store::ErrorLog): best-effort error log writer
pub mod store;
