//! Configuration management for coletor.
//!
//! Configuration is read from `~/.config/coletor/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.
//! `COLETOR_DB_PATH` and `COLETOR_BIND` override the file, so deployments can
//! point the service at its document store without editing it.

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::scraper::ScraperConfig;
use crate::store::Collections;

pub const DB_PATH_ENV: &str = "COLETOR_DB_PATH";
pub const BIND_ENV: &str = "COLETOR_BIND";

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub scraper: ScraperConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP API listens on
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file; defaults to the platform data directory
    pub path: Option<PathBuf>,
    pub collections: Collections,
}

impl Config {
    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// A missing file at the default path is created with commented defaults.
    /// An explicitly given path must exist.
    /// Missing fields in the config file will use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    Self::create_default_config(&default_path)?;
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup(DB_PATH_ENV).filter(|v| !v.is_empty()) {
            self.store.path = Some(PathBuf::from(path));
        }
        if let Some(bind) = lookup(BIND_ENV).filter(|v| !v.is_empty()) {
            self.server.bind = bind;
        }
    }

    /// Get the default config file path: `~/.config/coletor/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("coletor").join("config.toml"))
    }

    /// Database path from config, or `<data_dir>/coletor/coletor.db`.
    pub fn db_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.store.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        let coletor_dir = data_dir.join("coletor");
        fs::create_dir_all(&coletor_dir).map_err(|e| ConfigError::Io {
            path: coletor_dir.clone(),
            source: e,
        })?;
        Ok(coletor_dir.join("coletor.db"))
    }

    /// Create a default config file with comments.
    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> &'static str {
        r##"# coletor configuration

[server]
# Address of the HTTP API (overridden by COLETOR_BIND)
bind = "0.0.0.0:8000"

[store]
# SQLite database file (overridden by COLETOR_DB_PATH).
# Defaults to <data dir>/coletor/coletor.db
# path = "/var/lib/coletor/coletor.db"

[store.collections]
articles = "scraped_articles"
# Failed URLs are written here and retry batches are read from here
failures = "urls_com_falha"
errors = "erros_de_execucao"

[scraper]
# Run browser in headless mode (no visible window)
headless = true

# Seconds allowed for a page to reach DOM-ready
navigation_timeout_secs = 60

# Best-effort wait for the content-ready selector (seconds)
content_wait_secs = 30
ready_selector = "body"

# Tag stored with every article and failure
scraped_by = "chromiumoxide"

# Minimum text length for a content selector match
min_content_length = 200

# CSS selectors to try for article content extraction (in priority order)
content_selectors = [
    "article",
    "[itemprop=\"articleBody\"]",
    "[role=\"main\"]",
    "main",
    ".post-content",
    ".article-content",
    ".article-body",
    ".entry-content",
    ".content",
    "#content",
    ".post",
    ".article",
]

# Elements ignored during extraction (ads, navigation, etc.)
remove_selectors = [
    "nav",
    "header",
    "footer",
    "aside",
    "figure",
    ".sidebar",
    ".advertisement",
    ".ad",
    ".ads",
    ".social-share",
    ".comments",
    ".related-posts",
    "script",
    "style",
    "noscript",
]
"##
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
