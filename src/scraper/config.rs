use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for rendering and article extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Time allowed for navigation to reach DOM-ready, in seconds (default: 60)
    pub navigation_timeout_secs: u64,

    /// Best-effort wait for the content-ready selector, in seconds (default: 30)
    pub content_wait_secs: u64,

    /// Selector whose presence marks the page content as ready
    pub ready_selector: String,

    /// Tag stored with every record to name the scraping engine
    pub scraped_by: String,

    /// Minimum text length for a content selector match to be used (default: 200)
    pub min_content_length: usize,

    /// CSS selectors to try for article content extraction, in priority order
    pub content_selectors: Vec<String>,

    /// CSS selectors for elements to ignore (ads, navigation, etc.)
    pub remove_selectors: Vec<String>,

    /// Case-insensitive markers of bot-verification interstitials, matched
    /// against the page title, element ids and classes, iframe sources and
    /// form actions
    pub bot_markers: Vec<String>,

    /// User agent string to use
    pub user_agent: Option<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            navigation_timeout_secs: 60,
            content_wait_secs: 30,
            ready_selector: "body".to_string(),
            scraped_by: "chromiumoxide".to_string(),
            min_content_length: 200,
            content_selectors: vec![
                // Common article content selectors in priority order
                "article".to_string(),
                "[itemprop=\"articleBody\"]".to_string(),
                "[role=\"main\"]".to_string(),
                "main".to_string(),
                ".post-content".to_string(),
                ".article-content".to_string(),
                ".article-body".to_string(),
                ".entry-content".to_string(),
                ".content".to_string(),
                "#content".to_string(),
                ".post".to_string(),
                ".article".to_string(),
            ],
            remove_selectors: vec![
                "nav".to_string(),
                "header".to_string(),
                "footer".to_string(),
                "aside".to_string(),
                "figure".to_string(),
                ".sidebar".to_string(),
                ".advertisement".to_string(),
                ".ad".to_string(),
                ".ads".to_string(),
                ".social-share".to_string(),
                ".comments".to_string(),
                ".related-posts".to_string(),
                "script".to_string(),
                "style".to_string(),
                "noscript".to_string(),
            ],
            bot_markers: vec![
                "just a moment...".to_string(),
                "attention required! | cloudflare".to_string(),
                "cf-browser-verification".to_string(),
                "challenge-form".to_string(),
                "challenge-running".to_string(),
                "__cf_chl_f_tk".to_string(),
                "captcha-delivery.com".to_string(),
                "px-captcha".to_string(),
            ],
            user_agent: Some(
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                    .to_string(),
            ),
        }
    }
}

impl ScraperConfig {
    /// Get the navigation timeout as a Duration
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    /// Get the content-ready wait as a Duration
    pub fn content_wait(&self) -> Duration {
        Duration::from_secs(self.content_wait_secs)
    }

    /// Return the first bot-verification marker found in `signals`.
    pub fn match_bot_marker(&self, signals: &str) -> Option<&str> {
        let haystack = signals.to_lowercase();
        self.bot_markers
            .iter()
            .find(|marker| !marker.is_empty() && haystack.contains(&marker.to_lowercase()))
            .map(String::as_str)
    }
}
