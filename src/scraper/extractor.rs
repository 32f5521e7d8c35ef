use chrono::{DateTime, NaiveDate, NaiveDateTime};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::domain::ArticleRecord;
use crate::scraper::{ScrapeError, ScraperConfig};

/// Block-level elements whose text makes up the article body
const BLOCK_SELECTOR: &str = "p, h2, h3, h4, li, blockquote, pre";
const NESTING_BLOCKS: &[&str] = &["p", "li", "blockquote", "pre"];

/// Hosts whose embeds are treated as article videos
const VIDEO_HOSTS: &[&str] = &[
    "youtube.com",
    "youtube-nocookie.com",
    "youtu.be",
    "vimeo.com",
    "dailymotion.com",
    "twitch.tv",
    "facebook.com/plugins/video",
    "jwplayer.com",
    "brightcove",
];

/// Heuristic article extractor for rendered HTML
pub struct ArticleExtractor {
    config: ScraperConfig,
    content_selectors: Vec<Selector>,
    remove_selectors: Vec<Selector>,
}

impl ArticleExtractor {
    pub fn new(config: ScraperConfig) -> Self {
        let content_selectors = parse_selectors(&config.content_selectors);
        let remove_selectors = parse_selectors(&config.remove_selectors);
        Self {
            config,
            content_selectors,
            remove_selectors,
        }
    }

    /// Turn rendered HTML into an article record.
    ///
    /// The record is returned as-is; checking that title and text are present
    /// is left to the caller.
    pub fn extract(&self, url: &str, html: &str) -> Result<ArticleRecord, ScrapeError> {
        let base = Url::parse(url)
            .map_err(|e| ScrapeError::Extraction(format!("Invalid URL {}: {}", url, e)))?;
        let document = Html::parse_document(html);

        let mut record = ArticleRecord::new(url, &domain_of(&base));
        record.title = self.extract_title(&document);
        record.text = self.extract_text(&document);
        record.authors = extract_authors(&document);
        record.publish_date = extract_publish_date(&document);
        record.top_image = extract_top_image(&document, &base);
        record.movies = extract_movies(&document, &base);

        debug!(
            %url,
            title_len = record.title.len(),
            text_len = record.text.len(),
            "Extracted article"
        );
        Ok(record)
    }

    /// Return the configured bot-verification marker this page matches, if any.
    ///
    /// Only the title and challenge-bearing attributes are inspected, so
    /// scripts that merely load a challenge platform do not count.
    pub fn find_bot_marker(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        self.config
            .match_bot_marker(&bot_signals(&document))
            .map(str::to_string)
    }

    fn extract_title(&self, document: &Html) -> String {
        meta_content(document, &["meta[property=\"og:title\"]", "meta[name=\"twitter:title\"]"])
            .or_else(|| first_text(document, "title"))
            .or_else(|| first_text(document, "h1"))
            .unwrap_or_default()
    }

    fn extract_text(&self, document: &Html) -> String {
        for selector in &self.content_selectors {
            for root in document.select(selector) {
                if self.is_removed(root) {
                    continue;
                }
                let text = self.block_text(root);
                if text.chars().count() >= self.config.min_content_length {
                    return text;
                }
            }
        }

        // Fall back to every block in the body
        match Selector::parse("body")
            .ok()
            .and_then(|body| document.select(&body).next())
        {
            Some(body) => self.block_text(body),
            None => String::new(),
        }
    }

    /// Paragraph text under `root`, skipping removed subtrees and nested blocks.
    fn block_text(&self, root: ElementRef) -> String {
        let Ok(blocks) = Selector::parse(BLOCK_SELECTOR) else {
            return String::new();
        };

        let paragraphs: Vec<String> = root
            .select(&blocks)
            .filter(|block| !self.is_removed_within(*block, root))
            .filter(|block| !has_block_ancestor(*block, root))
            .map(|block| self.visible_text(block))
            .filter(|text| !text.is_empty())
            .collect();

        if paragraphs.is_empty() {
            self.visible_text(root)
        } else {
            paragraphs.join("\n\n")
        }
    }

    /// Whitespace-collapsed text under `root`, leaving out removed subtrees
    /// such as scripts and navigation.
    fn visible_text(&self, root: ElementRef) -> String {
        let mut words: Vec<&str> = Vec::new();
        for node in root.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .parent()
                .and_then(ElementRef::wrap)
                .is_some_and(|parent| parent.id() != root.id() && self.is_removed_within(parent, root));
            if !hidden {
                words.extend(text.split_whitespace());
            }
        }
        words.join(" ")
    }

    fn is_removed(&self, element: ElementRef) -> bool {
        self.remove_selectors.iter().any(|s| s.matches(&element))
    }

    fn is_removed_within(&self, element: ElementRef, root: ElementRef) -> bool {
        if self.is_removed(element) {
            return true;
        }
        element
            .ancestors()
            .take_while(|node| node.id() != root.id())
            .filter_map(ElementRef::wrap)
            .any(|ancestor| self.is_removed(ancestor))
    }
}

fn parse_selectors(raw: &[String]) -> Vec<Selector> {
    raw.iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!("Ignoring invalid selector '{}': {:?}", s, e);
                None
            }
        })
        .collect()
}

fn bot_signals(document: &Html) -> String {
    let mut signals: Vec<&str> = Vec::new();
    let title = first_text(document, "title").unwrap_or_default();
    signals.push(&title);

    for el in document.root_element().descendants().filter_map(ElementRef::wrap) {
        let value = el.value();
        let attrs: &[&str] = match value.name() {
            "iframe" => &["id", "class", "src", "title"],
            "form" => &["id", "class", "action"],
            _ => &["id", "class"],
        };
        signals.extend(attrs.iter().filter_map(|attr| value.attr(attr)));
    }

    signals.join("\n")
}

fn has_block_ancestor(element: ElementRef, root: ElementRef) -> bool {
    element
        .ancestors()
        .take_while(|node| node.id() != root.id())
        .filter_map(ElementRef::wrap)
        .any(|ancestor| NESTING_BLOCKS.contains(&ancestor.value().name()))
}

fn collapse_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(collapse_text)
        .find(|text| !text.is_empty())
}

fn meta_content(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(str::to_string)
    })
}

fn domain_of(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors: Vec<String> = Vec::new();
    let mut push = |name: String| {
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        let name = name.trim_start_matches("By ").trim_start_matches("by ").trim().to_string();
        if name.is_empty() || name.starts_with("http") || name.len() > 100 {
            return;
        }
        if !authors.iter().any(|a| a.eq_ignore_ascii_case(&name)) {
            authors.push(name);
        }
    };

    for raw in ["meta[name=\"author\"]", "meta[property=\"article:author\"]"] {
        if let Ok(selector) = Selector::parse(raw) {
            for el in document.select(&selector) {
                if let Some(content) = el.value().attr("content") {
                    push(content.to_string());
                }
            }
        }
    }

    for raw in ["[rel=\"author\"]", "[itemprop=\"author\"]", ".byline .author"] {
        if let Ok(selector) = Selector::parse(raw) {
            for el in document.select(&selector) {
                if el.value().name() == "meta" || el.value().name() == "link" {
                    continue;
                }
                push(collapse_text(el));
            }
        }
    }

    authors
}

fn extract_publish_date(document: &Html) -> Option<String> {
    let meta = [
        "meta[property=\"article:published_time\"]",
        "meta[name=\"pubdate\"]",
        "meta[name=\"publishdate\"]",
        "meta[name=\"date\"]",
        "meta[itemprop=\"datePublished\"]",
    ];
    let from_meta = meta.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .find_map(normalize_date)
    });
    if from_meta.is_some() {
        return from_meta;
    }

    let selector = Selector::parse("[itemprop=\"datePublished\"], time[datetime]").ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("datetime").or_else(|| el.value().attr("content")))
        .find_map(normalize_date)
}

/// Parse a loosely formatted date and re-emit it as ISO-8601.
pub(crate) fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.to_rfc3339());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.to_rfc3339());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string());
        }
    }
    None
}

fn extract_top_image(document: &Html, base: &Url) -> Option<String> {
    let raw = meta_content(
        document,
        &[
            "meta[property=\"og:image\"]",
            "meta[name=\"twitter:image\"]",
            "meta[property=\"twitter:image\"]",
        ],
    )
    .or_else(|| {
        let selector = Selector::parse("link[rel=\"image_src\"]").ok()?;
        document
            .select(&selector)
            .find_map(|el| el.value().attr("href"))
            .map(str::to_string)
    })?;

    base.join(&raw).ok().map(|u| u.to_string())
}

fn extract_movies(document: &Html, base: &Url) -> Vec<String> {
    let mut movies: Vec<String> = Vec::new();

    let candidates = [
        ("iframe[src]", "src", true),
        ("embed[src]", "src", true),
        ("object[data]", "data", true),
        ("video[src]", "src", false),
        ("video source[src]", "src", false),
    ];

    for (raw, attr, needs_known_host) in candidates {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        for el in document.select(&selector) {
            let Some(src) = el.value().attr(attr) else {
                continue;
            };
            let Ok(resolved) = base.join(src.trim()) else {
                continue;
            };
            let resolved = resolved.to_string();
            if needs_known_host && !VIDEO_HOSTS.iter().any(|host| resolved.contains(host)) {
                continue;
            }
            if !movies.contains(&resolved) {
                movies.push(resolved);
            }
        }
    }

    movies
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r#"
        <html>
          <head>
            <title>Fallback title | Example News</title>
            <meta property="og:title" content="Rust ships a new edition">
            <meta name="author" content="Jane Doe">
            <meta property="article:published_time" content="2024-05-01T12:30:00+00:00">
            <meta property="og:image" content="/images/lead.jpg">
          </head>
          <body>
            <nav><p>Home About Contact</p></nav>
            <article>
              <h1>Rust ships a new edition</h1>
              <p>The Rust project announced a new edition today, bringing a set of
                 long-awaited language changes to stable.</p>
              <aside><p>Subscribe to our newsletter!</p></aside>
              <p>Editions let the language evolve without breaking existing code,
                 and every crate can opt in at its own pace.</p>
              <p>By <a rel="author" href="/staff/jane">Jane Doe</a> and
                 <span itemprop="author">John Roe</span></p>
              <iframe src="https://www.youtube.com/embed/abc123"></iframe>
              <iframe src="https://ads.example.net/banner"></iframe>
              <video><source src="/media/clip.mp4"></video>
            </article>
            <footer><p>Copyright Example News</p></footer>
          </body>
        </html>
    "#;

    fn extractor() -> ArticleExtractor {
        ArticleExtractor::new(ScraperConfig::default())
    }

    #[test]
    fn test_extracts_metadata() {
        let record = extractor()
            .extract("https://news.example.com/2024/rust", ARTICLE_HTML)
            .unwrap();

        assert_eq!(record.title, "Rust ships a new edition");
        assert_eq!(record.domain, "news.example.com");
        assert_eq!(record.url, "https://news.example.com/2024/rust");
        assert_eq!(record.authors, vec!["Jane Doe", "John Roe"]);
        assert_eq!(
            record.publish_date.as_deref(),
            Some("2024-05-01T12:30:00+00:00")
        );
        assert_eq!(
            record.top_image.as_deref(),
            Some("https://news.example.com/images/lead.jpg")
        );
    }

    #[test]
    fn test_text_skips_boilerplate() {
        let record = extractor()
            .extract("https://news.example.com/2024/rust", ARTICLE_HTML)
            .unwrap();

        assert!(record.text.contains("announced a new edition today"));
        assert!(record.text.contains("Editions let the language evolve"));
        assert!(!record.text.contains("Subscribe to our newsletter"));
        assert!(!record.text.contains("Home About Contact"));
        assert!(!record.text.contains("Copyright"));
    }

    #[test]
    fn test_movies_only_from_video_hosts() {
        let record = extractor()
            .extract("https://news.example.com/2024/rust", ARTICLE_HTML)
            .unwrap();

        assert_eq!(
            record.movies,
            vec![
                "https://www.youtube.com/embed/abc123",
                "https://news.example.com/media/clip.mp4"
            ]
        );
    }

    #[test]
    fn test_title_falls_back_to_title_tag() {
        let html = "<html><head><title>Plain title</title></head><body><p>x</p></body></html>";
        let record = extractor().extract("https://example.com/", html).unwrap();
        assert_eq!(record.title, "Plain title");
    }

    #[test]
    fn test_short_article_falls_back_to_body() {
        let html = r#"<html><body><article><p>Too short</p></article>
            <div><p>Body paragraph one.</p><p>Body paragraph two.</p></div></body></html>"#;
        let record = extractor().extract("https://example.com/", html).unwrap();
        assert!(record.text.contains("Too short"));
        assert!(record.text.contains("Body paragraph two."));
    }

    #[test]
    fn test_empty_page_yields_invalid_record() {
        let record = extractor()
            .extract("https://example.com/", "<html><body></body></html>")
            .unwrap();
        assert!(!record.is_valid());
    }

    #[test]
    fn test_cloudflare_interstitial_is_detected() {
        let html = r#"<html><head><title>Just a moment...</title></head>
            <body><div id="challenge-running"></div>
            <form id="challenge-form" action="/post?__cf_chl_f_tk=abc"></form></body></html>"#;
        assert_eq!(
            extractor().find_bot_marker(html).as_deref(),
            Some("just a moment...")
        );
    }

    #[test]
    fn test_captcha_iframe_is_detected() {
        let html = r#"<html><head><title>example.com</title></head>
            <body><iframe src="https://geo.captcha-delivery.com/captcha/?cid=1"></iframe></body></html>"#;
        assert_eq!(
            extractor().find_bot_marker(html).as_deref(),
            Some("captcha-delivery.com")
        );
    }

    #[test]
    fn test_challenge_loader_script_on_article_is_not_a_bot_page() {
        let html = ARTICLE_HTML.replace(
            "</body>",
            r#"<script src="/cdn-cgi/challenge-platform/scripts/jsd/main.js"></script>
               <p>Readers were asked to verify you are human before commenting.</p></body>"#,
        );
        assert_eq!(extractor().find_bot_marker(&html), None);
    }

    #[test]
    fn test_script_only_shell_has_no_text() {
        let html = r#"<html><head><title>App shell</title>
            <style>body { margin: 0 }</style></head>
            <body><div id="root"></div>
            <noscript>You need to enable JavaScript to run this app.</noscript>
            <script>window.__INITIAL_STATE__={"user":null};</script></body></html>"#;
        let record = extractor().extract("https://example.com/", html).unwrap();
        assert_eq!(record.title, "App shell");
        assert_eq!(record.text, "");
        assert!(!record.is_valid());
    }

    #[test]
    fn test_inline_script_inside_paragraph_is_dropped() {
        let html = r#"<html><body><div><p>Visible words<script>track()</script> stay.</p></div></body></html>"#;
        let record = extractor().extract("https://example.com/", html).unwrap();
        assert_eq!(record.text, "Visible words stay.");
    }

    #[test]
    fn test_invalid_url_is_extraction_failure() {
        let err = extractor().extract("not a url", ARTICLE_HTML).unwrap_err();
        assert!(matches!(err, ScrapeError::Extraction(_)));
    }

    #[test]
    fn test_domain_keeps_port() {
        let record = extractor()
            .extract("http://localhost:8080/post", "<html></html>")
            .unwrap();
        assert_eq!(record.domain, "localhost:8080");
    }

    #[test]
    fn test_normalize_date_formats() {
        assert_eq!(
            normalize_date("2024-05-01").as_deref(),
            Some("2024-05-01T00:00:00")
        );
        assert_eq!(
            normalize_date("2024-05-01 08:15:00").as_deref(),
            Some("2024-05-01T08:15:00")
        );
        assert_eq!(
            normalize_date("Wed, 01 May 2024 10:00:00 +0000").as_deref(),
            Some("2024-05-01T10:00:00+00:00")
        );
        assert_eq!(normalize_date("yesterday"), None);
    }
}
