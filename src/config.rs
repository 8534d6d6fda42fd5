//! Site descriptors and runtime settings.
//!
//! The site list is read from a JSON (`.json`) or YAML (`.yaml`, `.yml`) file.
//! Each entry describes one news source and how to discover its articles:
//!
//! ```json
//! [{
//!   "name": "ScienceDaily",
//!   "type": "rss",
//!   "rss_feeds": ["https://www.sciencedaily.com/rss/top/science.xml"],
//!   "selectors": {
//!     "article_container": "div#story_text",
//!     "article_content": "p",
//!     "bad_endings": ["Share this story"]
//!   }
//! }]
//! ```
//!
//! The `type` field is kept as a raw string here and validated per site by
//! [`SiteConfig::site_kind`], so one bad entry never rejects the whole file.

use crate::error::{HarvestError, Result};
use crate::normalize::origin_of;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// One configured news source.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Display name, stored as the record's `source`.
    pub name: String,
    /// Raw site type: `rss`, `sitemap` or `normal`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Syndication feed URLs (`type = rss`).
    pub rss_feeds: Vec<String>,
    /// XML sitemap URLs (`type = sitemap`).
    pub sitemaps: Vec<String>,
    /// Base used to absolutize relative listing-page links.
    pub base_url: Option<String>,
    /// Listing-page URL template; may embed `{year}`, `{month}` or `{category}`.
    pub url: Option<String>,
    /// Listing-page categories; one listing fetch per category when present.
    pub categories: Vec<String>,
    pub selectors: Selectors,
}

/// CSS selectors and text filters for a site.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Selectors {
    /// Listing-page region holding article links. Whole document when absent.
    pub container: Option<String>,
    /// Article-link selector on listing pages. Defaults to `a[href]`.
    pub articles: Option<String>,
    /// Trailing boilerplate phrases; a final paragraph ending with one is dropped.
    pub bad_endings: Vec<String>,
    /// Article-page region holding the body text.
    pub article_container: Option<String>,
    /// Article-page body paragraph selector.
    pub article_content: Option<String>,
}

/// Validated site type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    Rss,
    Sitemap,
    Normal,
}

impl FromStr for SiteKind {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rss" => Ok(SiteKind::Rss),
            "sitemap" => Ok(SiteKind::Sitemap),
            "normal" => Ok(SiteKind::Normal),
            other => Err(HarvestError::Config(format!("unknown site type {other:?}"))),
        }
    }
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SiteKind::Rss => "rss",
            SiteKind::Sitemap => "sitemap",
            SiteKind::Normal => "normal",
        };
        f.write_str(s)
    }
}

impl SiteConfig {
    pub fn site_kind(&self) -> Result<SiteKind> {
        self.kind.parse().map_err(|e| match e {
            HarvestError::Config(reason) => {
                HarvestError::Config(format!("site {:?}: {reason}", self.name))
            }
            other => other,
        })
    }

    /// Base for relative links: `base_url`, else the origin of `url`.
    pub fn link_base(&self) -> Option<String> {
        if let Some(base) = self.base_url.as_deref().filter(|b| !b.trim().is_empty()) {
            return Some(base.trim().to_string());
        }
        origin_of(self.url.as_deref()?)
    }
}

/// HTTP client settings passed explicitly to the fetcher.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            headers: vec![
                (
                    "Accept".to_string(),
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
                ),
                ("Accept-Language".to_string(), "en-US,en;q=0.5".to_string()),
            ],
            timeout: Duration::from_secs(30),
        }
    }
}

/// Per-run fan-out and truncation limits.
#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    /// Feed or sitemap URLs processed per site.
    pub feeds_per_site: usize,
    /// Candidates kept per feed, sitemap or listing page.
    pub articles_per_feed: usize,
    /// Articles extracted concurrently within one site.
    pub concurrency: usize,
    /// Sites processed concurrently.
    pub site_concurrency: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            feeds_per_site: 2,
            articles_per_feed: 3,
            concurrency: 10,
            site_concurrency: 4,
        }
    }
}

/// Parse a site list, choosing the format from the file extension.
pub fn parse_sites(text: &str, path: &Path) -> Result<Vec<SiteConfig>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let sites = match ext.as_deref() {
        Some("yaml") | Some("yml") => serde_yaml::from_str(text)?,
        _ => serde_json::from_str(text)?,
    };
    Ok(sites)
}

/// Load the site list from disk.
///
/// A missing file is a [`HarvestError::Config`]; the caller decides whether
/// that means "no work" or a fatal exit.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_sites(path: &Path) -> Result<Vec<SiteConfig>> {
    let text = match fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(HarvestError::Config(format!(
                "sites file not found: {}",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };
    let sites = parse_sites(&text, path)?;
    info!(count = sites.len(), "Loaded site configuration");
    Ok(sites)
}
