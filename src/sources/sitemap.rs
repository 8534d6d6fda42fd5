//! XML sitemap adapter.
//!
//! Reads `<urlset><url><loc/><lastmod/></url></urlset>` documents. Entries
//! without a `<loc>` are dropped; `<lastmod>` becomes the candidate's raw
//! published text. Extensions such as `image:image` are ignored.

use crate::error::{HarvestError, Result};
use crate::http::PageFetcher;
use crate::models::{CandidateReference, Published};
use crate::sources::truncate;
use crate::utils::offload;
use serde::Deserialize;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Deserialize)]
struct UrlSet {
    #[serde(rename = "url", default)]
    urls: Vec<UrlEntry>,
}

#[derive(Debug, Deserialize)]
struct UrlEntry {
    loc: Option<String>,
    lastmod: Option<String>,
}

/// Parse a sitemap into `(loc, lastmod)` candidates, in document order.
pub fn parse_sitemap(xml: &str) -> Result<Vec<CandidateReference>> {
    let set: UrlSet = quick_xml::de::from_str(xml).map_err(|e| HarvestError::parse("sitemap", e))?;
    let total = set.urls.len();

    let candidates: Vec<CandidateReference> = set
        .urls
        .into_iter()
        .filter_map(|entry| {
            let loc = entry.loc.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())?;
            let lastmod = entry
                .lastmod
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty());
            Some(CandidateReference {
                published: lastmod.map(Published::Text),
                ..CandidateReference::new(loc)
            })
        })
        .collect();

    if candidates.len() < total {
        debug!(dropped = total - candidates.len(), "Dropped sitemap entries without <loc>");
    }
    Ok(candidates)
}

async fn try_fetch<F: PageFetcher>(
    fetcher: &F,
    sitemap_url: &str,
    limit: Option<usize>,
) -> Result<Vec<CandidateReference>> {
    let xml = fetcher.fetch(sitemap_url).await?;
    let entries = offload(move || parse_sitemap(&xml)).await?;
    Ok(truncate(entries, limit))
}

/// Fetch one sitemap and return up to `limit` candidates in document order.
#[instrument(level = "info", skip_all, fields(%sitemap_url))]
pub async fn fetch_candidates<F: PageFetcher>(
    fetcher: &F,
    sitemap_url: &str,
    limit: Option<usize>,
) -> Vec<CandidateReference> {
    match try_fetch(fetcher, sitemap_url, limit).await {
        Ok(candidates) => {
            info!(count = candidates.len(), "Indexed sitemap entries");
            candidates
        }
        Err(e) => {
            error!(error = %e, kind = e.kind(), "Sitemap failed; contributing no candidates");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::StubFetcher;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"
        xmlns:image="http://www.google.com/schemas/sitemap-image/1.1">
  <url>
    <loc>https://x.com/a</loc>
    <lastmod>2025-05-06</lastmod>
    <image:image><image:loc>https://x.com/a.jpg</image:loc></image:image>
  </url>
  <url>
    <lastmod>2025-05-07</lastmod>
  </url>
</urlset>"#;

    #[test]
    fn test_entry_without_loc_is_dropped() {
        let entries = parse_sitemap(SITEMAP).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://x.com/a");
        assert_eq!(entries[0].published, Some(Published::Text("2025-05-06".to_string())));
    }

    #[test]
    fn test_malformed_sitemap_is_parse_error() {
        let err = parse_sitemap("<urlset><url><loc>x</url>").unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[tokio::test]
    async fn test_limit_and_failure_isolation() {
        let many = format!(
            "<urlset>{}</urlset>",
            (0..5)
                .map(|i| format!("<url><loc>https://x.com/{i}</loc></url>"))
                .collect::<String>()
        );
        let stub = StubFetcher::new().with_page("https://x.com/sitemap.xml", &many);

        let entries = fetch_candidates(&stub, "https://x.com/sitemap.xml", Some(3)).await;
        let links: Vec<_> = entries.iter().map(|e| e.link.as_str()).collect();
        assert_eq!(links, vec!["https://x.com/0", "https://x.com/1", "https://x.com/2"]);

        assert!(fetch_candidates(&stub, "https://x.com/missing.xml", Some(3)).await.is_empty());
    }
}
