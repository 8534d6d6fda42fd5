//! HTML listing-page adapter.
//!
//! Fetches a rendered listing page (the site's `url` template, resolved per
//! request), scopes link discovery to the `container` selector when one is
//! configured, and collects the `href` of every element matched by the
//! `articles` selector. Relative links are absolutized against the site's
//! base with [`normalize_url`].
//!
//! # URL templates
//!
//! `{year}` and `{month}` are replaced with the current date. When either is
//! present, `{category}` is left untouched; otherwise `{category}` receives
//! the URL-encoded category name.

use crate::config::SiteConfig;
use crate::error::{HarvestError, Result};
use crate::http::PageFetcher;
use crate::models::CandidateReference;
use crate::normalize::{is_web_link, normalize_url, origin_of};
use crate::sources::truncate;
use crate::utils::{offload, parse_selector};
use chrono::{Datelike, Local, NaiveDate};
use itertools::Itertools;
use scraper::{ElementRef, Html};
use tracing::{error, info, instrument, warn};

const DEFAULT_ARTICLE_SELECTOR: &str = "a[href]";

fn has_date_placeholder(template: &str) -> bool {
    template.contains("{year}") || template.contains("{month}")
}

/// Substitute placeholders in a listing-page URL template.
pub fn resolve_template(template: &str, category: Option<&str>, today: NaiveDate) -> String {
    if has_date_placeholder(template) {
        return template
            .replace("{year}", &format!("{:04}", today.year()))
            .replace("{month}", &format!("{:02}", today.month()));
    }
    match category {
        Some(category) => template.replace("{category}", &urlencoding::encode(category)),
        None => template.to_string(),
    }
}

fn is_followable(href: &str) -> bool {
    !href.is_empty() && !href.starts_with('#')
}

/// Collect absolute, de-duplicated article links from a listing page.
pub fn extract_links(html: &str, container: Option<&str>, articles: Option<&str>, base: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let link_selector = parse_selector(articles.filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_ARTICLE_SELECTOR))?;
    let anchor_selector = parse_selector(DEFAULT_ARTICLE_SELECTOR)?;

    let scopes: Vec<ElementRef<'_>> = match container.filter(|s| !s.trim().is_empty()) {
        Some(css) => document.select(&parse_selector(css)?).collect(),
        None => vec![document.root_element()],
    };

    let links = scopes
        .iter()
        .flat_map(|scope| scope.select(&link_selector))
        .filter_map(|el| {
            // the article selector may match a wrapper around the anchor
            el.value().attr("href").or_else(|| {
                el.select(&anchor_selector)
                    .next()
                    .and_then(|a| a.value().attr("href"))
            })
        })
        .map(str::trim)
        .filter(|href| is_followable(href))
        .map(|href| normalize_url(href, base))
        // javascript:, mailto:, tel: and data: hrefs keep their own scheme
        .filter(|link| is_web_link(link))
        .unique()
        .collect();
    Ok(links)
}

async fn try_fetch<F: PageFetcher>(
    fetcher: &F,
    site: &SiteConfig,
    category: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<CandidateReference>> {
    let template = site
        .url
        .as_deref()
        .or(site.base_url.as_deref())
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| HarvestError::Config(format!("site {:?} has no listing url", site.name)))?;

    if category.is_some() && has_date_placeholder(template) && template.contains("{category}") {
        warn!(%template, "Date placeholders take precedence; {{category}} left unsubstituted");
    }
    let page_url = resolve_template(template, category, Local::now().date_naive());
    let base = site
        .link_base()
        .or_else(|| origin_of(&page_url))
        .ok_or_else(|| HarvestError::Config(format!("site {:?} has no usable base url", site.name)))?;

    info!(%page_url, "Fetching listing page");
    let html = fetcher.fetch(&page_url).await?;

    let container = site.selectors.container.clone();
    let articles = site.selectors.articles.clone();
    let links = offload(move || extract_links(&html, container.as_deref(), articles.as_deref(), &base)).await?;

    let categories: Vec<String> = category.into_iter().map(str::to_string).collect();
    let candidates = links
        .into_iter()
        .map(|link| CandidateReference {
            categories: categories.clone(),
            ..CandidateReference::new(link)
        })
        .collect();
    Ok(truncate(candidates, limit))
}

/// Fetch one listing page (optionally for one category) and return up to
/// `limit` candidate links in page order.
#[instrument(level = "info", skip_all, fields(site = %site.name, category = category.unwrap_or("-")))]
pub async fn fetch_candidates<F: PageFetcher>(
    fetcher: &F,
    site: &SiteConfig,
    category: Option<&str>,
    limit: Option<usize>,
) -> Vec<CandidateReference> {
    match try_fetch(fetcher, site, category, limit).await {
        Ok(candidates) => {
            info!(count = candidates.len(), "Indexed listing page links");
            candidates
        }
        Err(e) => {
            error!(error = %e, kind = e.kind(), "Listing page failed; contributing no candidates");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Selectors;
    use crate::http::testing::StubFetcher;

    const LISTING: &str = r##"<html><body>
        <nav><a href="/about">About</a></nav>
        <main>
          <div class="story"><a href="/world/one">One</a></div>
          <div class="story"><a href="world/two">Two</a></div>
          <div class="story"><a href="https://cdn.other.org/three">Three</a></div>
          <div class="story"><a href="/world/one">One again</a></div>
          <div class="story"><a href="#top">Top</a></div>
          <div class="story"><a href="tel:+15551234">Call</a></div>
          <div class="story"><a href="mailto:desk@x.com">Mail</a></div>
          <div class="story"><a href="javascript:void(0)">Menu</a></div>
          <div class="story"><a href="data:text/html,hi">Data</a></div>
        </main>
    </body></html>"##;

    #[test]
    fn test_relative_links_become_absolute_once() {
        let links = extract_links(LISTING, Some("main"), Some("div.story"), "https://x.com").unwrap();
        assert_eq!(
            links,
            vec![
                "https://x.com/world/one",
                "https://x.com/world/two",
                "https://cdn.other.org/three",
            ]
        );
    }

    #[test]
    fn test_without_container_searches_whole_document() {
        let links = extract_links(LISTING, None, None, "https://x.com/").unwrap();
        assert_eq!(links[0], "https://x.com/about");
        assert_eq!(links.len(), 4);
    }

    #[test]
    fn test_invalid_selector_is_parse_error() {
        let err = extract_links(LISTING, Some("main["), None, "https://x.com").unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[test]
    fn test_resolve_template() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
        assert_eq!(
            resolve_template("https://x.com/{year}/{month}/", None, today),
            "https://x.com/2025/05/"
        );
        assert_eq!(
            resolve_template("https://x.com/section/{category}", Some("world news"), today),
            "https://x.com/section/world%20news"
        );
        // date placeholders win; the category placeholder survives
        assert_eq!(
            resolve_template("https://x.com/{year}/{category}", Some("world"), today),
            "https://x.com/2025/{category}"
        );
    }

    #[tokio::test]
    async fn test_fetch_candidates_per_category() {
        let site = SiteConfig {
            name: "Lister".to_string(),
            kind: "normal".to_string(),
            base_url: Some("https://x.com".to_string()),
            url: Some("https://x.com/section/{category}".to_string()),
            categories: vec!["world".to_string()],
            selectors: Selectors {
                container: Some("main".to_string()),
                articles: Some("div.story a".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let stub = StubFetcher::new().with_page("https://x.com/section/world", LISTING);

        let candidates = fetch_candidates(&stub, &site, Some("world"), Some(2)).await;
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].link, "https://x.com/world/one");
        assert_eq!(candidates[1].categories, vec!["world"]);

        assert!(fetch_candidates(&stub, &site, Some("sport"), Some(2)).await.is_empty());
    }
}
