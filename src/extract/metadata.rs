//! Structured-metadata strategy.
//!
//! Title candidates, in order: social-card titles (`og:title`,
//! `twitter:title`), the document `<title>`, `<h1>` headings, JSON-LD
//! `headline` (including `@graph` arrays), then article-title selectors.
//! Candidates are de-duplicated, known site-name suffixes (" | Site",
//! " - Site") are stripped, and the first non-empty one wins.
//!
//! Date candidates, in order: publish-time meta tags, `<time datetime>`,
//! JSON-LD `datePublished`, date selectors, then regex matches over the raw
//! markup (ISO date, ISO date-time, "Month DD, YYYY"). The first candidate
//! that [`parse_date`] accepts wins.
//!
//! The body comes from the site's configured `article_container` /
//! `article_content` selectors, when present.

use super::{Page, Strategy, compile, element_text, join_body, meta_contents, split_byline, texts};
use crate::models::Contribution;
use crate::normalize::parse_date;
use crate::utils::{clean_text, parse_selector};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

pub const STRATEGY: Strategy = Strategy {
    name: "metadata",
    extract,
};

static SOCIAL_TITLE: Lazy<Vec<Selector>> = Lazy::new(|| {
    compile(&[
        r#"meta[property="og:title"]"#,
        r#"meta[name="og:title"]"#,
        r#"meta[name="twitter:title"]"#,
        r#"meta[property="twitter:title"]"#,
    ])
});
static DOCUMENT_TITLE: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["title"]));
static HEADINGS: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["h1"]));
static ARTICLE_TITLE: Lazy<Vec<Selector>> = Lazy::new(|| {
    compile(&[
        r#"[itemprop="headline"]"#,
        ".article-title",
        ".entry-title",
        ".post-title",
        ".headline",
        "article h2",
    ])
});
static SITE_NAME: Lazy<Vec<Selector>> = Lazy::new(|| {
    compile(&[
        r#"meta[property="og:site_name"]"#,
        r#"meta[name="application-name"]"#,
    ])
});
static DATE_META: Lazy<Vec<Selector>> = Lazy::new(|| {
    compile(&[
        r#"meta[property="article:published_time"]"#,
        r#"meta[property="og:published_time"]"#,
        r#"meta[itemprop="datePublished"]"#,
        r#"meta[name="pubdate"]"#,
        r#"meta[name="publishdate"]"#,
        r#"meta[name="parsely-pub-date"]"#,
        r#"meta[name="DC.date.issued"]"#,
        r#"meta[name="date"]"#,
    ])
});
static TIME_DATETIME: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["time[datetime]"]));
static DATE_TEXT: Lazy<Vec<Selector>> = Lazy::new(|| {
    compile(&[
        ".published",
        ".pubdate",
        ".post-date",
        ".entry-date",
        ".article-date",
        ".date",
    ])
});
static AUTHOR_META: Lazy<Vec<Selector>> = Lazy::new(|| compile(&[r#"meta[name="author"]"#]));
static JSON_LD: Lazy<Vec<Selector>> = Lazy::new(|| compile(&[r#"script[type="application/ld+json"]"#]));

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("valid regex"));
static ISO_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})?").expect("valid regex")
});
static MONTH_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:Jan(?:uary)?|Feb(?:ruary)?|Mar(?:ch)?|Apr(?:il)?|May|June?|July?|Aug(?:ust)?|Sep(?:tember)?|Oct(?:ober)?|Nov(?:ember)?|Dec(?:ember)?)\.? \d{1,2}, \d{4}\b",
    )
    .expect("valid regex")
});

const TITLE_SEPARATORS: &[&str] = &[" | ", " - ", " – ", " — ", " :: ", " · "];

/// Values pulled out of every JSON-LD block on the page.
#[derive(Debug, Default)]
struct JsonLd {
    headlines: Vec<String>,
    dates: Vec<String>,
    authors: Vec<String>,
}

fn collect_names(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(name) => out.push(name.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_names(item, out)),
        Value::Object(map) => {
            if let Some(Value::String(name)) = map.get("name") {
                out.push(name.clone());
            }
        }
        _ => {}
    }
}

fn walk_json_ld(value: &Value, out: &mut JsonLd) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| walk_json_ld(item, out)),
        Value::Object(map) => {
            if let Some(Value::String(headline)) = map.get("headline") {
                out.headlines.push(headline.clone());
            }
            if let Some(Value::String(date)) = map.get("datePublished") {
                out.dates.push(date.clone());
            }
            if let Some(author) = map.get("author") {
                collect_names(author, &mut out.authors);
            }
            if let Some(graph) = map.get("@graph") {
                walk_json_ld(graph, out);
            }
        }
        _ => {}
    }
}

fn json_ld(document: &Html) -> JsonLd {
    let mut out = JsonLd::default();
    for script in JSON_LD.iter().flat_map(|s| document.select(s)) {
        let text = script.text().collect::<String>();
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(value) => walk_json_ld(&value, &mut out),
            Err(e) => debug!(error = %e, "Skipping malformed JSON-LD block"),
        }
    }
    out
}

/// Case-insensitive (ASCII) suffix strip that respects char boundaries.
fn strip_suffix_ci<'t>(title: &'t str, suffix: &str) -> Option<&'t str> {
    let cut = title.len().checked_sub(suffix.len())?;
    if !title.is_char_boundary(cut) {
        return None;
    }
    title[cut..].eq_ignore_ascii_case(suffix).then(|| &title[..cut])
}

/// Remove trailing " <sep> <site name>" segments for any known site name.
pub fn strip_site_suffix(title: &str, site_names: &[String]) -> String {
    let mut current = title.trim();
    'outer: loop {
        for name in site_names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            for sep in TITLE_SEPARATORS {
                if let Some(head) = strip_suffix_ci(current, &format!("{sep}{name}")) {
                    if !head.trim().is_empty() {
                        current = head.trim();
                        continue 'outer;
                    }
                }
            }
        }
        return current.to_string();
    }
}

fn title_candidates(page: &Page<'_>, ld: &JsonLd) -> Vec<String> {
    let document = page.document;
    meta_contents(document, &SOCIAL_TITLE)
        .into_iter()
        .chain(texts(document, &DOCUMENT_TITLE))
        .chain(texts(document, &HEADINGS))
        .chain(ld.headlines.iter().map(|h| clean_text(h)))
        .chain(texts(document, &ARTICLE_TITLE))
        .filter(|t| !t.is_empty())
        .unique()
        .collect()
}

/// First non-empty title after suffix stripping.
fn pick_title(page: &Page<'_>, ld: &JsonLd) -> Option<String> {
    let mut site_names = meta_contents(page.document, &SITE_NAME);
    site_names.push(page.site_name.to_string());

    title_candidates(page, ld)
        .iter()
        .map(|t| strip_site_suffix(t, &site_names))
        .find(|t| !t.is_empty())
}

fn date_candidates(page: &Page<'_>, ld: &JsonLd) -> Vec<String> {
    let document = page.document;
    let time_attrs = TIME_DATETIME
        .iter()
        .flat_map(|s| document.select(s))
        .filter_map(|el| el.value().attr("datetime"))
        .map(clean_text);
    let iso_matches = [&*ISO_DATE, &*ISO_DATETIME]
        .into_iter()
        .flat_map(|re| re.find_iter(page.raw).map(|m| m.as_str().to_string()));
    // "Mar. 5, 2024" -> "Mar 5, 2024"
    let month_matches = MONTH_DATE
        .find_iter(page.raw)
        .map(|m| m.as_str().replacen('.', "", 1));

    meta_contents(document, &DATE_META)
        .into_iter()
        .chain(time_attrs)
        .chain(ld.dates.iter().map(|d| clean_text(d)))
        .chain(texts(document, &DATE_TEXT))
        .chain(iso_matches)
        .chain(month_matches)
        .filter(|d| !d.is_empty())
        .unique()
        .collect()
}

/// Body text from the site's configured selectors.
fn configured_body(page: &Page<'_>) -> Option<String> {
    let content_css = page
        .selectors
        .article_content
        .as_deref()
        .filter(|s| !s.trim().is_empty())?;
    let content = parse_selector(content_css)
        .inspect_err(|e| debug!(error = %e, "Ignoring invalid content selector"))
        .ok()?;

    let scope = match page.selectors.article_container.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(css) => {
            let container = parse_selector(css)
                .inspect_err(|e| debug!(error = %e, "Ignoring invalid container selector"))
                .ok()?;
            page.document.select(&container).next()?
        }
        None => page.document.root_element(),
    };

    let paragraphs = scope
        .select(&content)
        .map(element_text)
        .filter(|p| !p.is_empty())
        .collect();
    join_body(paragraphs, &page.selectors.bad_endings)
}

fn authors(page: &Page<'_>, ld: &JsonLd) -> Vec<String> {
    let from_meta: Vec<String> = meta_contents(page.document, &AUTHOR_META)
        .iter()
        .flat_map(|a| split_byline(a))
        .collect();
    let names = if from_meta.is_empty() { ld.authors.clone() } else { from_meta };
    names
        .into_iter()
        .map(|n| clean_text(&n))
        .filter(|n| !n.is_empty())
        .unique()
        .collect()
}

fn extract(page: &Page<'_>) -> Contribution {
    let ld = json_ld(page.document);
    Contribution {
        strategy: STRATEGY.name,
        title: pick_title(page, &ld),
        published: date_candidates(page, &ld).iter().find_map(|d| parse_date(d)),
        body: configured_body(page),
        authors: authors(page, &ld),
    }
}
