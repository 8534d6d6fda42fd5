//! Heuristic readability strategy.
//!
//! Scores paragraph-like blocks by length and comma count, propagates the
//! score to the parent (full) and grandparent (half), adjusts by class/id
//! hints and penalizes link-heavy containers. The best-scoring container's
//! paragraphs become the body.

use super::{Page, Strategy, compile, element_text, has_ancestor, join_body, meta_contents, split_byline, texts};
use crate::models::Contribution;
use crate::normalize::parse_date;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use std::collections::HashMap;
use tracing::debug;

pub const STRATEGY: Strategy = Strategy {
    name: "readability",
    extract,
};

const MIN_BLOCK_CHARS: usize = 25;
const CLASS_WEIGHT: f64 = 25.0;

static SCORED_BLOCKS: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["p, pre, td"]));
static PARAGRAPHS: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["p"]));
static LINKS: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["a"]));
static TITLE: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["title"]));
static AUTHOR: Lazy<Vec<Selector>> = Lazy::new(|| compile(&[r#"meta[name="author"]"#]));
static BYLINE: Lazy<Vec<Selector>> = Lazy::new(|| compile(&[".byline", r#"[itemprop="author"]"#]));
static DATE: Lazy<Vec<Selector>> = Lazy::new(|| {
    compile(&[
        r#"meta[itemprop="datePublished"]"#,
        r#"meta[name="date"]"#,
        r#"meta[name="pubdate"]"#,
    ])
});

const POSITIVE_HINTS: &[&str] = &[
    "article", "body", "content", "entry", "main", "page", "post", "story", "text", "blog",
];
const NEGATIVE_HINTS: &[&str] = &[
    "comment", "footer", "footnote", "masthead", "meta", "sidebar", "sponsor", "share", "social",
    "related", "promo", "widget", "banner", "combx", "ad-",
];
const UNLIKELY_ANCESTORS: &[&str] = &["nav", "footer", "aside", "header", "form"];

fn class_weight(el: ElementRef<'_>) -> f64 {
    let value = el.value();
    let hints = format!(
        "{} {}",
        value.attr("class").unwrap_or_default(),
        value.id().unwrap_or_default()
    )
    .to_ascii_lowercase();
    if hints.trim().is_empty() {
        return 0.0;
    }
    let mut weight = 0.0;
    if NEGATIVE_HINTS.iter().any(|h| hints.contains(h)) {
        weight -= CLASS_WEIGHT;
    }
    if POSITIVE_HINTS.iter().any(|h| hints.contains(h)) {
        weight += CLASS_WEIGHT;
    }
    weight
}

/// Share of an element's text that sits inside links.
fn link_density(el: ElementRef<'_>) -> f64 {
    let total = element_text(el).chars().count();
    if total == 0 {
        return 0.0;
    }
    let linked: usize = LINKS
        .iter()
        .flat_map(|s| el.select(s))
        .map(|a| element_text(a).chars().count())
        .sum();
    linked as f64 / total as f64
}

fn block_score(text: &str) -> f64 {
    let commas = text.matches(',').count() as f64;
    let length_bonus = (text.chars().count() as f64 / 100.0).floor().min(3.0);
    1.0 + commas + length_bonus
}

/// Highest-scoring content container, if any block was long enough to score.
fn best_candidate<'a>(page: &Page<'a>) -> Option<(ElementRef<'a>, f64)> {
    let document = page.document;
    let root = document.root_element();
    let mut candidates: HashMap<_, (ElementRef<'a>, f64)> = HashMap::new();

    for block in SCORED_BLOCKS.iter().flat_map(|s| document.select(s)) {
        if has_ancestor(block, root, |a| UNLIKELY_ANCESTORS.contains(&a.value().name())) {
            continue;
        }
        let text = element_text(block);
        if text.chars().count() < MIN_BLOCK_CHARS {
            continue;
        }
        let score = block_score(&text);

        let mut ancestors = block.ancestors().filter_map(ElementRef::wrap);
        for share in [1.0, 0.5] {
            let Some(ancestor) = ancestors.next() else { break };
            candidates
                .entry(ancestor.id())
                .or_insert_with(|| (ancestor, class_weight(ancestor)))
                .1 += score * share;
        }
    }

    candidates
        .into_values()
        .map(|(el, score)| (el, score * (1.0 - link_density(el))))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}

fn body(page: &Page<'_>) -> Option<String> {
    let (best, score) = best_candidate(page)?;
    debug!(url = page.url, tag = best.value().name(), score, "Picked readability candidate");
    let paragraphs: Vec<String> = PARAGRAPHS
        .iter()
        .flat_map(|s| best.select(s))
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect();
    if paragraphs.is_empty() {
        let text = element_text(best);
        return (!text.is_empty()).then_some(text);
    }
    join_body(paragraphs, &page.selectors.bad_endings)
}

/// Document title with a trailing " | Site" style segment removed.
///
/// The segment is only dropped when what remains still has three or more
/// words, so short titles like "Home | Site" survive intact.
pub fn clean_title(raw: &str) -> String {
    for sep in [" | ", " - ", " – ", " — ", " :: ", " » "] {
        if let Some((head, _)) = raw.rsplit_once(sep) {
            if head.split_whitespace().count() >= 3 {
                return head.trim().to_string();
            }
        }
    }
    raw.trim().to_string()
}

fn authors(page: &Page<'_>) -> Vec<String> {
    let from_meta = meta_contents(page.document, &AUTHOR);
    let bylines = if from_meta.is_empty() {
        texts(page.document, &BYLINE)
    } else {
        from_meta
    };
    bylines.first().map(|b| split_byline(b)).unwrap_or_default()
}

fn extract(page: &Page<'_>) -> Contribution {
    Contribution {
        strategy: STRATEGY.name,
        title: texts(page.document, &TITLE)
            .first()
            .map(|t| clean_title(t))
            .filter(|t| !t.is_empty()),
        published: meta_contents(page.document, &DATE)
            .iter()
            .find_map(|d| parse_date(d)),
        body: body(page),
        authors: authors(page),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Selectors;
    use chrono::NaiveDate;
    use scraper::Html;

    fn run(html: &str) -> Contribution {
        let document = Html::parse_document(html);
        let selectors = Selectors::default();
        let page = Page {
            document: &document,
            raw: html,
            url: "https://x.com/a",
            site_name: "X",
            selectors: &selectors,
        };
        extract(&page)
    }

    const PAGE: &str = r#"<html><head>
        <title>Council approves new budget plan | Daily Ledger</title>
        <meta name="author" content="Ana Ruiz">
        <meta itemprop="datePublished" content="2025-02-14">
    </head><body>
        <div class="sidebar">
          <p><a href="/a">Most read: something else entirely, again</a></p>
        </div>
        <div class="story-text">
          <p>The council approved the budget on Monday, after a long debate, by a narrow vote.</p>
          <p>Spending on roads, schools, and parks will rise next year, officials said.</p>
          <p>Opponents said the plan relies on optimistic revenue forecasts.</p>
        </div>
        <footer><p>All rights reserved, everywhere, forever and ever.</p></footer>
    </body></html>"#;

    #[test]
    fn test_picks_densest_cluster() {
        let c = run(PAGE);
        let body = c.body.unwrap();
        assert!(body.starts_with("The council approved the budget"));
        assert!(body.contains("optimistic revenue forecasts"));
        assert!(!body.contains("Most read"));
        assert!(!body.contains("All rights reserved"));
    }

    #[test]
    fn test_title_author_and_date() {
        let c = run(PAGE);
        assert_eq!(c.title.as_deref(), Some("Council approves new budget plan"));
        assert_eq!(c.authors, vec!["Ana Ruiz"]);
        assert_eq!(c.published, NaiveDate::from_ymd_opt(2025, 2, 14));
    }

    #[test]
    fn test_clean_title_keeps_short_heads() {
        assert_eq!(clean_title("Home | Site"), "Home | Site");
        assert_eq!(clean_title("A much longer headline - Site"), "A much longer headline");
        assert_eq!(clean_title("  Plain  "), "Plain");
    }

    #[test]
    fn test_no_scorable_blocks() {
        let c = run("<html><body><p>Too short.</p></body></html>");
        assert_eq!(c.body, None);
        assert_eq!(c.title, None);
    }
}
