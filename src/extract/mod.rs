//! Article extraction: several independent strategies, merged field by field.
//!
//! # Strategies
//!
//! | Priority | Strategy | Module | Looks at |
//! |----------|----------|--------|----------|
//! | 1 | structured metadata | [`metadata`] | meta tags, `<title>`, headings, JSON-LD, configured body selectors |
//! | 2 | boilerplate removal | [`boilerplate`] | main region minus navigation, ads and comments |
//! | 3 | heuristic readability | [`readability`] | highest-scoring paragraph cluster |
//!
//! Every strategy fetches the page on its own, so a failed fetch for one
//! strategy does not starve the others. Each strategy is a plain function
//! `fn(&Page) -> Contribution`; the engine runs them on the blocking pool and
//! [`merge`]s the results: for each field, the first strategy (in priority
//! order) that produced a non-empty value wins.
//!
//! A link for which no strategy finds a title is an extraction failure
//! ([`HarvestError::ExtractionEmpty`]) and is never turned into a record.

use crate::config::{Selectors, SiteConfig};
use crate::error::{HarvestError, Result};
use crate::http::PageFetcher;
use crate::models::{ArticleRecord, CandidateReference, Contribution};
use crate::normalize::normalize_published;
use crate::utils::{clean_text, offload};
use futures::future::join_all;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

pub mod boilerplate;
pub mod metadata;
pub mod readability;

/// A fetched article page as seen by a strategy.
pub struct Page<'a> {
    pub document: &'a Html,
    /// Unparsed markup, for pattern matching.
    pub raw: &'a str,
    pub url: &'a str,
    pub site_name: &'a str,
    pub selectors: &'a Selectors,
}

/// One extraction strategy: a name and a pure function over a parsed page.
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub extract: fn(&Page<'_>) -> Contribution,
}

/// Strategies in merge priority order.
pub const DEFAULT_STRATEGIES: [Strategy; 3] = [
    metadata::STRATEGY,
    boilerplate::STRATEGY,
    readability::STRATEGY,
];

/// Merge contributions per field, taking the first non-empty value in order.
pub fn merge(contributions: &[Contribution]) -> Contribution {
    Contribution {
        strategy: "merged",
        title: contributions
            .iter()
            .find_map(|c| c.title.clone().filter(|t| !t.trim().is_empty())),
        published: contributions.iter().find_map(|c| c.published),
        body: contributions
            .iter()
            .find_map(|c| c.body.clone().filter(|b| !b.trim().is_empty())),
        authors: contributions
            .iter()
            .find(|c| !c.authors.is_empty())
            .map(|c| c.authors.clone())
            .unwrap_or_default(),
    }
}

/// Combine a merged contribution with the candidate's inline metadata.
///
/// Extracted dates take precedence over the adapter's published value.
pub fn build_record(source: &str, candidate: &CandidateReference, merged: Contribution) -> Result<ArticleRecord> {
    let title = merged
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| HarvestError::ExtractionEmpty(candidate.link.clone()))?;

    Ok(ArticleRecord {
        source: source.to_string(),
        title,
        link: candidate.link.clone(),
        published_date: merged
            .published
            .or_else(|| normalize_published(candidate.published.as_ref())),
        body_text: merged.body.unwrap_or_default(),
        summary: candidate.summary.clone(),
        categories: candidate.categories.clone(),
        authors: merged.authors,
    })
}

/// Runs the strategy list against one link at a time.
pub struct ExtractionEngine<'a, F> {
    fetcher: &'a F,
    site_name: &'a str,
    selectors: &'a Selectors,
    strategies: &'a [Strategy],
}

impl<'a, F: PageFetcher> ExtractionEngine<'a, F> {
    pub fn new(fetcher: &'a F, site: &'a SiteConfig) -> Self {
        Self {
            fetcher,
            site_name: &site.name,
            selectors: &site.selectors,
            strategies: &DEFAULT_STRATEGIES,
        }
    }

    pub fn with_strategies(mut self, strategies: &'a [Strategy]) -> Self {
        self.strategies = strategies;
        self
    }

    /// Fetch and parse the page for one strategy.
    async fn run_strategy(&self, strategy: Strategy, link: &str) -> Result<Contribution> {
        let html = self.fetcher.fetch(link).await?;
        let url = link.to_string();
        let site_name = self.site_name.to_string();
        let selectors = self.selectors.clone();

        offload(move || {
            let document = Html::parse_document(&html);
            let page = Page {
                document: &document,
                raw: &html,
                url: &url,
                site_name: &site_name,
                selectors: &selectors,
            };
            Ok((strategy.extract)(&page))
        })
        .await
    }

    /// Produce the best record for one candidate, or an extraction failure.
    ///
    /// Strategy failures are logged and count as "no contribution". When every
    /// strategy failed, the first failure is returned so the batch records the
    /// real cause instead of an empty extraction.
    #[instrument(level = "info", skip_all, fields(link = %candidate.link))]
    pub async fn extract(&self, candidate: &CandidateReference) -> Result<ArticleRecord> {
        let outcomes = join_all(
            self.strategies
                .iter()
                .map(|strategy| self.run_strategy(*strategy, &candidate.link)),
        )
        .await;

        let mut contributions = Vec::with_capacity(outcomes.len());
        let mut first_error = None;
        for (strategy, outcome) in self.strategies.iter().zip(outcomes) {
            match outcome {
                Ok(contribution) => {
                    debug!(
                        strategy = strategy.name,
                        empty = contribution.is_empty(),
                        has_title = contribution.title.is_some(),
                        has_body = contribution.body.is_some(),
                        has_date = contribution.published.is_some(),
                        "Strategy finished"
                    );
                    contributions.push(contribution);
                }
                Err(e) => {
                    warn!(strategy = strategy.name, error = %e, "Strategy failed; no contribution");
                    first_error.get_or_insert(e);
                }
            }
        }

        if contributions.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        let record = build_record(self.site_name, candidate, merge(&contributions))?;
        info!(
            title = %record.title,
            body_chars = record.body_text.chars().count(),
            published = ?record.published_date,
            "Extracted article"
        );
        Ok(record)
    }
}

// ---- helpers shared by the strategies ----

/// Compile static selectors, skipping any that fail to parse.
pub(crate) fn compile(list: &[&str]) -> Vec<Selector> {
    list.iter().filter_map(|css| Selector::parse(css).ok()).collect()
}

/// Whitespace-collapsed text of an element.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

/// Non-empty `content` attributes of every element matched by `selectors`, in order.
pub(crate) fn meta_contents(document: &Html, selectors: &[Selector]) -> Vec<String> {
    selectors
        .iter()
        .flat_map(|s| document.select(s))
        .filter_map(|el| el.value().attr("content"))
        .map(clean_text)
        .filter(|c| !c.is_empty())
        .collect()
}

/// Non-empty texts of every element matched by `selectors`, in order.
pub(crate) fn texts(document: &Html, selectors: &[Selector]) -> Vec<String> {
    selectors
        .iter()
        .flat_map(|s| document.select(s))
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// True when any ancestor of `el` below `root` satisfies `pred`.
pub(crate) fn has_ancestor(el: ElementRef<'_>, root: ElementRef<'_>, pred: impl Fn(ElementRef<'_>) -> bool) -> bool {
    el.ancestors()
        .take_while(|node| node.id() != root.id())
        .filter_map(ElementRef::wrap)
        .any(pred)
}

/// Drop the final paragraph when it ends with a configured boilerplate phrase.
pub(crate) fn trim_bad_ending(mut paragraphs: Vec<String>, bad_endings: &[String]) -> Vec<String> {
    let is_bad = paragraphs.last().is_some_and(|last| {
        bad_endings
            .iter()
            .filter(|phrase| !phrase.is_empty())
            .any(|phrase| last.ends_with(phrase.as_str()))
    });
    if is_bad {
        paragraphs.pop();
    }
    paragraphs
}

/// Join paragraphs into a body, `None` when nothing is left.
pub(crate) fn join_body(paragraphs: Vec<String>, bad_endings: &[String]) -> Option<String> {
    let body = trim_bad_ending(paragraphs, bad_endings).join("\n\n");
    (!body.trim().is_empty()).then_some(body)
}

/// Author names from bylines like "By Jane Doe and John Roe".
pub(crate) fn split_byline(byline: &str) -> Vec<String> {
    let cleaned = clean_text(byline);
    let stripped = cleaned
        .strip_prefix("By ")
        .or_else(|| cleaned.strip_prefix("by "))
        .unwrap_or(&cleaned);
    stripped
        .split(" and ")
        .flat_map(|part| part.split(','))
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
