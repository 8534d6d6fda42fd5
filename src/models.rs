//! Data models flowing through the pipeline.
//!
//! - [`CandidateReference`]: a link discovered by a source adapter, awaiting extraction
//! - [`Contribution`]: one strategy's partial view of an article, merged field by field
//! - [`ArticleRecord`]: the final normalized article, keyed by its link
//! - [`BatchResult`]: successes plus individually reported failures of a fan-out

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// A link plus optional inline metadata, produced by a source adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateReference {
    pub link: String,
    pub title: Option<String>,
    pub summary: Option<String>,
    /// Published timestamp as reported by the feed or sitemap.
    pub published: Option<Published>,
    pub categories: Vec<String>,
}

impl CandidateReference {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            ..Default::default()
        }
    }
}

/// A publish time that is either already structured or still free text.
#[derive(Debug, Clone, PartialEq)]
pub enum Published {
    Timestamp(DateTime<FixedOffset>),
    Text(String),
}

/// Partial article produced by a single extraction strategy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contribution {
    pub strategy: &'static str,
    pub title: Option<String>,
    pub published: Option<NaiveDate>,
    pub body: Option<String>,
    pub authors: Vec<String>,
}

impl Contribution {
    pub fn empty(strategy: &'static str) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.published.is_none() && self.body.is_none() && self.authors.is_empty()
    }
}

/// A merged, normalized article ready for persistence.
///
/// `link` is the identity key: two records with the same link are the same
/// article, whatever their titles.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub source: String,
    pub title: String,
    pub link: String,
    pub published_date: Option<NaiveDate>,
    #[serde(rename = "fullContent")]
    pub body_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(skip)]
    pub authors: Vec<String>,
}

/// One unit of a batch that did not produce a result.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure<I> {
    pub input: I,
    /// Error label, see [`crate::error::HarvestError::kind`].
    pub kind: &'static str,
    pub reason: String,
}

/// Aggregate of a bounded fan-out. Order of `succeeded` is unspecified.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult<T, I> {
    pub succeeded: Vec<T>,
    pub failed: Vec<Failure<I>>,
    pub total_attempted: usize,
}

impl<T, I> Default for BatchResult<T, I> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            total_attempted: 0,
        }
    }
}

/// Outcome of an idempotent upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    AlreadyExisted,
}
