//! Source adapters: turn a site's configured entry points into candidate links.
//!
//! Each adapter follows the same two-step shape:
//!
//! 1. **Fetch** the entry point (feed, sitemap or listing page) through a
//!    [`PageFetcher`](crate::http::PageFetcher)
//! 2. **Parse** it off the async scheduler into [`CandidateReference`]s,
//!    then truncate to the requested limit
//!
//! # Supported Sources
//!
//! | Site type | Module | Input | Candidate metadata |
//! |-----------|--------|-------|--------------------|
//! | `rss` | [`feed`] | RSS 2.0, RSS 1.0 (RDF) or Atom | title, summary, published, categories |
//! | `sitemap` | [`sitemap`] | `<urlset>` sitemap | `lastmod` as published |
//! | `normal` | [`listing`] | rendered HTML listing page | listing category |
//!
//! Adapters never fail: a network or parse error is logged at the adapter
//! boundary and the adapter contributes zero candidates, so one broken feed
//! does not abort its siblings.

use crate::models::CandidateReference;

pub mod feed;
pub mod listing;
pub mod sitemap;

/// Keep the first `limit` candidates, preserving source order.
pub(crate) fn truncate(mut candidates: Vec<CandidateReference>, limit: Option<usize>) -> Vec<CandidateReference> {
    if let Some(limit) = limit {
        candidates.truncate(limit);
    }
    candidates
}
