//! Site pipeline driver.
//!
//! One run per configured site:
//!
//! 1. **Discover**: the site's `type` picks the adapter (feeds, sitemaps or
//!    listing pages); candidate lists are flattened in source order and
//!    de-duplicated by link.
//! 2. **Extract**: candidates fan out through [`run_bounded`] with the article
//!    concurrency cap, each one going through the [`ExtractionEngine`].
//! 3. **Persist**: successful records go to the [`ArticleStore`] in one batch.
//!
//! Sites themselves fan out under a separate, outer cap. A site that fails as
//! a whole (for example an unknown `type`) is recorded in the run's failures
//! and never stops the remaining sites.

use crate::config::{RunLimits, SiteConfig, SiteKind};
use crate::error::Result;
use crate::extract::ExtractionEngine;
use crate::http::PageFetcher;
use crate::models::{BatchResult, CandidateReference, Failure, UpsertOutcome};
use crate::orchestrator::run_bounded;
use crate::sources::{feed, listing, sitemap};
use crate::store::ArticleStore;
use crate::utils::truncate_for_log;
use futures::future::join_all;
use itertools::Itertools;
use tracing::{debug, error, info, instrument, warn};

/// Failures logged per site before the rest are only counted.
const LOGGED_FAILURES: usize = 3;

/// What happened to one site.
#[derive(Debug, Clone)]
pub struct SiteReport {
    pub site: String,
    pub kind: SiteKind,
    /// Unique candidate links discovered.
    pub candidates: usize,
    /// Records produced by extraction.
    pub extracted: usize,
    /// Candidates that produced no record, with the reason.
    pub failures: Vec<Failure<CandidateReference>>,
    pub created: usize,
    pub existing: usize,
    pub store_failures: usize,
}

/// Outcome of a full run over every configured site.
#[derive(Debug)]
pub struct RunReport {
    pub sites: BatchResult<SiteReport, SiteConfig>,
}

impl RunReport {
    pub fn articles_created(&self) -> usize {
        self.sites.succeeded.iter().map(|s| s.created).sum()
    }

    pub fn articles_failed(&self) -> usize {
        self.sites.succeeded.iter().map(|s| s.failures.len()).sum()
    }

    pub fn sites_failed(&self) -> usize {
        self.sites.failed.len()
    }
}

pub struct Pipeline<'a, F, S> {
    fetcher: &'a F,
    store: &'a S,
    limits: RunLimits,
}

impl<'a, F: PageFetcher, S: ArticleStore> Pipeline<'a, F, S> {
    pub fn new(fetcher: &'a F, store: &'a S, limits: RunLimits) -> Self {
        Self {
            fetcher,
            store,
            limits,
        }
    }

    /// Process every site, at most `site_concurrency` at a time.
    #[instrument(level = "info", skip_all, fields(sites = sites.len()))]
    pub async fn run(&self, sites: &[SiteConfig]) -> RunReport {
        let batch = run_bounded(sites.to_vec(), self.limits.site_concurrency, |site| self.run_site(site)).await;

        for site in &batch.succeeded {
            info!(
                site = %site.site,
                kind = %site.kind,
                candidates = site.candidates,
                extracted = site.extracted,
                failed = site.failures.len(),
                created = site.created,
                existing = site.existing,
                store_failures = site.store_failures,
                "Site summary"
            );
        }
        for failure in &batch.failed {
            error!(
                site = %failure.input.name,
                kind = failure.kind,
                reason = %failure.reason,
                "Site skipped"
            );
        }

        let report = RunReport { sites: batch };
        info!(
            sites_ok = report.sites.succeeded.len(),
            sites_failed = report.sites_failed(),
            articles_created = report.articles_created(),
            articles_failed = report.articles_failed(),
            "Run finished"
        );
        report
    }

    /// Discover, extract and persist one site.
    #[instrument(level = "info", skip_all, fields(site = %site.name))]
    pub async fn run_site(&self, site: SiteConfig) -> Result<SiteReport> {
        let kind = site.site_kind()?;
        let candidates = self.discover(&site, kind).await;
        let discovered = candidates.len();
        info!(%kind, count = discovered, "Discovered candidates");

        let engine = ExtractionEngine::new(self.fetcher, &site);
        let engine = &engine;
        let batch = run_bounded(candidates, self.limits.concurrency, |candidate| async move {
            engine.extract(&candidate).await
        })
        .await;

        for failure in batch.failed.iter().take(LOGGED_FAILURES) {
            warn!(
                link = %failure.input.link,
                kind = failure.kind,
                reason = %truncate_for_log(&failure.reason, 200),
                "Article dropped"
            );
        }

        let extracted = batch.succeeded.len();
        let outcomes = self.store.upsert_batch(batch.succeeded).await;
        let mut report = SiteReport {
            site: site.name.clone(),
            kind,
            candidates: discovered,
            extracted,
            failures: batch.failed,
            created: 0,
            existing: 0,
            store_failures: 0,
        };
        for (link, outcome) in outcomes {
            match outcome {
                Ok(UpsertOutcome::Created) => report.created += 1,
                Ok(UpsertOutcome::AlreadyExisted) => report.existing += 1,
                Err(e) => {
                    warn!(%link, error = %e, "Failed to store article");
                    report.store_failures += 1;
                }
            }
        }

        debug!(attempted = batch.total_attempted, "Site finished");
        Ok(report)
    }

    /// Run the site's adapter(s) and return unique candidates in source order.
    async fn discover(&self, site: &SiteConfig, kind: SiteKind) -> Vec<CandidateReference> {
        let limit = Some(self.limits.articles_per_feed);
        let per_source = match kind {
            SiteKind::Rss => {
                join_all(
                    site.rss_feeds
                        .iter()
                        .take(self.limits.feeds_per_site)
                        .map(|url| feed::fetch_candidates(self.fetcher, url, limit)),
                )
                .await
            }
            SiteKind::Sitemap => {
                join_all(
                    site.sitemaps
                        .iter()
                        .take(self.limits.feeds_per_site)
                        .map(|url| sitemap::fetch_candidates(self.fetcher, url, limit)),
                )
                .await
            }
            SiteKind::Normal if site.categories.is_empty() => {
                vec![listing::fetch_candidates(self.fetcher, site, None, limit).await]
            }
            SiteKind::Normal => {
                join_all(
                    site.categories
                        .iter()
                        .map(|category| listing::fetch_candidates(self.fetcher, site, Some(category.as_str()), limit)),
                )
                .await
            }
        };

        per_source
            .into_iter()
            .flatten()
            .unique_by(|candidate| candidate.link.clone())
            .collect()
    }
}
