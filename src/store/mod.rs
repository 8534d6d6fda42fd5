//! Persistence of finished articles.
//!
//! An [`ArticleStore`] is an idempotent, keep-first upsert keyed by the
//! record's link. Submitting the same link twice never creates a second
//! record and never overwrites the first one's fields.
//!
//! # Implementations
//!
//! - [`memory::MemoryStore`]: a map held for the lifetime of the process
//! - [`json::JsonFileStore`]: a JSON array on disk, rewritten after each batch

use crate::error::{HarvestError, Result};
use crate::models::{ArticleRecord, UpsertOutcome};

pub mod json;
pub mod memory;

pub trait ArticleStore {
    /// Insert `record` unless its link is already stored.
    async fn upsert(&self, record: ArticleRecord) -> Result<UpsertOutcome>;

    /// Upsert every record, reporting one outcome per link.
    ///
    /// One record's failure never aborts the rest of the batch.
    async fn upsert_batch(&self, records: Vec<ArticleRecord>) -> Vec<(String, Result<UpsertOutcome>)> {
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            let link = record.link.clone();
            outcomes.push((link, self.upsert(record).await));
        }
        outcomes
    }
}

/// Reject records that cannot be keyed.
pub(crate) fn validate(record: &ArticleRecord) -> Result<()> {
    if record.link.trim().is_empty() {
        return Err(HarvestError::parse(
            format!("record {:?}", record.title),
            "empty link",
        ));
    }
    Ok(())
}
