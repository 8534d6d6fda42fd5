use super::{ArticleStore, validate};
use crate::error::Result;
use crate::models::{ArticleRecord, UpsertOutcome};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard};

/// In-process store keyed by link.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, ArticleRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, ArticleRecord>> {
        // every mutation is a single insert, so a poisoned map is still consistent
        self.records.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    #[cfg(test)]
    pub fn get(&self, link: &str) -> Option<ArticleRecord> {
        self.records().get(link).cloned()
    }
}

impl ArticleStore for MemoryStore {
    async fn upsert(&self, record: ArticleRecord) -> Result<UpsertOutcome> {
        validate(&record)?;
        let mut records = self.records();
        Ok(match records.entry(record.link.clone()) {
            Entry::Occupied(_) => UpsertOutcome::AlreadyExisted,
            Entry::Vacant(slot) => {
                slot.insert(record);
                UpsertOutcome::Created
            }
        })
    }
}
