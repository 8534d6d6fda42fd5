//! JSON file persistence.
//!
//! Records live in a single JSON array, ordered by link:
//!
//! ```text
//! data/
//! └── articles.json   # [{ "source": ..., "title": ..., "link": ..., ... }]
//! ```
//!
//! The file is loaded once by [`JsonFileStore::open`] and rewritten after every
//! [`ArticleStore::upsert`] and once per [`ArticleStore::upsert_batch`]. Each
//! rewrite goes to a sibling `.tmp` file that is then renamed over the store,
//! so an interrupted write never leaves a truncated store behind. Records are
//! only kept in memory once they are on disk.

use super::{ArticleStore, validate};
use crate::error::{HarvestError, Result};
use crate::models::{ArticleRecord, UpsertOutcome};
use std::collections::{BTreeMap, HashSet};
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{error, info, instrument};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<BTreeMap<String, ArticleRecord>>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading existing records when the file exists.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = match fs::read_to_string(&path).await {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => {
                let existing: Vec<ArticleRecord> = serde_json::from_str(&text)?;
                existing
                    .into_iter()
                    .fold(BTreeMap::new(), |mut map, record| {
                        map.entry(record.link.clone()).or_insert(record);
                        map
                    })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!(count = records.len(), "Opened article store");
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    #[cfg(test)]
    pub async fn get(&self, link: &str) -> Option<ArticleRecord> {
        self.records.lock().await.get(link).cloned()
    }

    fn insert(records: &mut BTreeMap<String, ArticleRecord>, record: ArticleRecord) -> Result<UpsertOutcome> {
        validate(&record)?;
        Ok(match records.entry(record.link.clone()) {
            Entry::Occupied(_) => UpsertOutcome::AlreadyExisted,
            Entry::Vacant(slot) => {
                slot.insert(record);
                UpsertOutcome::Created
            }
        })
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn persist(&self, records: &BTreeMap<String, ArticleRecord>) -> Result<()> {
        let json = serde_json::to_string_pretty(&records.values().collect::<Vec<_>>())?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(dir).await {
                error!(dir = %dir.display(), error = %e, "Failed to create store dir");
                return Err(e.into());
            }
        }

        let staging = self.staging_path();
        fs::write(&staging, json).await?;
        if let Err(e) = fs::rename(&staging, &self.path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e.into());
        }
        info!(path = %self.path.display(), count = records.len(), "Wrote article store");
        Ok(())
    }
}

impl ArticleStore for JsonFileStore {
    async fn upsert(&self, record: ArticleRecord) -> Result<UpsertOutcome> {
        let mut records = self.records.lock().await;
        let link = record.link.clone();
        let outcome = Self::insert(&mut records, record)?;
        if outcome == UpsertOutcome::Created {
            if let Err(e) = self.persist(&records).await {
                records.remove(&link);
                return Err(e);
            }
        }
        Ok(outcome)
    }

    #[instrument(level = "info", skip_all, fields(count = batch.len()))]
    async fn upsert_batch(&self, batch: Vec<ArticleRecord>) -> Vec<(String, Result<UpsertOutcome>)> {
        let mut records = self.records.lock().await;
        let mut outcomes: Vec<_> = batch
            .into_iter()
            .map(|record| {
                let link = record.link.clone();
                (link, Self::insert(&mut records, record))
            })
            .collect();

        let created = outcomes
            .iter()
            .filter(|(_, o)| matches!(o, Ok(UpsertOutcome::Created)))
            .count();
        if created == 0 {
            return outcomes;
        }

        // records this batch created are rolled back when the write fails,
        // along with any same-batch duplicates that saw them
        if let Err(e) = self.persist(&records).await {
            let reason = e.to_string();
            let rolled_back: HashSet<String> = outcomes
                .iter()
                .filter(|(_, o)| matches!(o, Ok(UpsertOutcome::Created)))
                .map(|(link, _)| link.clone())
                .collect();
            for link in &rolled_back {
                records.remove(link);
            }
            for (link, outcome) in outcomes.iter_mut() {
                if outcome.is_ok() && rolled_back.contains(link.as_str()) {
                    *outcome = Err(HarvestError::Io(std::io::Error::other(reason.clone())));
                }
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(link: &str, title: &str) -> ArticleRecord {
        ArticleRecord {
            source: "S".to_string(),
            title: title.to_string(),
            link: link.to_string(),
            published_date: chrono::NaiveDate::from_ymd_opt(2025, 5, 6),
            body_text: "Body".to_string(),
            summary: None,
            categories: vec!["world".to_string()],
            authors: vec![],
        }
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("nested/articles.json")).await.unwrap();
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_batch_persists_and_reopen_keeps_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/articles.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        let outcomes = store
            .upsert_batch(vec![record("https://x.com/a", "First"), record("https://x.com/b", "B")])
            .await;
        assert!(outcomes.iter().all(|(_, o)| matches!(o, Ok(UpsertOutcome::Created))));

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!dir.path().join("data/articles.json.tmp").exists());
        assert!(written.contains("\"publishedDate\": \"2025-05-06\""));
        assert!(written.contains("\"fullContent\": \"Body\""));

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.len().await, 2);
        let again = reopened.upsert(record("https://x.com/a", "Second")).await.unwrap();
        assert_eq!(again, UpsertOutcome::AlreadyExisted);
        assert_eq!(reopened.get("https://x.com/a").await.unwrap().title, "First");
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::open(&path).await.unwrap_err();
        assert_eq!(err.kind(), "parse");
    }

    #[tokio::test]
    async fn test_failed_write_keeps_nothing_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("data/articles.json")).await.unwrap();
        // a plain file where the store directory should go
        std::fs::write(dir.path().join("data"), "").unwrap();

        let first = store.upsert(record("https://x.com/a", "A")).await.unwrap_err();
        assert_eq!(first.kind(), "io");
        let second = store.upsert(record("https://x.com/a", "A")).await.unwrap_err();
        assert_eq!(second.kind(), "io");
        assert_eq!(store.len().await, 0);

        let outcomes = store
            .upsert_batch(vec![record("https://x.com/b", "B"), record("https://x.com/b", "B again")])
            .await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|(_, o)| o.is_err()));
        assert_eq!(store.len().await, 0);

        std::fs::remove_file(dir.path().join("data")).unwrap();
        let retried = store.upsert(record("https://x.com/a", "A")).await.unwrap();
        assert_eq!(retried, UpsertOutcome::Created);
        assert_eq!(store.len().await, 1);
    }
}
