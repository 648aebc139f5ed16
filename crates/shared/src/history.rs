//! Day-bucketed watch history persistence.
//!
//! Each calendar day is stored under its `YYYY-MM-DD` key as an ordered list of
//! [`HistoryEntry`]. Buckets only grow: merges append entries whose URL has not
//! been seen for that day and never reorder or drop what is already stored.

use crate::models::{day_key, HistoryEntry};
use crate::store::{get_typed, set_typed, KeyValueStore};
use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Outcome of a single merge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Entries appended to the bucket
    pub added: usize,
    /// Entries dropped for an empty or already-present URL
    pub skipped: usize,
    /// Bucket length after the merge
    pub total: usize,
}

/// Number of stored entries for one day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCount {
    pub date: NaiveDate,
    pub entries: usize,
}

/// Watch history persisted through a [`KeyValueStore`]
///
/// Merges issued through the same `HistoryStore` are serialized, so concurrent
/// scrape sessions in one process cannot overwrite each other's additions.
/// Separate processes sharing one database remain last-write-wins per bucket.
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// The underlying key/value store
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Load the bucket for a date (empty if nothing was stored yet)
    pub async fn load(&self, date: NaiveDate) -> Result<Vec<HistoryEntry>> {
        let key = day_key(date);
        let entries: Option<Vec<HistoryEntry>> = get_typed(self.store.as_ref(), &key)
            .await
            .with_context(|| format!("Failed to load history bucket {}", key))?;
        Ok(entries.unwrap_or_default())
    }

    /// Append new entries to the bucket for `date`, deduplicating by URL
    ///
    /// Entries with an empty URL, or whose URL is already in the bucket (or
    /// earlier in `new_entries`), are skipped. Input order is preserved.
    pub async fn merge(&self, date: NaiveDate, new_entries: &[HistoryEntry]) -> Result<MergeStats> {
        let _guard = self.write_lock.lock().await;

        let key = day_key(date);
        let mut bucket = self.load(date).await?;
        let mut seen: HashSet<String> = bucket.iter().map(|entry| entry.url.clone()).collect();

        let before = bucket.len();
        for entry in new_entries {
            if entry.has_url() && seen.insert(entry.url.clone()) {
                bucket.push(entry.clone());
            }
        }

        let stats = MergeStats {
            added: bucket.len() - before,
            skipped: new_entries.len() - (bucket.len() - before),
            total: bucket.len(),
        };

        set_typed(self.store.as_ref(), &key, &bucket)
            .await
            .with_context(|| format!("Failed to write history bucket {}", key))?;

        info!(
            date = %key,
            added = stats.added,
            skipped = stats.skipped,
            total = stats.total,
            "Merged watch history"
        );

        Ok(stats)
    }

    /// Entry counts for the `days` days ending at `today`, oldest first
    pub async fn recent_days(&self, today: NaiveDate, days: u32) -> Result<Vec<DayCount>> {
        let dates: Vec<NaiveDate> = (0..days)
            .rev()
            .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
            .collect();
        let keys: Vec<String> = dates.iter().map(|&date| day_key(date)).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();

        let values = self.store.get(&key_refs).await?;

        let mut counts = Vec::with_capacity(dates.len());
        for (date, key) in dates.into_iter().zip(&keys) {
            let entries = match values.get(key) {
                Some(value) => value.as_array().map(Vec::len).unwrap_or(0),
                None => 0,
            };
            counts.push(DayCount { date, entries });
        }

        debug!(days = days, "Computed recent day counts");
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, SqliteStore};
    use tempfile::TempDir;

    fn entry(url: &str) -> HistoryEntry {
        HistoryEntry {
            title: format!("title for {}", url),
            channel: "Some Channel".to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    fn urls(entries: &[HistoryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.url.as_str()).collect()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn memory_history() -> HistoryStore {
        HistoryStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_merge_unions_in_order() -> Result<()> {
        let history = memory_history();

        history.merge(date(), &[entry("a"), entry("b")]).await?;
        let stats = history
            .merge(date(), &[entry("b"), entry("c"), entry("a"), entry("d")])
            .await?;

        assert_eq!(stats, MergeStats { added: 2, skipped: 2, total: 4 });
        assert_eq!(urls(&history.load(date()).await?), vec!["a", "b", "c", "d"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_merge_drops_empty_urls() -> Result<()> {
        let history = memory_history();
        history.merge(date(), &[entry("a")]).await?;

        let stats = history.merge(date(), &[entry("")]).await?;

        assert_eq!(stats.added, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(urls(&history.load(date()).await?), vec!["a"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() -> Result<()> {
        let history = memory_history();
        let batch = vec![entry("a"), entry("b"), entry("c")];

        history.merge(date(), &batch).await?;
        let once = history.load(date()).await?;
        history.merge(date(), &batch).await?;

        assert_eq!(history.load(date()).await?, once);

        Ok(())
    }

    #[tokio::test]
    async fn test_merge_dedups_within_batch() -> Result<()> {
        let history = memory_history();

        let mut first = entry("a");
        first.title = "first sighting".to_string();
        let mut second = entry("a");
        second.title = "second sighting".to_string();

        history.merge(date(), &[first, second]).await?;

        let bucket = history.load(date()).await?;
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].title, "first sighting");

        Ok(())
    }

    #[tokio::test]
    async fn test_buckets_are_per_day() -> Result<()> {
        let history = memory_history();
        let next_day = date().succ_opt().unwrap();

        history.merge(date(), &[entry("a")]).await?;
        history.merge(next_day, &[entry("a")]).await?;

        assert_eq!(urls(&history.load(date()).await?), vec!["a"]);
        assert_eq!(urls(&history.load(next_day).await?), vec!["a"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_merges_keep_both_sides() -> Result<()> {
        let history = Arc::new(memory_history());

        let left = {
            let history = history.clone();
            tokio::spawn(async move { history.merge(date(), &[entry("a"), entry("b")]).await })
        };
        let right = {
            let history = history.clone();
            tokio::spawn(async move { history.merge(date(), &[entry("c"), entry("d")]).await })
        };
        left.await??;
        right.await??;

        let mut stored = urls(&history.load(date()).await?)
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        stored.sort();
        assert_eq!(stored, vec!["a", "b", "c", "d"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_merge_persists_to_sqlite() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("watchlens.db");

        {
            let history = HistoryStore::new(Arc::new(SqliteStore::open(&db_path)?));
            history.merge(date(), &[entry("a"), entry("b")]).await?;
        }

        let history = HistoryStore::new(Arc::new(SqliteStore::open(&db_path)?));
        history.merge(date(), &[entry("b"), entry("c")]).await?;

        assert_eq!(urls(&history.load(date()).await?), vec!["a", "b", "c"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_recent_days() -> Result<()> {
        let history = memory_history();
        let today = date();
        let yesterday = today.pred_opt().unwrap();

        history.merge(yesterday, &[entry("a"), entry("b")]).await?;
        history.merge(today, &[entry("c")]).await?;

        let counts = history.recent_days(today, 3).await?;
        let entries: Vec<usize> = counts.iter().map(|c| c.entries).collect();

        assert_eq!(counts.len(), 3);
        assert_eq!(counts[0].date, today.pred_opt().unwrap().pred_opt().unwrap());
        assert_eq!(counts[2].date, today);
        assert_eq!(entries, vec![0, 2, 1]);

        Ok(())
    }
}
