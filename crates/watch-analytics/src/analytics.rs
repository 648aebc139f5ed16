//! Aggregate statistics over a day of watch history.
//!
//! Metadata for every entry is fetched concurrently and joined before the
//! reduction runs. A failed lookup only removes that entry from the watch-time
//! and genre figures; it never aborts the computation.

use crate::categories::genre_or_na;
use crate::duration::{format_watch_hours, parse_duration_secs};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use shared::store::{keys, set_typed};
use shared::{day_key, AnalyticsResult, HistoryEntry, HistoryStore, VideoMetadata, NOT_AVAILABLE};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Grouping key for entries or metadata without a value
const UNKNOWN_KEY: &str = "Unknown";

/// Source of per-video catalog metadata
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Metadata for a watched video URL, `None` when it cannot be resolved
    async fn fetch(&self, video_url: &str) -> Option<VideoMetadata>;
}

/// Compute analytics with one concurrent lookup per entry
pub async fn analyze<F: MetadataFetcher + ?Sized>(
    history: &[HistoryEntry],
    fetcher: &F,
) -> AnalyticsResult {
    analyze_with_limit(history, fetcher, history.len()).await
}

/// Compute analytics with at most `max_in_flight` lookups running at once
pub async fn analyze_with_limit<F: MetadataFetcher + ?Sized>(
    history: &[HistoryEntry],
    fetcher: &F,
    max_in_flight: usize,
) -> AnalyticsResult {
    let metadata = fetch_all(history, fetcher, max_in_flight).await;
    summarize(history, &metadata)
}

/// Fan out metadata lookups and join them, keeping input order
pub async fn fetch_all<F: MetadataFetcher + ?Sized>(
    history: &[HistoryEntry],
    fetcher: &F,
    max_in_flight: usize,
) -> Vec<Option<VideoMetadata>> {
    let semaphore = Semaphore::new(max_in_flight.clamp(1, Semaphore::MAX_PERMITS));

    let lookups = history.iter().map(|entry| {
        let semaphore = &semaphore;
        async move {
            // Never closed, so the permit is always granted
            let _permit = semaphore.acquire().await.ok();
            fetcher.fetch(&entry.url).await
        }
    });

    let metadata = join_all(lookups).await;

    debug!(
        requested = history.len(),
        resolved = metadata.iter().filter(|m| m.is_some()).count(),
        "Metadata lookups settled"
    );
    metadata
}

/// Reduce history and its (possibly partial) metadata to aggregate metrics
///
/// `metadata[i]` is the lookup result for `history[i]`.
pub fn summarize(history: &[HistoryEntry], metadata: &[Option<VideoMetadata>]) -> AnalyticsResult {
    let resolved: Vec<&VideoMetadata> = metadata.iter().flatten().collect();

    let total_secs = resolved
        .iter()
        .map(|m| parse_duration_secs(&m.duration))
        .fold(0u64, u64::saturating_add);

    let channel_counts = tally(history.iter().map(|entry| non_empty_or_unknown(&entry.channel)));
    let top_channel = most_frequent(&channel_counts)
        .map(normalize_channel)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let genre_counts = tally(
        resolved
            .iter()
            .map(|m| non_empty_or_unknown(m.category_id.as_deref().unwrap_or(""))),
    );
    let top_genre = most_frequent(&genre_counts)
        .map(genre_or_na)
        .unwrap_or(NOT_AVAILABLE)
        .to_string();

    AnalyticsResult {
        num_videos: history.len(),
        watch_hours: format_watch_hours(total_secs),
        top_channel,
        top_genre,
    }
}

fn non_empty_or_unknown(value: &str) -> &str {
    if value.is_empty() {
        UNKNOWN_KEY
    } else {
        value
    }
}

/// Count occurrences, keeping keys in order of first appearance
fn tally<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    let mut positions: HashMap<&'a str, usize> = HashMap::new();

    for key in keys {
        match positions.get(key) {
            Some(&position) => counts[position].1 += 1,
            None => {
                positions.insert(key, counts.len());
                counts.push((key, 1));
            }
        }
    }

    counts
}

/// Key with the highest count; on ties the first-seen key wins
fn most_frequent<'a>(counts: &[(&'a str, usize)]) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &(key, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key)
}

/// Collapse a scraped channel name that repeats its own words
///
/// Trims, splits on whitespace, keeps the first occurrence of every token and
/// rejoins with single spaces: `"Tom Tom Explains Explains"` -> `"Tom Explains"`.
pub fn normalize_channel(name: &str) -> String {
    let mut seen = std::collections::HashSet::new();
    name.split_whitespace()
        .filter(|token| seen.insert(*token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Analytics over stored day buckets
pub struct AnalyticsEngine {
    history: HistoryStore,
    fetcher: Arc<dyn MetadataFetcher>,
    max_in_flight: usize,
}

impl AnalyticsEngine {
    /// Create a new engine
    pub fn new(
        history: HistoryStore,
        fetcher: Arc<dyn MetadataFetcher>,
        max_in_flight: usize,
    ) -> Self {
        Self {
            history,
            fetcher,
            max_in_flight,
        }
    }

    /// Analyze the bucket for `date` and store the result under `analytics`
    pub async fn analyze_day(&self, date: NaiveDate) -> Result<AnalyticsResult> {
        let entries = self.history.load(date).await?;
        info!(date = %day_key(date), entries = entries.len(), "Analyzing watch history");

        let result = analyze_with_limit(&entries, self.fetcher.as_ref(), self.max_in_flight).await;

        set_typed(self.history.store().as_ref(), keys::ANALYTICS, &result)
            .await
            .context("Failed to store analytics")?;

        info!(
            num_videos = result.num_videos,
            watch_hours = %result.watch_hours,
            top_channel = %result.top_channel,
            top_genre = %result.top_genre,
            "Analytics stored"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::store::get_typed;
    use shared::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fetcher answering from a fixed table keyed by URL
    #[derive(Default)]
    struct TableFetcher {
        table: HashMap<String, VideoMetadata>,
        calls: AtomicUsize,
    }

    impl TableFetcher {
        fn with(mut self, url: &str, duration: &str, category: &str) -> Self {
            self.table.insert(
                url.to_string(),
                VideoMetadata {
                    duration: duration.to_string(),
                    tags: Vec::new(),
                    category_id: Some(category.to_string()),
                },
            );
            self
        }
    }

    #[async_trait]
    impl MetadataFetcher for TableFetcher {
        async fn fetch(&self, video_url: &str) -> Option<VideoMetadata> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            self.table.get(video_url).cloned()
        }
    }

    fn entry(url: &str, channel: &str) -> HistoryEntry {
        HistoryEntry {
            url: url.to_string(),
            channel: channel.to_string(),
            ..Default::default()
        }
    }

    fn meta(duration: &str, category: Option<&str>) -> Option<VideoMetadata> {
        Some(VideoMetadata {
            duration: duration.to_string(),
            tags: Vec::new(),
            category_id: category.map(str::to_string),
        })
    }

    #[test]
    fn test_normalize_channel() {
        assert_eq!(normalize_channel("Tom Tom Explains Explains"), "Tom Explains");
        assert_eq!(normalize_channel("  Tech\n  Channel \t"), "Tech Channel");
        assert_eq!(normalize_channel(""), "");
    }

    #[test]
    fn test_tally_tie_goes_to_first_seen() {
        let counts = tally(["b", "a", "a", "b", "c"].into_iter());
        assert_eq!(counts, vec![("b", 2), ("a", 2), ("c", 1)]);
        assert_eq!(most_frequent(&counts), Some("b"));
        assert_eq!(most_frequent(&[]), None);
    }

    #[test]
    fn test_summarize_empty_history() {
        let result = summarize(&[], &[]);
        assert_eq!(result, AnalyticsResult::default());
        assert_eq!(result.watch_hours, "0.00");
        assert_eq!(result.top_channel, "N/A");
        assert_eq!(result.top_genre, "N/A");
    }

    #[test]
    fn test_top_genre_by_category_count() {
        let history: Vec<_> = (0..4).map(|i| entry(&format!("u{}", i), "c")).collect();
        let metadata = vec![
            meta("PT1M", Some("24")),
            meta("PT1M", Some("10")),
            meta("PT1M", Some("10")),
            meta("PT1M", Some("10")),
        ];

        assert_eq!(summarize(&history, &metadata).top_genre, "Music");
    }

    #[test]
    fn test_top_genre_all_missing() {
        let history = vec![entry("u1", "c"), entry("u2", "c")];
        assert_eq!(summarize(&history, &[None, None]).top_genre, "N/A");
    }

    #[test]
    fn test_top_genre_unmapped_category() {
        let history = vec![entry("u1", "c")];
        assert_eq!(summarize(&history, &[meta("PT1M", Some("99"))]).top_genre, "N/A");
        assert_eq!(summarize(&history, &[meta("PT1M", None)]).top_genre, "N/A");
    }

    #[test]
    fn test_top_channel_normalized_and_unknown() {
        let history = vec![
            entry("u1", "Tom Tom Explains Explains"),
            entry("u2", ""),
            entry("u3", "Tom Tom Explains Explains"),
        ];
        assert_eq!(summarize(&history, &[None, None, None]).top_channel, "Tom Explains");

        let anonymous = vec![entry("u1", ""), entry("u2", "")];
        assert_eq!(summarize(&anonymous, &[None, None]).top_channel, "Unknown");
    }

    #[test]
    fn test_watch_hours_sum() {
        let history = vec![entry("u1", "c"), entry("u2", "c"), entry("u3", "c")];
        let metadata = vec![meta("PT1H", Some("10")), None, meta("PT30M", Some("10"))];

        let result = summarize(&history, &metadata);
        assert_eq!(result.watch_hours, "1.50");
        assert_eq!(result.num_videos, 3);
    }

    #[tokio::test]
    async fn test_analyze_tolerates_failed_lookups() {
        let fetcher = TableFetcher::default()
            .with("u1", "PT1H", "10")
            .with("u3", "PT30M", "10")
            .with("u5", "PT30M", "24");
        let history: Vec<_> = (1..=5).map(|i| entry(&format!("u{}", i), "c")).collect();

        let result = analyze(&history, &fetcher).await;

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 5);
        assert_eq!(result.num_videos, 5);
        assert_eq!(result.watch_hours, "2.00");
        assert_eq!(result.top_genre, "Music");
    }

    #[tokio::test]
    async fn test_fetch_all_keeps_input_order_under_limit() {
        let fetcher = TableFetcher::default()
            .with("u1", "PT1S", "1")
            .with("u2", "PT2S", "2")
            .with("u3", "PT3S", "10");
        let history = vec![
            entry("u3", "c"),
            entry("missing", "c"),
            entry("u1", "c"),
            entry("u2", "c"),
        ];

        let metadata = fetch_all(&history, &fetcher, 2).await;

        let durations: Vec<Option<&str>> = metadata
            .iter()
            .map(|m| m.as_ref().map(|m| m.duration.as_str()))
            .collect();
        assert_eq!(durations, vec![Some("PT3S"), None, Some("PT1S"), Some("PT2S")]);
    }

    #[tokio::test]
    async fn test_unbounded_limit_is_clamped() {
        let fetcher = TableFetcher::default().with("https://youtu.be/watch?v=a", "PT1H", "10");
        let history = vec![entry("https://youtu.be/watch?v=a", "Solo")];

        let result = analyze_with_limit(&history, &fetcher, usize::MAX).await;

        assert_eq!(result.num_videos, 1);
        assert_eq!(result.watch_hours, "1.00");
        assert_eq!(result.top_genre, "Music");
    }

    #[tokio::test]
    async fn test_engine_stores_result() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let history = HistoryStore::new(store.clone());
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        history
            .merge(date, &[entry("u1", "Chan"), entry("u2", "Chan")])
            .await?;

        let fetcher = Arc::new(TableFetcher::default().with("u1", "PT1H", "27"));
        let engine = AnalyticsEngine::new(history, fetcher, 4);

        let result = engine.analyze_day(date).await?;
        assert_eq!(result.num_videos, 2);
        assert_eq!(result.watch_hours, "1.00");
        assert_eq!(result.top_channel, "Chan");
        assert_eq!(result.top_genre, "Education");

        let stored: Option<AnalyticsResult> = get_typed(store.as_ref(), keys::ANALYTICS).await?;
        assert_eq!(stored, Some(result));

        Ok(())
    }
}
