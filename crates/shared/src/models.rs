//! Data models for the project.
//!
//! This module defines the data structures shared by the scraper and the
//! analytics crates: scraped history entries, catalog metadata and the
//! aggregate analytics result. Field names serialize in camelCase so stored
//! buckets stay readable by the browser-side tooling that shares the store.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Sentinel used wherever a statistic cannot be resolved
pub const NOT_AVAILABLE: &str = "N/A";

/// Date format used for day bucket keys
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// One observed watch event extracted from a history page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel: String,
    /// Canonical video URL, the only field used as a uniqueness key
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub thumbnail: String,
    /// Display text such as "3 hours ago", never parsed
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub description: String,
    /// Progress overlay width (e.g. "57%"), `None` when no overlay was rendered
    #[serde(default)]
    pub watched_percentage: Option<String>,
}

impl HistoryEntry {
    /// Whether this entry can be persisted (has a non-empty URL)
    pub fn has_url(&self) -> bool {
        !self.url.is_empty()
    }
}

/// Catalog metadata for a single video
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    /// ISO-8601 duration as returned by the catalog (e.g. `PT5M30S`)
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category_id: Option<String>,
}

/// Aggregate statistics over one day of history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResult {
    pub num_videos: usize,
    /// Hours with exactly two decimals (e.g. "1.50")
    pub watch_hours: String,
    pub top_channel: String,
    pub top_genre: String,
}

impl Default for AnalyticsResult {
    fn default() -> Self {
        Self {
            num_videos: 0,
            watch_hours: "0.00".to_string(),
            top_channel: NOT_AVAILABLE.to_string(),
            top_genre: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Storage key for the bucket of the given date
pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Today's date in the local timezone
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a `YYYY-MM-DD` day key
pub fn parse_day_key(key: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(key, DAY_KEY_FORMAT)
        .map_err(|e| anyhow::anyhow!("Invalid date '{}' (expected YYYY-MM-DD): {}", key, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_camel_case() {
        let entry = HistoryEntry {
            title: "Intro to Rust".to_string(),
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            watched_percentage: Some("57%".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["watchedPercentage"], "57%");
        assert!(json.get("watched_percentage").is_none());
    }

    #[test]
    fn test_entry_tolerates_missing_fields() {
        let entry: HistoryEntry =
            serde_json::from_str(r#"{"url": "https://www.youtube.com/watch?v=x"}"#).unwrap();
        assert_eq!(entry.title, "");
        assert_eq!(entry.watched_percentage, None);
        assert!(entry.has_url());
    }

    #[test]
    fn test_day_key_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(day_key(date), "2024-03-07");
        assert_eq!(parse_day_key("2024-03-07").unwrap(), date);
        assert!(parse_day_key("07/03/2024").is_err());
    }

    #[test]
    fn test_default_analytics() {
        let result = AnalyticsResult::default();
        assert_eq!(result.watch_hours, "0.00");
        assert_eq!(result.top_channel, "N/A");
    }
}
