//! Catalog API response types.
//!
//! Only the fields the analytics read are modelled; everything is optional so
//! an unexpected shape degrades to empty values instead of a parse failure.

use serde::{Deserialize, Serialize};
use shared::VideoMetadata;

/// Response of the `videos` endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

/// One video resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoItem {
    #[serde(default)]
    pub content_details: Option<ContentDetails>,
    #[serde(default)]
    pub snippet: Option<Snippet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentDetails {
    /// ISO-8601 duration, e.g. `PT5M30S`
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category_id: Option<String>,
}

impl From<VideoItem> for VideoMetadata {
    fn from(item: VideoItem) -> Self {
        let snippet = item.snippet.unwrap_or_default();
        Self {
            duration: item
                .content_details
                .and_then(|details| details.duration)
                .unwrap_or_default(),
            tags: snippet.tags,
            category_id: snippet.category_id,
        }
    }
}
