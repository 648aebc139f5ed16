//! Catalog API client.
//!
//! Every failure is logged and turned into `None`: a missing video id, a
//! missing credential, a transport error, an error status, an unparsable body
//! or an empty result all mean "no metadata" to the caller.

use super::types::VideoListResponse;
use crate::analytics::MetadataFetcher;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::config::CatalogConfig;
use shared::store::{get_string, keys};
use shared::{KeyValueStore, VideoMetadata};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Parts requested for every video
const VIDEO_PARTS: &str = "contentDetails,snippet";

/// Video catalog API client
pub struct CatalogClient {
    /// HTTP client
    client: Client,
    /// Base URL for the catalog API
    base_url: String,
    /// Catalog credential, `None` when not configured
    api_key: Option<String>,
}

impl CatalogClient {
    /// Create a new catalog client
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("watchlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    /// Create a client using the credential saved in the store, falling back
    /// to the one in the config file
    pub async fn from_store(config: &CatalogConfig, store: &dyn KeyValueStore) -> Result<Self> {
        let saved = get_string(store, keys::CATALOG_API_KEY)
            .await
            .context("Failed to read catalog API key")?;

        let api_key = saved.or_else(|| config.api_key.clone());
        if api_key.is_none() {
            warn!("No catalog API key configured; metadata lookups will be skipped");
        }

        Self::new(
            config.base_url.clone(),
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Whether a credential is available
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Look up metadata for a watched video URL
    pub async fn fetch_metadata(&self, video_url: &str) -> Option<VideoMetadata> {
        let Some(video_id) = extract_video_id(video_url) else {
            debug!(url = %video_url, "No video id in URL, skipping metadata lookup");
            return None;
        };

        let Some(api_key) = self.api_key.as_deref() else {
            error!(video_id = %video_id, "Catalog API key not configured");
            return None;
        };

        match self.get_video(&video_id, api_key).await {
            Ok(response) => match response.items.into_iter().next() {
                Some(item) => {
                    debug!(video_id = %video_id, "Fetched video metadata");
                    Some(item.into())
                }
                None => {
                    info!(video_id = %video_id, "Catalog returned no video");
                    None
                }
            },
            Err(e) => {
                warn!(video_id = %video_id, error = %e, "Failed to fetch video metadata");
                None
            }
        }
    }

    /// Issue a single `videos` request
    async fn get_video(&self, video_id: &str, api_key: &str) -> Result<VideoListResponse> {
        let url = format!("{}/videos", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("id", video_id), ("part", VIDEO_PARTS), ("key", api_key)])
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Request failed with status {}: {}", status, error_text));
        }

        response
            .json::<VideoListResponse>()
            .await
            .context("Failed to parse catalog response")
    }
}

#[async_trait]
impl MetadataFetcher for CatalogClient {
    async fn fetch(&self, video_url: &str) -> Option<VideoMetadata> {
        self.fetch_metadata(video_url).await
    }
}

/// Extract the video id from the `v` query parameter of a watch URL
///
/// Links without `v` (shorts, channel pages, relative or malformed URLs)
/// have no id.
pub fn extract_video_id(video_url: &str) -> Option<String> {
    let url = Url::parse(video_url).ok()?;
    url.query_pairs()
        .find(|(name, _)| name == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}
