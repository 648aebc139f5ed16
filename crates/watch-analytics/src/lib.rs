//! Watch analytics library for summarizing stored watch history.
//!
//! This library looks up catalog metadata for watched videos, reduces a day of
//! history to aggregate statistics, and asks a language-model provider for a
//! natural-language summary.

pub mod analytics;
pub mod api;
pub mod categories;
pub mod duration;
pub mod insights;

pub use analytics::{
    analyze, analyze_with_limit, normalize_channel, AnalyticsEngine, MetadataFetcher,
};
pub use api::{extract_video_id, CatalogClient};
pub use categories::category_name;
pub use duration::{format_watch_hours, parse_duration_secs};
pub use insights::{generate_insights, save_settings, InsightsClient, InsightsError, LlmProvider};
