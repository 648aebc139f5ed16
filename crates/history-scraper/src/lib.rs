//! History scraper library for collecting watch history from rendered pages.
//!
//! This library extracts watch-history entries from a history page, drives
//! incremental scrolling until the page stops rendering new items, and merges
//! the result into the day-bucketed store.

pub mod collector;
pub mod extract;
pub mod page;
pub mod snapshot;

pub use collector::{
    auto_scrape, scrape_visible, CollectStats, HistoryScraper, ScrapeOutcome, StopReason,
};
pub use extract::extract_entry;
pub use page::{HistoryPage, ItemNode};
pub use snapshot::SnapshotPage;
