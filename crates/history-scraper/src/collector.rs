//! Scrape orchestration.
//!
//! Drives a [`HistoryPage`] until it stops rendering new items (or the scroll
//! budget runs out), extracts every visible entry and hands the batch to the
//! [`HistoryStore`].

use crate::extract::extract_entry;
use crate::page::HistoryPage;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use shared::{day_key, HistoryEntry, HistoryStore};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Why the scroll loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Item count did not change after a scroll
    NoGrowth,
    /// `max_scrolls` growth cycles were performed
    ScrollBudget,
    /// The page refused to scroll
    ScrollFailed,
}

/// Result of an automatic scrape
#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub entries: Vec<HistoryEntry>,
    /// Scroll/wait cycles performed
    pub cycles: u32,
    pub stop_reason: StopReason,
}

/// Extract every currently rendered history item
pub fn scrape_visible<P: HistoryPage + ?Sized>(page: &P) -> Vec<HistoryEntry> {
    let entries: Vec<HistoryEntry> = page
        .items()
        .iter()
        .map(|item| extract_entry(item.as_ref()))
        .collect();

    debug!(entries = entries.len(), "Scraped visible history");
    entries
}

/// Scroll until no new items render or `max_scrolls` growth cycles pass,
/// then scrape what is visible
///
/// Each cycle scrolls to the bottom, waits `delay` and re-counts items. A
/// cycle that sees the same count as the previous one ends the loop; it still
/// counts as a performed cycle.
pub async fn auto_scrape<P: HistoryPage + ?Sized>(
    page: &mut P,
    max_scrolls: u32,
    delay: Duration,
) -> ScrapeOutcome {
    let mut last_count = 0;
    let mut scrolls = 0;
    let mut cycles = 0;
    let mut stop_reason = StopReason::ScrollBudget;

    while scrolls < max_scrolls {
        if let Err(e) = page.scroll_to_bottom().await {
            warn!(error = %e, cycles = cycles, "Scroll failed, scraping what is rendered");
            stop_reason = StopReason::ScrollFailed;
            break;
        }
        sleep(delay).await;
        cycles += 1;

        let count = page.item_count();
        debug!(cycle = cycles, items = count, "Scrolled history page");

        if count == last_count {
            stop_reason = StopReason::NoGrowth;
            break;
        }
        last_count = count;
        scrolls += 1;
    }

    let entries = scrape_visible(page);
    info!(
        cycles = cycles,
        entries = entries.len(),
        stop_reason = ?stop_reason,
        "Auto-scrape complete"
    );

    ScrapeOutcome {
        entries,
        cycles,
        stop_reason,
    }
}

/// Statistics for one collection session
#[derive(Debug, Clone, Default)]
pub struct CollectStats {
    pub scraped: usize,
    pub added: usize,
    pub skipped: usize,
    pub total_for_day: usize,
    pub cycles: u32,
}

/// Scrapes history pages into the day-bucketed store
pub struct HistoryScraper {
    history: HistoryStore,
    max_scrolls: u32,
    delay: Duration,
}

impl HistoryScraper {
    /// Create a new scraper
    pub fn new(history: HistoryStore, max_scrolls: u32, delay: Duration) -> Self {
        Self {
            history,
            max_scrolls,
            delay,
        }
    }

    /// Scrape a page and merge the result into the bucket for `date`
    ///
    /// Safe to call repeatedly for the same session: already stored URLs are
    /// skipped by the merge.
    pub async fn collect<P: HistoryPage + ?Sized>(
        &self,
        page: &mut P,
        date: NaiveDate,
    ) -> Result<CollectStats> {
        info!(
            date = %day_key(date),
            max_scrolls = self.max_scrolls,
            delay_ms = self.delay.as_millis() as u64,
            "Starting history collection"
        );

        let outcome = auto_scrape(page, self.max_scrolls, self.delay).await;

        let merge = self
            .history
            .merge(date, &outcome.entries)
            .await
            .context("Failed to store scraped history")?;

        Ok(CollectStats {
            scraped: outcome.entries.len(),
            added: merge.added,
            skipped: merge.skipped,
            total_for_day: merge.total,
            cycles: outcome.cycles,
        })
    }

    /// The store this scraper writes to
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }
}
