//! History scraper CLI application.
//!
//! Replays saved captures of the history page, scrolling through them the way
//! the live page is scrolled, and stores the collected entries for the day.

use anyhow::{Context, Result};
use clap::Parser;
use history_scraper::{snapshot::DEFAULT_BASE_URL, HistoryScraper, SnapshotPage};
use shared::{day_key, local_today, parse_day_key, Config, DataPaths, HistoryStore, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Page captures in scroll order (defaults to the day's capture directory)
    captures: Vec<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Day to store the history under (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    date: Option<String>,

    /// Override the configured scroll budget
    #[arg(long)]
    max_scrolls: Option<u32>,

    /// Override the configured delay after each scroll
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Location the captures were saved from, used to resolve relative links
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    shared::logging::init(shared::LogConfig::from_config(
        &config,
        "history-scraper",
        args.verbose,
    ))?;

    info!("History scraper starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    let date = match &args.date {
        Some(raw) => parse_day_key(raw)?,
        None => local_today(),
    };

    // Initialize data paths
    let data_paths = DataPaths::new(config.data_dir());
    data_paths
        .create_dirs()
        .context("Failed to create data directories")?;

    let captures = if args.captures.is_empty() {
        data_paths
            .list_day_captures(&day_key(date))
            .context("Failed to list page captures")?
    } else {
        args.captures.clone()
    };

    if captures.is_empty() {
        warn!(
            date = %day_key(date),
            dir = %data_paths.day_captures_dir(&day_key(date)).display(),
            "No page captures to scrape"
        );
    }

    let mut page = SnapshotPage::from_files(captures.as_slice(), &args.base_url)
        .context("Failed to load page captures")?;

    // Initialize store
    let store_path = config.store_path();
    info!(store_path = %store_path.display(), "Opening store");
    let store = SqliteStore::open(&store_path).context("Failed to open store")?;
    let history = HistoryStore::new(Arc::new(store));

    let scraper = HistoryScraper::new(
        history,
        args.max_scrolls.unwrap_or(config.scraper.max_scrolls),
        Duration::from_millis(args.delay_ms.unwrap_or(config.scraper.scroll_delay_ms)),
    );

    let stats = scraper
        .collect(&mut page, date)
        .await
        .context("History collection failed")?;

    info!("=== Collection Complete ===");
    info!("Date: {}", day_key(date));
    info!("Captures: {}", captures.len());
    info!("Scroll cycles: {}", stats.cycles);
    info!("Entries scraped: {}", stats.scraped);
    info!("New entries stored: {}", stats.added);
    info!("Skipped (duplicate or no URL): {}", stats.skipped);
    info!("Entries stored for day: {}", stats.total_for_day);

    Ok(())
}
