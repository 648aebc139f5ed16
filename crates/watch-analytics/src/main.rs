//! Watch analytics CLI application.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::{
    day_key, local_today, parse_day_key, Config, HistoryStore, KeyValueStore, SqliteStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use watch_analytics::{
    generate_insights, save_settings, AnalyticsEngine, CatalogClient, InsightsClient,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute aggregate statistics for a day and store them
    Analyze {
        /// Day to analyze (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Ask the configured language model to summarize a day of history
    Insights {
        /// Day to summarize (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Save the language-model provider and both API keys
    Configure {
        /// openai, claude or gemini
        #[arg(long)]
        provider: String,

        /// Language-model API key
        #[arg(long)]
        llm_key: String,

        /// Catalog API key
        #[arg(long)]
        catalog_key: String,
    },

    /// Show stored entry counts for recent days
    Recent {
        /// Number of days ending today
        #[arg(long, default_value = "7")]
        days: u32,
    },

    /// Print the stored history for a day as JSON
    Show {
        /// Day to print (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },
}

fn resolve_date(raw: Option<&str>) -> Result<chrono::NaiveDate> {
    match raw {
        Some(raw) => parse_day_key(raw),
        None => Ok(local_today()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    shared::logging::init(shared::LogConfig::from_config(
        &config,
        "watch-analytics",
        args.verbose,
    ))?;

    info!(config_file = %args.config.display(), "Loaded configuration");

    // Initialize store
    let store_path = config.store_path();
    info!(store_path = %store_path.display(), "Opening store");
    let store: Arc<dyn KeyValueStore> =
        Arc::new(SqliteStore::open(&store_path).context("Failed to open store")?);
    let history = HistoryStore::new(store.clone());

    match args.command {
        Command::Analyze { date } => {
            let date = resolve_date(date.as_deref())?;

            let client = CatalogClient::from_store(&config.catalog, store.as_ref())
                .await
                .context("Failed to create catalog client")?;
            let engine = AnalyticsEngine::new(
                history,
                Arc::new(client),
                config.catalog.max_concurrent_requests,
            );

            let result = engine.analyze_day(date).await?;

            info!("=== Analytics for {} ===", day_key(date));
            info!("Videos watched: {}", result.num_videos);
            info!("Watch time: {}h", result.watch_hours);
            info!("Top channel: {}", result.top_channel);
            info!("Top genre: {}", result.top_genre);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Insights { date } => {
            let date = resolve_date(date.as_deref())?;
            let client = InsightsClient::new(
                config.llm.clone(),
                Duration::from_secs(config.llm.request_timeout_secs),
            )?;

            let text = generate_insights(&history, &client, date).await?;
            println!("{}", text);
        }
        Command::Configure {
            provider,
            llm_key,
            catalog_key,
        } => {
            let provider = save_settings(store.as_ref(), &provider, &llm_key, &catalog_key).await?;
            println!("Configuration saved (provider: {})", provider);
        }
        Command::Recent { days } => {
            let counts = history.recent_days(local_today(), days).await?;
            for day in counts {
                println!("{}  {:>4}", day_key(day.date), day.entries);
            }
        }
        Command::Show { date } => {
            let date = resolve_date(date.as_deref())?;
            let entries = history.load(date).await?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}
