//! Shared library for the watchlens watch-history project.
//!
//! This crate provides common functionality used across all binary crates:
//! - Configuration management
//! - Key/value storage port and its SQLite / in-memory implementations
//! - Day-bucketed watch history persistence
//! - File path utilities
//! - Logging infrastructure
//! - Shared data models

pub mod config;
pub mod history;
pub mod logging;
pub mod models;
pub mod paths;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use history::{DayCount, HistoryStore, MergeStats};
pub use logging::LogConfig;
pub use models::*;
pub use paths::DataPaths;
pub use store::{KeyValueStore, MemoryStore, SqliteStore};

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
