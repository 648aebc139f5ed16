//! Key/value storage port.
//!
//! Everything the pipeline persists goes through [`KeyValueStore`]: string
//! keys mapped to arbitrary JSON values, read and written in batches. The
//! SQLite implementation backs the binaries; [`MemoryStore`] is the in-process
//! double used by tests.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Well-known store keys besides the `YYYY-MM-DD` day buckets
pub mod keys {
    /// Catalog API credential
    pub const CATALOG_API_KEY: &str = "yt_api_key";
    /// Selected language-model provider
    pub const LLM_PROVIDER: &str = "llmProvider";
    /// Language-model API credential
    pub const LLM_API_KEY: &str = "llmApiKey";
    /// Most recent analytics result
    pub const ANALYTICS: &str = "analytics";
    /// Most recent language-model summary
    pub const INSIGHTS: &str = "insights";
}

/// Async mapping from string keys to JSON values
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the given keys; keys without a value are absent from the result
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>>;

    /// Write every key in `items`, replacing previous values
    async fn set(&self, items: Map<String, Value>) -> Result<()>;
}

/// Read a single key and deserialize it
pub async fn get_typed<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    let mut values = store.get(&[key]).await?;
    match values.remove(key) {
        Some(Value::Null) | None => Ok(None),
        Some(value) => {
            let typed = serde_json::from_value(value)
                .with_context(|| format!("Failed to decode stored value for key '{}'", key))?;
            Ok(Some(typed))
        }
    }
}

/// Serialize a value and write it under a single key
pub async fn set_typed<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let value = serde_json::to_value(value)
        .with_context(|| format!("Failed to encode value for key '{}'", key))?;
    let mut items = Map::new();
    items.insert(key.to_string(), value);
    store.set(items).await
}

/// Read a string key, treating blank strings as absent
pub async fn get_string(store: &dyn KeyValueStore, key: &str) -> Result<Option<String>> {
    let value: Option<String> = get_typed(store, key).await?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);";

/// SQLite-backed store, one row per key with the JSON value as text
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create store directory: {}", parent.display())
                })?;
            }
        }

        debug!(path = %path.display(), "Opening store database");

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open store at {}", path.display()))?;

        Self::with_connection(conn)
    }

    /// Create a store that lives only as long as this value
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory store")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create store schema")?;
        info!("Store schema ready");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Store connection lock poisoned"))
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached("SELECT value FROM kv_store WHERE key = ?1")
            .context("Failed to prepare store read")?;

        let mut values = Map::new();
        for &key in keys {
            let raw: Option<String> = stmt
                .query_row(params![key], |row| row.get(0))
                .optional()
                .with_context(|| format!("Failed to read key '{}'", key))?;

            if let Some(raw) = raw {
                let value: Value = serde_json::from_str(&raw)
                    .with_context(|| format!("Stored value for key '{}' is not JSON", key))?;
                values.insert(key.to_string(), value);
            }
        }

        debug!(requested = keys.len(), found = values.len(), "Store read");
        Ok(values)
    }

    async fn set(&self, items: Map<String, Value>) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("Failed to begin transaction")?;
        let now = chrono::Utc::now().to_rfc3339();

        for (key, value) in &items {
            let raw = serde_json::to_string(value)
                .with_context(|| format!("Failed to encode value for key '{}'", key))?;
            tx.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE
                 SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, raw, now],
            )
            .with_context(|| format!("Failed to write key '{}'", key))?;
        }

        tx.commit().context("Failed to commit store write")?;
        debug!(keys = items.len(), "Store write");
        Ok(())
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>> {
        self.values
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let values = self.lock()?;
        Ok(keys
            .iter()
            .filter_map(|&key| values.get(key).map(|v| (key.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, items: Map<String, Value>) -> Result<()> {
        let mut values = self.lock()?;
        values.extend(items);
        Ok(())
    }
}
