mod json;
mod schema;
mod sqlite;

pub use json::JsonStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;

use crate::config::{Config, StorageType};
use crate::error::Result;
use crate::models::{NewsItem, NewsRecord};

/// Counts reported by a store after one batch has been persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Durable home for news records, keyed on `link`.
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Human-readable backend and location, used in log lines.
    fn describe(&self) -> String;

    /// Every stored record, ordered by id.
    async fn load_all(&self) -> Result<Vec<NewsRecord>>;

    /// Inserts or updates every item of `batch` as one unit. On error nothing
    /// from the batch is visible.
    async fn upsert_batch(&self, batch: Vec<NewsItem>) -> Result<UpsertSummary>;
}

/// Opens the backend selected by `config.storage_type`.
pub async fn open_store(config: &Config) -> Result<Box<dyn NewsStore>> {
    let store: Box<dyn NewsStore> = match config.storage_type {
        StorageType::Json => Box::new(JsonStore::new(&config.json_path)),
        StorageType::Sqlite => Box::new(SqliteStore::open(&config.db_path).await?),
    };
    tracing::debug!(store = %store.describe(), "Opened news store");
    Ok(store)
}

/// Records for display: optionally restricted to `tag`, newest
/// `publishedAt` first, at most `limit` of them.
pub fn newest_first(records: Vec<NewsRecord>, tag: Option<&str>, limit: usize) -> Vec<NewsRecord> {
    let mut records: Vec<NewsRecord> = records
        .into_iter()
        .filter(|r| tag.map_or(true, |t| r.has_tag(t)))
        .collect();
    records.sort_by(|a, b| b.published_at.cmp(&a.published_at).then(b.id.cmp(&a.id)));
    records.truncate(limit);
    records
}
