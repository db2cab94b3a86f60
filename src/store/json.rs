use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;

use crate::error::{AppError, Result};
use crate::merge::merge;
use crate::models::{NewsItem, NewsRecord};

use super::{NewsStore, UpsertSummary};

/// Flat-file store: the whole collection lives in one JSON array and is
/// rewritten in full on every batch.
///
/// Read-modify-write is not guarded against other processes writing the
/// same file; callers must serialize runs.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the collection. A missing, unreadable or malformed file yields
    /// an empty collection, so the next write re-seeds it.
    pub async fn load(&self) -> Vec<NewsRecord> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No news file yet, starting empty");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "News file is unreadable; starting EMPTY, next write replaces it"
                );
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<NewsRecord>>(&bytes) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "News file is corrupt; starting EMPTY, next write replaces it"
                );
                Vec::new()
            }
        }
    }

    /// Replaces the file with `records`. The data is written to a temporary
    /// file next to the target and renamed over it, so readers never see a
    /// partial file and a failed write leaves the old one intact.
    pub async fn store(&self, records: &[NewsRecord]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&dir).await?;

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut tmp = NamedTempFile::new_in(&dir)?;
            tmp.write_all(&json)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| AppError::Persist {
                path: path.display().to_string(),
                source: e.error,
            })?;
            Ok(())
        })
        .await
        .map_err(|e| anyhow::anyhow!("News file writer task failed: {}", e))??;

        tracing::debug!(path = %self.path.display(), count = records.len(), "Wrote news file");
        Ok(())
    }
}

#[async_trait]
impl NewsStore for JsonStore {
    fn describe(&self) -> String {
        format!("json file {}", self.path().display())
    }

    async fn load_all(&self) -> Result<Vec<NewsRecord>> {
        let mut records = self.load().await;
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    async fn upsert_batch(&self, batch: Vec<NewsItem>) -> Result<UpsertSummary> {
        if batch.is_empty() {
            return Ok(UpsertSummary::default());
        }

        let existing = self.load().await;
        let outcome = merge(existing, batch)?;
        self.store(&outcome.records).await?;

        Ok(UpsertSummary {
            inserted: outcome.inserted,
            updated: outcome.updated,
        })
    }
}
