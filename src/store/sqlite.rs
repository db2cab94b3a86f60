use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row, Transaction};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::merge::apply_item;
use crate::models::{NewsItem, NewsRecord, TagSet};

use super::schema::SCHEMA;
use super::{NewsStore, UpsertSummary};

const SELECT_COLUMNS: &str =
    "SELECT id, title, source, link, publishedAt, tags, imageUrl, content FROM news";

enum Upserted {
    Inserted,
    Updated,
}

/// SQLite-backed store. Rows are upserted one by one against the `news`
/// table; the database assigns ids.
pub struct SqliteStore {
    conn: Connection,
    location: String,
}

impl SqliteStore {
    pub async fn open(db_path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = Connection::open(db_path).await?;
        Self::init(conn, db_path.to_string()).await
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn, ":memory:".to_string()).await
    }

    async fn init(conn: Connection, location: String) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, location })
    }
}

#[async_trait]
impl NewsStore for SqliteStore {
    fn describe(&self) -> String {
        format!("sqlite database {}", self.location)
    }

    async fn load_all(&self) -> Result<Vec<NewsRecord>> {
        let records = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
                let records = stmt
                    .query_map([], record_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(records)
            })
            .await?;
        Ok(records)
    }

    async fn upsert_batch(&self, batch: Vec<NewsItem>) -> Result<UpsertSummary> {
        let summary = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut summary = UpsertSummary::default();

                for item in batch {
                    match upsert_one(&tx, item)? {
                        Upserted::Inserted => summary.inserted += 1,
                        Upserted::Updated => summary.updated += 1,
                    }
                }

                // Dropping the transaction without commit rolls everything back.
                tx.commit()?;
                Ok(summary)
            })
            .await?;
        Ok(summary)
    }
}

fn upsert_one(tx: &Transaction, item: NewsItem) -> rusqlite::Result<Upserted> {
    let existing = tx
        .query_row(
            &format!("{SELECT_COLUMNS} WHERE link = ?1"),
            params![item.link],
            record_from_row,
        )
        .optional()?;

    match existing {
        Some(mut record) => {
            apply_item(&mut record, item);
            tx.execute(
                r#"UPDATE news SET title = ?1, source = ?2, publishedAt = ?3, tags = ?4,
                       imageUrl = ?5, content = ?6
                   WHERE id = ?7"#,
                params![
                    record.title,
                    record.source,
                    record.published_at,
                    encode_tags(&record.tags)?,
                    record.image_url,
                    record.content,
                    record.id,
                ],
            )?;
            Ok(Upserted::Updated)
        }
        None => {
            tx.execute(
                r#"INSERT INTO news (title, source, link, publishedAt, tags, imageUrl, content)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                params![
                    item.title,
                    item.source,
                    item.link,
                    item.published_at,
                    encode_tags(&item.tags)?,
                    item.image_url,
                    item.content,
                ],
            )?;
            Ok(Upserted::Inserted)
        }
    }
}

fn encode_tags(tags: &TagSet) -> rusqlite::Result<String> {
    serde_json::to_string(tags).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn decode_tags(link: &str, raw: Option<String>) -> TagSet {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return TagSet::new();
    };

    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(tags) => tags.into_iter().collect(),
        Err(e) => {
            tracing::warn!(link, error = %e, "Stored tags are not a JSON array, treating as empty");
            TagSet::new()
        }
    }
}

fn record_from_row(row: &Row) -> rusqlite::Result<NewsRecord> {
    let link: String = row.get::<_, Option<String>>(3)?.unwrap_or_default();
    let tags = decode_tags(&link, row.get(5)?);

    Ok(NewsRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        source: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        link,
        published_at: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        tags,
        image_url: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        content: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
    })
}
