use std::path::{Path, PathBuf};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use pb_core::{Draft, DraftStorage, Error, HistoryRecord, HistoryStatus, HistoryStorage, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::info;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS drafts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL DEFAULT '',
        body TEXT NOT NULL DEFAULT '',
        tags TEXT NOT NULL DEFAULT '[]',
        blog_type_id TEXT NOT NULL DEFAULT '',
        hearing_data TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS publish_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL DEFAULT '',
        body_preview TEXT NOT NULL DEFAULT '',
        blog_type_id TEXT NOT NULL DEFAULT '',
        service_name TEXT NOT NULL DEFAULT '',
        article_url TEXT DEFAULT NULL,
        status TEXT NOT NULL DEFAULT 'published',
        published_at TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
];

fn db_error(context: &str, e: sqlx::Error) -> Error {
    Error::Storage(format!("{}: {}", context, e))
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Storage(format!("invalid timestamp {:?}: {}", value, e)))
}

pub struct SqliteStorage {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Opens (creating if needed) the database file and runs migrations.
    pub async fn new_with_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| db_error("failed to open database", e))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| db_error(&format!("failed to run migration {}", i), e))?;
        }

        info!("Opened database: {}", db_path.display());
        Ok(Self {
            pool,
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn draft_from_row(row: &SqliteRow) -> Result<Draft> {
        let tags: String = row.get("tags");
        Ok(Draft {
            id: Some(row.get("id")),
            title: row.get("title"),
            body: row.get("body"),
            tags: serde_json::from_str(&tags)?,
            blog_type_id: row.get("blog_type_id"),
            hearing_data: row.get("hearing_data"),
            created_at: parse_timestamp(row.get("created_at"))?,
            updated_at: parse_timestamp(row.get("updated_at"))?,
        })
    }

    fn history_from_row(row: &SqliteRow) -> Result<HistoryRecord> {
        let status: String = row.get("status");
        Ok(HistoryRecord {
            id: Some(row.get("id")),
            title: row.get("title"),
            body_preview: row.get("body_preview"),
            blog_type_id: row.get("blog_type_id"),
            service_name: row.get("service_name"),
            article_url: row.get("article_url"),
            status: HistoryStatus::from_str(&status)?,
            published_at: parse_timestamp(row.get("published_at"))?,
            created_at: parse_timestamp(row.get("created_at"))?,
        })
    }
}

#[async_trait]
impl DraftStorage for SqliteStorage {
    async fn save_draft(&self, draft: &Draft) -> Result<Draft> {
        let tags = serde_json::to_string(&draft.tags)?;
        match draft.id {
            None => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO drafts
                    (title, body, tags, blog_type_id, hearing_data, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&draft.title)
                .bind(&draft.body)
                .bind(&tags)
                .bind(&draft.blog_type_id)
                .bind(&draft.hearing_data)
                .bind(format_timestamp(&draft.created_at))
                .bind(format_timestamp(&draft.updated_at))
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("failed to insert draft", e))?;

                let mut saved = draft.clone();
                saved.id = Some(result.last_insert_rowid());
                Ok(saved)
            }
            Some(id) => {
                let result = sqlx::query(
                    r#"
                    UPDATE drafts
                    SET title = ?, body = ?, tags = ?, blog_type_id = ?, hearing_data = ?, updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(&draft.title)
                .bind(&draft.body)
                .bind(&tags)
                .bind(&draft.blog_type_id)
                .bind(&draft.hearing_data)
                .bind(format_timestamp(&draft.updated_at))
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("failed to update draft", e))?;

                if result.rows_affected() == 0 {
                    return Err(Error::Storage(format!("draft {} not found", id)));
                }
                Ok(draft.clone())
            }
        }
    }

    async fn find_draft(&self, id: i64) -> Result<Option<Draft>> {
        let row = sqlx::query("SELECT * FROM drafts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("failed to load draft", e))?;
        row.as_ref().map(Self::draft_from_row).transpose()
    }

    async fn find_all_drafts(&self) -> Result<Vec<Draft>> {
        let rows = sqlx::query("SELECT * FROM drafts ORDER BY updated_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("failed to list drafts", e))?;
        rows.iter().map(Self::draft_from_row).collect()
    }

    async fn delete_draft(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM drafts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("failed to delete draft", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl HistoryStorage for SqliteStorage {
    async fn save_history(&self, record: &HistoryRecord) -> Result<HistoryRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO publish_history
            (title, body_preview, blog_type_id, service_name, article_url, status, published_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.title)
        .bind(&record.body_preview)
        .bind(&record.blog_type_id)
        .bind(&record.service_name)
        .bind(record.article_url.as_deref())
        .bind(record.status.as_str())
        .bind(format_timestamp(&record.published_at))
        .bind(format_timestamp(&record.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("failed to insert history", e))?;

        let mut saved = record.clone();
        saved.id = Some(result.last_insert_rowid());
        Ok(saved)
    }

    async fn find_history(&self, id: i64) -> Result<Option<HistoryRecord>> {
        let row = sqlx::query("SELECT * FROM publish_history WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("failed to load history", e))?;
        row.as_ref().map(Self::history_from_row).transpose()
    }

    async fn find_all_history(&self) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query("SELECT * FROM publish_history ORDER BY published_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("failed to list history", e))?;
        rows.iter().map(Self::history_from_row).collect()
    }

    async fn delete_history(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM publish_history WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("failed to delete history", e))?;
        Ok(result.rows_affected() > 0)
    }
}
