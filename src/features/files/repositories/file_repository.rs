use chrono::SecondsFormat;
use sqlx::SqlitePool;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{FileRecord, TagMutation};
use crate::shared::tags;

/// Record store for file metadata rows.
///
/// Owns the `files` table. Only `tags` is ever updated after insert.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new record. An id collision is reported as a conflict and
    /// never overwrites the existing row.
    pub async fn create(&self, record: &FileRecord) -> Result<FileRecord> {
        sqlx::query(
            r#"
            INSERT INTO files (id, original_name, storage_name, extension, size, mime_type, created_at, tags)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.original_name)
        .bind(&record.storage_name)
        .bind(&record.extension)
        .bind(record.size)
        .bind(&record.mime_type)
        // Fixed-width UTC text keeps lexical order equal to chronological order
        .bind(record.created_at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .bind(&record.tags)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(format!("File id already exists: {}", record.id))
            }
            other => AppError::Database(other),
        })?;

        debug!("File record inserted: id={}", record.id);
        Ok(record.clone())
    }

    /// All records, newest first
    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, original_name, storage_name, extension, size, mime_type, created_at, tags
            FROM files
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Records carrying `tag`, newest first. `tag` must already be normalized.
    pub async fn list_by_tag(&self, tag: &str) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, original_name, storage_name, extension, size, mime_type, created_at, tags
            FROM files
            WHERE instr(',' || tags || ',', ',' || ? || ',') > 0
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(tag)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn get(&self, id: &str) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, original_name, storage_name, extension, size, mime_type, created_at, tags
            FROM files
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Normalize, serialize and store `tags`, returning the refreshed record.
    ///
    /// Concurrent updates to the same id are last-write-wins.
    pub async fn update_tags(&self, id: &str, new_tags: &[String]) -> Result<FileRecord> {
        let serialized = tags::serialize(&tags::normalize_list(new_tags));

        let result = sqlx::query("UPDATE files SET tags = ? WHERE id = ?")
            .bind(&serialized)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("File not found: {}", id)));
        }

        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File not found: {}", id)))
    }

    /// Apply one tag mutation to several records atomically.
    ///
    /// If any id is missing nothing is changed and the missing ids are
    /// reported. Records are returned in the order of `ids`.
    pub async fn mutate_tags_many(
        &self,
        ids: &[String],
        mutation: &TagMutation,
    ) -> Result<Vec<FileRecord>> {
        let mut tx = self.pool.begin().await?;

        let mut records = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();

        for id in ids {
            let record = sqlx::query_as::<_, FileRecord>(
                r#"
                SELECT id, original_name, storage_name, extension, size, mime_type, created_at, tags
                FROM files
                WHERE id = ?
                "#,
            )
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

            match record {
                Some(record) => records.push(record),
                None => missing.push(id.clone()),
            }
        }

        if !missing.is_empty() {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!(
                "Files not found: {}",
                missing.join(", ")
            )));
        }

        for record in records.iter_mut() {
            let serialized = tags::serialize(&mutation.apply(&record.tag_list()));

            sqlx::query("UPDATE files SET tags = ? WHERE id = ?")
                .bind(&serialized)
                .bind(&record.id)
                .execute(&mut *tx)
                .await?;

            record.tags = serialized;
        }

        tx.commit().await?;

        debug!("Bulk tag update committed for {} files", records.len());
        Ok(records)
    }

    /// Remove a row. Returns whether a row was present.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
