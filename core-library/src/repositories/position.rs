//! Playback position repository

use crate::error::{LibraryError, Result};
use crate::models::PositionRecord;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};
use tracing::{debug, instrument};

/// Storage for position records, indexed by book.
///
/// Records are only ever removed in bulk by [`replace_for_book`], when a sync
/// returns the server's canonical set.
///
/// [`replace_for_book`]: PositionRepository::replace_for_book
#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Insert a record, or update it in place when `local_id` is set.
    ///
    /// # Returns
    /// The record's local identifier.
    async fn upsert(&self, record: &PositionRecord) -> Result<i64>;

    /// All records for a book, oldest first.
    async fn find_by_book(&self, book: &str) -> Result<Vec<PositionRecord>>;

    /// Most recent record for a book by timestamp.
    async fn latest_for_book(&self, book: &str) -> Result<Option<PositionRecord>>;

    /// Atomically replace every record of `book` with `records`.
    ///
    /// Local identifiers on the input are ignored; the stored records are
    /// returned with their new identifiers, oldest first.
    ///
    /// # Errors
    /// Returns `InvalidInput` if a record belongs to another book.
    async fn replace_for_book(
        &self,
        book: &str,
        records: &[PositionRecord],
    ) -> Result<Vec<PositionRecord>>;
}

pub(crate) fn ensure_same_book(book: &str, records: &[PositionRecord]) -> Result<()> {
    match records.iter().find(|r| r.book != book) {
        Some(other) => Err(LibraryError::InvalidInput {
            field: "book".to_string(),
            message: format!(
                "record for '{}' cannot replace positions of '{}'",
                other.book, book
            ),
        }),
        None => Ok(()),
    }
}

type PositionRow = (i64, Option<i64>, String, f64, i64, Option<String>);

fn from_row(row: PositionRow) -> PositionRecord {
    let (id, sync_id, book, position, timestamp, client_id) = row;
    PositionRecord {
        local_id: Some(id),
        sync_id,
        book,
        position,
        timestamp,
        client_id,
    }
}

/// SQLite implementation of [`PositionRepository`]
pub struct SqlitePositionRepository {
    pool: SqlitePool,
}

impl SqlitePositionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PositionRepository for SqlitePositionRepository {
    #[instrument(skip(self, record), fields(book = %record.book, local_id = ?record.local_id))]
    async fn upsert(&self, record: &PositionRecord) -> Result<i64> {
        let result = query(
            r#"
            INSERT INTO positions (id, sync_id, book, position, timestamp, client_id)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                sync_id = excluded.sync_id,
                book = excluded.book,
                position = excluded.position,
                timestamp = excluded.timestamp,
                client_id = excluded.client_id
            "#,
        )
        .bind(record.local_id)
        .bind(record.sync_id)
        .bind(&record.book)
        .bind(record.position)
        .bind(record.timestamp)
        .bind(&record.client_id)
        .execute(&self.pool)
        .await?;

        let id = record.local_id.unwrap_or_else(|| result.last_insert_rowid());
        debug!(id, "Stored position");
        Ok(id)
    }

    async fn find_by_book(&self, book: &str) -> Result<Vec<PositionRecord>> {
        let rows = query_as::<_, PositionRow>(
            r#"
            SELECT id, sync_id, book, position, timestamp, client_id
            FROM positions WHERE book = ?
            ORDER BY timestamp, id
            "#,
        )
        .bind(book)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(from_row).collect())
    }

    async fn latest_for_book(&self, book: &str) -> Result<Option<PositionRecord>> {
        let row = query_as::<_, PositionRow>(
            r#"
            SELECT id, sync_id, book, position, timestamp, client_id
            FROM positions WHERE book = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(book)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(from_row))
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn replace_for_book(
        &self,
        book: &str,
        records: &[PositionRecord],
    ) -> Result<Vec<PositionRecord>> {
        ensure_same_book(book, records)?;

        let mut tx = self.pool.begin().await?;

        let removed = query("DELETE FROM positions WHERE book = ?")
            .bind(book)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            let result = query(
                r#"
                INSERT INTO positions (sync_id, book, position, timestamp, client_id)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(record.sync_id)
            .bind(book)
            .bind(record.position.max(0.0))
            .bind(record.timestamp)
            .bind(&record.client_id)
            .execute(&mut *tx)
            .await?;

            stored.push(PositionRecord {
                local_id: Some(result.last_insert_rowid()),
                position: record.position.max(0.0),
                ..record.clone()
            });
        }

        tx.commit().await?;

        stored.sort_by_key(|r| (r.timestamp, r.local_id));
        debug!(removed, inserted = stored.len(), "Replaced positions");
        Ok(stored)
    }
}
