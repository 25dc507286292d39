//! Cached book audio repository

use crate::error::Result;
use crate::models::BookAsset;
use async_trait::async_trait;
use bytes::Bytes;
use sqlx::{query, query_as, SqlitePool};
use tracing::{debug, instrument};

/// Storage for whole-book audio payloads, keyed by book identifier.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Store a book, replacing any existing payload for the same identifier.
    async fn put(&self, book: &BookAsset) -> Result<()>;

    /// Fetch a cached book.
    ///
    /// # Returns
    /// - `Ok(Some(book))` if cached
    /// - `Ok(None)` if not cached
    async fn get(&self, filename: &str) -> Result<Option<BookAsset>>;

    /// Identifiers of every cached book, sorted.
    async fn keys(&self) -> Result<Vec<String>>;

    async fn contains(&self, filename: &str) -> Result<bool>;

    /// Remove a cached book.
    ///
    /// # Returns
    /// - `Ok(true)` if the book was removed
    /// - `Ok(false)` if it was not cached
    async fn delete(&self, filename: &str) -> Result<bool>;
}

/// SQLite implementation of [`BookRepository`]
pub struct SqliteBookRepository {
    pool: SqlitePool,
}

impl SqliteBookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepository for SqliteBookRepository {
    #[instrument(skip(self, book), fields(book = %book.filename, bytes = book.size()))]
    async fn put(&self, book: &BookAsset) -> Result<()> {
        query(
            r#"
            INSERT INTO books (filename, data) VALUES (?, ?)
            ON CONFLICT(filename) DO UPDATE SET data = excluded.data
            "#,
        )
        .bind(&book.filename)
        .bind(book.data.as_ref())
        .execute(&self.pool)
        .await?;

        debug!("Stored book");
        Ok(())
    }

    async fn get(&self, filename: &str) -> Result<Option<BookAsset>> {
        let row = query_as::<_, (String, Vec<u8>)>(
            "SELECT filename, data FROM books WHERE filename = ?",
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(filename, data)| BookAsset {
            filename,
            data: Bytes::from(data),
        }))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let rows = query_as::<_, (String,)>("SELECT filename FROM books ORDER BY filename")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(filename,)| filename).collect())
    }

    async fn contains(&self, filename: &str) -> Result<bool> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM books WHERE filename = ?")
            .bind(filename)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    #[instrument(skip(self))]
    async fn delete(&self, filename: &str) -> Result<bool> {
        let result = query("DELETE FROM books WHERE filename = ?")
            .bind(filename)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
