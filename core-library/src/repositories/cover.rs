//! Cached cover image repository

use crate::error::Result;
use crate::models::CoverAsset;
use async_trait::async_trait;
use bytes::Bytes;
use sqlx::{query, query_as, SqlitePool};

/// Storage for cover images, keyed by book identifier.
#[async_trait]
pub trait CoverRepository: Send + Sync {
    /// Store a cover, replacing any existing image for the same book.
    async fn put(&self, cover: &CoverAsset) -> Result<()>;

    async fn get(&self, book: &str) -> Result<Option<CoverAsset>>;
}

/// SQLite implementation of [`CoverRepository`]
pub struct SqliteCoverRepository {
    pool: SqlitePool,
}

impl SqliteCoverRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CoverRepository for SqliteCoverRepository {
    async fn put(&self, cover: &CoverAsset) -> Result<()> {
        query(
            r#"
            INSERT INTO covers (book, data) VALUES (?, ?)
            ON CONFLICT(book) DO UPDATE SET data = excluded.data
            "#,
        )
        .bind(&cover.book)
        .bind(cover.data.as_ref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, book: &str) -> Result<Option<CoverAsset>> {
        let row = query_as::<_, (String, Vec<u8>)>("SELECT book, data FROM covers WHERE book = ?")
            .bind(book)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(book, data)| CoverAsset {
            book,
            data: Bytes::from(data),
        }))
    }
}
