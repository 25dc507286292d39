//! In-memory repositories
//!
//! Used when the durable store cannot be opened (storage permission denied,
//! disk full): the session keeps working, nothing survives a restart.

use crate::error::Result;
use crate::models::{BookAsset, CoverAsset, PositionRecord};
use crate::repositories::position::ensure_same_book;
use crate::repositories::{BookRepository, CoverRepository, PositionRepository};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

/// Volatile implementation of every local store repository.
#[derive(Default)]
pub struct MemoryStore {
    books: Mutex<BTreeMap<String, BookAsset>>,
    covers: Mutex<HashMap<String, CoverAsset>>,
    positions: Mutex<PositionTable>,
}

#[derive(Default)]
struct PositionTable {
    next_id: i64,
    rows: BTreeMap<i64, PositionRecord>,
}

impl PositionTable {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn for_book(&self, book: &str) -> Vec<PositionRecord> {
        let mut records: Vec<_> = self
            .rows
            .values()
            .filter(|r| r.book == book)
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.timestamp, r.local_id));
        records
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn put(&self, book: &BookAsset) -> Result<()> {
        self.books.lock().insert(book.filename.clone(), book.clone());
        Ok(())
    }

    async fn get(&self, filename: &str) -> Result<Option<BookAsset>> {
        Ok(self.books.lock().get(filename).cloned())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.books.lock().keys().cloned().collect())
    }

    async fn contains(&self, filename: &str) -> Result<bool> {
        Ok(self.books.lock().contains_key(filename))
    }

    async fn delete(&self, filename: &str) -> Result<bool> {
        Ok(self.books.lock().remove(filename).is_some())
    }
}

#[async_trait]
impl CoverRepository for MemoryStore {
    async fn put(&self, cover: &CoverAsset) -> Result<()> {
        self.covers.lock().insert(cover.book.clone(), cover.clone());
        Ok(())
    }

    async fn get(&self, book: &str) -> Result<Option<CoverAsset>> {
        Ok(self.covers.lock().get(book).cloned())
    }
}

#[async_trait]
impl PositionRepository for MemoryStore {
    async fn upsert(&self, record: &PositionRecord) -> Result<i64> {
        let mut table = self.positions.lock();
        let id = match record.local_id {
            Some(id) => {
                table.next_id = table.next_id.max(id);
                id
            }
            None => table.allocate(),
        };
        table.rows.insert(
            id,
            PositionRecord {
                local_id: Some(id),
                ..record.clone()
            },
        );
        Ok(id)
    }

    async fn find_by_book(&self, book: &str) -> Result<Vec<PositionRecord>> {
        Ok(self.positions.lock().for_book(book))
    }

    async fn latest_for_book(&self, book: &str) -> Result<Option<PositionRecord>> {
        Ok(self.positions.lock().for_book(book).pop())
    }

    async fn replace_for_book(
        &self,
        book: &str,
        records: &[PositionRecord],
    ) -> Result<Vec<PositionRecord>> {
        ensure_same_book(book, records)?;

        let mut table = self.positions.lock();
        table.rows.retain(|_, r| r.book != book);
        for record in records {
            let id = table.allocate();
            table.rows.insert(
                id,
                PositionRecord {
                    local_id: Some(id),
                    position: record.position.max(0.0),
                    ..record.clone()
                },
            );
        }
        Ok(table.for_book(book))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_books_round_trip() {
        let store = MemoryStore::new();
        BookRepository::put(&store, &BookAsset::new("b", vec![1u8]))
            .await
            .unwrap();
        BookRepository::put(&store, &BookAsset::new("a", vec![2u8]))
            .await
            .unwrap();

        assert_eq!(store.keys().await.unwrap(), vec!["a", "b"]);
        assert!(BookRepository::delete(&store, "a").await.unwrap());
        assert!(BookRepository::get(&store, "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_positions_behave_like_sqlite() {
        let store = MemoryStore::new();
        let mut current = PositionRecord::new("a", 5.0, 10);
        current.local_id = Some(store.upsert(&current).await.unwrap());
        current.position = 8.0;
        store.upsert(&current).await.unwrap();
        store.upsert(&PositionRecord::new("a", 1.0, 1)).await.unwrap();
        store.upsert(&PositionRecord::new("b", 1.0, 1)).await.unwrap();

        let records = store.find_by_book("a").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], current);
        assert_eq!(store.latest_for_book("a").await.unwrap(), Some(current));

        let replaced = store
            .replace_for_book("a", &[PositionRecord::new("a", 3.0, 3)])
            .await
            .unwrap();
        assert_eq!(replaced.len(), 1);
        assert_eq!(store.find_by_book("a").await.unwrap(), replaced);
        assert_eq!(store.find_by_book("b").await.unwrap().len(), 1);
    }
}
