//! Catalog collaborator boundary.
//!
//! The catalog owns the storage lifecycle of [`SeriesRecord`] and
//! [`BookRecord`]; the reconciliation engine only reads and writes through
//! the [`Catalog`] trait and relies on the implementation's own per-record
//! atomic upsert semantics. A reference [`MemoryCatalog`] is provided for
//! tests and for embedders that do not need a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::types::{BookRecord, NewBook, SeriesRecord};

/// Persistence boundary consumed by the reconciliation engine.
///
/// From this crate's perspective the catalog is append/update-only: no method
/// here deletes a record, and no error in the engine may cause one to be
/// deleted. Hard deletion is an administrative action outside this scope.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All series whose `missing` flag is clear.
    async fn find_non_missing_series(&self) -> Result<Vec<SeriesRecord>>;

    /// All series currently soft-deleted.
    async fn find_missing_series(&self) -> Result<Vec<SeriesRecord>>;

    /// All books whose `missing` flag is clear.
    async fn find_non_missing_books(&self) -> Result<Vec<BookRecord>>;

    /// All books currently soft-deleted.
    async fn find_missing_books(&self) -> Result<Vec<BookRecord>>;

    /// Restores the series if it exists as missing, creates it if absent,
    /// and returns the resulting record. Display fields are only written on
    /// creation, never reset on restore.
    async fn upsert_series(
        &self,
        path: &str,
        visible_name: &str,
        sort_name: &str,
    ) -> Result<SeriesRecord>;

    /// Sets the series' `missing` flag. The record is retained.
    async fn mark_series_missing(&self, path: &str) -> Result<()>;

    /// Inserts a genuinely new book. A duplicate `path` is surfaced as
    /// [`Error::Conflict`]; the caller must not attempt to resolve it.
    async fn insert_book(&self, book: NewBook) -> Result<BookRecord>;

    /// Clears the book's `missing` flag without touching its content fields.
    async fn restore_book(&self, path: &str) -> Result<()>;

    /// Sets the book's `missing` flag. The record is retained.
    async fn mark_book_missing(&self, path: &str) -> Result<()>;

    /// Increments the owning series' non-missing book count.
    async fn increment_series_book_count(&self, series_id: &str) -> Result<()>;

    /// Looks up a single book by its path key.
    async fn get_book(&self, path: &str) -> Result<Option<BookRecord>>;

    /// Overwrites a book's character-count profile without touching its
    /// presence state. Repair path for heuristic misfires.
    async fn update_book_text(
        &self,
        path: &str,
        page_chars: Vec<usize>,
        characters: usize,
    ) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryCatalogInner {
    series: HashMap<String, SeriesRecord>,
    books: HashMap<String, BookRecord>,
}

/// In-memory [`Catalog`] implementation keyed by path.
///
/// Maintains the `book_count` invariant (count of non-missing books per
/// series) across insert, restore and mark-missing.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: RwLock<MemoryCatalogInner>,
    id_seq: AtomicU64,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.id_seq.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", prefix, n)
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_non_missing_series(&self) -> Result<Vec<SeriesRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .series
            .values()
            .filter(|s| !s.missing)
            .cloned()
            .collect())
    }

    async fn find_missing_series(&self) -> Result<Vec<SeriesRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .series
            .values()
            .filter(|s| s.missing)
            .cloned()
            .collect())
    }

    async fn find_non_missing_books(&self) -> Result<Vec<BookRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .books
            .values()
            .filter(|b| !b.missing)
            .cloned()
            .collect())
    }

    async fn find_missing_books(&self) -> Result<Vec<BookRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .books
            .values()
            .filter(|b| b.missing)
            .cloned()
            .collect())
    }

    async fn upsert_series(
        &self,
        path: &str,
        visible_name: &str,
        sort_name: &str,
    ) -> Result<SeriesRecord> {
        let mut inner = self.inner.write().await;
        if let Some(series) = inner.series.get_mut(path) {
            if series.missing {
                series.missing = false;
                series.last_modified_date = Utc::now();
            }
            return Ok(series.clone());
        }
        let now = Utc::now();
        let record = SeriesRecord {
            id: self.next_id("series"),
            path: path.to_string(),
            visible_name: visible_name.to_string(),
            sort_name: sort_name.to_string(),
            book_count: 0,
            missing: false,
            created_date: now,
            last_modified_date: now,
        };
        inner.series.insert(path.to_string(), record.clone());
        Ok(record)
    }

    async fn mark_series_missing(&self, path: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let series = inner
            .series
            .get_mut(path)
            .ok_or_else(|| Error::NotFound(format!("series '{}'", path)))?;
        series.missing = true;
        series.last_modified_date = Utc::now();
        Ok(())
    }

    async fn insert_book(&self, book: NewBook) -> Result<BookRecord> {
        let mut inner = self.inner.write().await;
        if inner.books.contains_key(&book.path) {
            return Err(Error::Conflict(format!(
                "book path '{}' already exists",
                book.path
            )));
        }
        let now = Utc::now();
        let record = BookRecord {
            id: self.next_id("book"),
            path: book.path.clone(),
            serie: book.serie,
            serie_path: book.serie_path,
            visible_name: book.visible_name,
            sort_name: book.sort_name,
            images_folder: book.images_folder,
            thumbnail_path: book.thumbnail_path,
            pages: book.pages,
            page_chars: book.page_chars,
            characters: book.characters,
            release_date: None,
            missing: false,
            created_date: now,
            last_modified_date: now,
        };
        inner.books.insert(book.path, record.clone());
        Ok(record)
    }

    async fn restore_book(&self, path: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let serie_id = {
            let book = inner
                .books
                .get_mut(path)
                .ok_or_else(|| Error::NotFound(format!("book '{}'", path)))?;
            if !book.missing {
                return Ok(());
            }
            book.missing = false;
            book.last_modified_date = Utc::now();
            book.serie.clone()
        };
        if let Some(series) = inner.series.values_mut().find(|s| s.id == serie_id) {
            series.book_count += 1;
        }
        Ok(())
    }

    async fn mark_book_missing(&self, path: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let serie_id = {
            let book = inner
                .books
                .get_mut(path)
                .ok_or_else(|| Error::NotFound(format!("book '{}'", path)))?;
            if book.missing {
                return Ok(());
            }
            book.missing = true;
            book.last_modified_date = Utc::now();
            book.serie.clone()
        };
        if let Some(series) = inner.series.values_mut().find(|s| s.id == serie_id) {
            series.book_count = series.book_count.saturating_sub(1);
        }
        Ok(())
    }

    async fn increment_series_book_count(&self, series_id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let series = inner
            .series
            .values_mut()
            .find(|s| s.id == series_id)
            .ok_or_else(|| Error::NotFound(format!("series id '{}'", series_id)))?;
        series.book_count += 1;
        series.last_modified_date = Utc::now();
        Ok(())
    }

    async fn get_book(&self, path: &str) -> Result<Option<BookRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.books.get(path).cloned())
    }

    async fn update_book_text(
        &self,
        path: &str,
        page_chars: Vec<usize>,
        characters: usize,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let book = inner
            .books
            .get_mut(path)
            .ok_or_else(|| Error::NotFound(format!("book '{}'", path)))?;
        book.page_chars = page_chars;
        book.characters = characters;
        book.last_modified_date = Utc::now();
        Ok(())
    }
}
