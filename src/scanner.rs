//! Library filesystem scanning.
//!
//! Produces the filesystem's view of "what series and books currently exist"
//! under a library root laid out as:
//!
//! ```text
//! <library_root>/<series_folder>/<book_name>.html
//! <library_root>/<series_folder>/<images_folder>/<page images>
//! ```
//!
//! The series folder name and the book file stem are the identity keys the
//! reconciliation engine correlates against the catalog.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::try_join_all;
use tokio::fs::read_dir;
use tokio::spawn;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::types::{ObservedBook, ObservedLibrary};

/// Limits the number of concurrent series-directory listings
const MAX_CONCURRENT_DIRS: usize = 64;

/// Walks a library root and enumerates series folders and book files.
#[derive(Debug)]
pub struct Scanner<'a> {
    library_root: &'a Path,
}

impl<'a> Scanner<'a> {
    pub fn new(library_root: &'a Path) -> Self {
        Self { library_root }
    }

    /// Produces the observed library state.
    ///
    /// An unreadable root is fatal for the scan cycle and propagates to the
    /// caller. An unreadable series subdirectory is skipped with a warning
    /// and contributes zero books this cycle; only top-level disappearance
    /// triggers missing-marking downstream.
    pub async fn observe(&self) -> Result<ObservedLibrary> {
        let series_dirs = self.collect_series_dirs().await?;

        let series_paths: HashSet<String> = series_dirs
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .map(|s| s.to_string())
            .collect();

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_DIRS));
        let mut handles: Vec<JoinHandle<Result<Vec<ObservedBook>>>> = Vec::new();

        for series_dir in series_dirs {
            let semaphore = Arc::clone(&semaphore);
            handles.push(spawn(async move {
                let _permit = semaphore.acquire().await?;
                Ok(Self::collect_books(&series_dir).await)
            }));
        }

        let results = try_join_all(handles)
            .await
            .map_err(|e| Error::Other(format!("Failed to join series listing tasks: {}", e)))?;

        let mut books = Vec::new();
        for res in results {
            books.extend(res?);
        }

        Ok(ObservedLibrary {
            series_paths,
            books,
        })
    }

    /// Lists the immediate child directories of the library root. Dot-files
    /// and non-directory entries are ignored.
    async fn collect_series_dirs(&self) -> Result<Vec<PathBuf>> {
        let mut entries: Vec<PathBuf> = Vec::new();
        let mut paths = read_dir(self.library_root).await.map_err(|e| {
            log::error!(
                "library root {:?} is unreadable: {}",
                self.library_root,
                e
            );
            Error::Io(e)
        })?;

        while let Some(entry) = paths.next_entry().await? {
            let path = entry.path();
            if is_hidden(&path) {
                continue;
            }
            if path.is_dir() {
                entries.push(path);
            }
        }

        Ok(entries)
    }

    /// Lists the `.html` books inside one series directory. Returns an empty
    /// list when the directory cannot be read.
    async fn collect_books(series_dir: &Path) -> Vec<ObservedBook> {
        let serie_path = match series_dir.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => return Vec::new(),
        };

        let mut paths = match read_dir(series_dir).await {
            Ok(paths) => paths,
            Err(e) => {
                log::warn!(
                    "series directory {:?} is unreadable, treating as empty this cycle: {}",
                    series_dir,
                    e
                );
                return Vec::new();
            }
        };

        let mut books = Vec::new();
        loop {
            let entry = match paths.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    log::warn!("failed to read entry in {:?}: {}", series_dir, e);
                    break;
                }
            };
            let path = entry.path();
            if is_hidden(&path) || path.is_dir() {
                continue;
            }
            let is_html = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("html"))
                .unwrap_or(false);
            if !is_html {
                continue;
            }
            if let Some(book_name) = path.file_stem().and_then(|s| s.to_str()) {
                books.push(ObservedBook {
                    serie_path: serie_path.clone(),
                    book_name: book_name.to_string(),
                    book_path: path,
                });
            }
        }

        books
    }
}

pub(crate) fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}
