//! Core data types and reports for the Seiri reconciliation library.
//!
//! This module defines the fundamental data structures used throughout Seiri:
//! - Catalog records (`SeriesRecord`, `BookRecord`, `NewBook`)
//! - Observed filesystem state (`ObservedLibrary`, `ObservedBook`)
//! - Text extraction results (`PageText`, `TextProfile`)
//! - Cover resolution results (`CoverInfo`)
//! - Reconciliation reporting (`ScanOutcome`)
//! - Heuristic tuning (`BorderRatios`)

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A series as persisted by the catalog collaborator.
///
/// The `path` field is the on-disk folder name and the sole correlation key
/// between filesystem state and persisted state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub id: String,
    pub path: String,
    pub visible_name: String,
    pub sort_name: String,
    /// Count of non-missing books referencing this series.
    pub book_count: usize,
    /// Soft-delete flag: the folder is no longer observed on disk but the
    /// record is retained pending restoration or explicit admin deletion.
    pub missing: bool,
    pub created_date: DateTime<Utc>,
    pub last_modified_date: DateTime<Utc>,
}

/// A book (one volume/file) as persisted by the catalog collaborator.
///
/// `path` is `<series>/<book stem>` and is the sole correlation key; renaming
/// a file on disk is indistinguishable from delete+create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: String,
    pub path: String,
    /// Owning `SeriesRecord` id.
    pub serie: String,
    /// Denormalized series folder name, used to build static-file URLs.
    pub serie_path: String,
    pub visible_name: String,
    pub sort_name: String,
    /// Name of the folder holding the page images, relative to the series dir.
    pub images_folder: String,
    /// Thumbnail file name inside `images_folder`.
    pub thumbnail_path: String,
    /// Total page count (manga: image count of the images folder).
    pub pages: usize,
    /// Cumulative Japanese character counts: index `i` holds the running
    /// total through page `i`. Non-decreasing; last entry equals `characters`.
    pub page_chars: Vec<usize>,
    /// Grand total of matched Japanese characters.
    pub characters: usize,
    pub release_date: Option<DateTime<Utc>>,
    pub missing: bool,
    pub created_date: DateTime<Utc>,
    pub last_modified_date: DateTime<Utc>,
}

/// Insert-time fields for a newly observed book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBook {
    pub path: String,
    pub serie: String,
    pub serie_path: String,
    pub visible_name: String,
    pub sort_name: String,
    pub images_folder: String,
    pub thumbnail_path: String,
    pub pages: usize,
    pub page_chars: Vec<usize>,
    pub characters: usize,
}

/// One book observed on disk during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedBook {
    /// Parent series folder name.
    pub serie_path: String,
    /// File stem of the book's `.html` file.
    pub book_name: String,
    /// Absolute path of the book file.
    pub book_path: PathBuf,
}

impl ObservedBook {
    /// Correlation key: `<series>/<book>`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.serie_path, self.book_name)
    }
}

/// The filesystem's view of "what series and books currently exist".
#[derive(Debug, Clone, Default)]
pub struct ObservedLibrary {
    pub series_paths: HashSet<String>,
    pub books: Vec<ObservedBook>,
}

/// Extracted text of a single manga page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageText {
    /// Matched Japanese characters on this page (after border filtering).
    pub characters: usize,
    /// Raw paragraph texts, grouped by text box, for per-panel display.
    pub boxes: Vec<Vec<String>>,
}

/// Cumulative character-count profile of a whole book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextProfile {
    /// Grand total of matched characters.
    pub characters: usize,
    /// Running total through page (or chapter) `i`; one entry per page,
    /// including pages with zero text boxes.
    pub page_chars: Vec<usize>,
}

/// Result of resolving a manga book's image folder and thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverInfo {
    /// Folder name (URL-decoded) holding the page images.
    pub images_folder: String,
    /// First image-extension file in directory listing order.
    pub thumbnail: String,
    /// Count of all files in the images folder.
    pub total_images: usize,
}

/// Tunable geometric heuristic for "is this text box really page content".
///
/// Manga layouts place furigana and out-of-frame artifacts near the page
/// edges; boxes outside `[left_min, left_max] x [top_min, inf)` (as ratios of
/// the declared page dimensions) are excluded when border filtering is on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BorderRatios {
    pub left_min: f64,
    pub left_max: f64,
    pub top_min: f64,
}

impl Default for BorderRatios {
    fn default() -> Self {
        Self {
            left_min: 0.12,
            left_max: 0.85,
            top_min: 0.05,
        }
    }
}

/// Summary of one reconciliation cycle.
///
/// `changed` is true iff at least one create/restore/mark-missing mutation
/// was applied; skipped and deferred books do not count as changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOutcome {
    pub changed: bool,
    pub series_created: usize,
    pub series_restored: usize,
    pub series_marked_missing: usize,
    pub books_created: usize,
    pub books_restored: usize,
    pub books_marked_missing: usize,
    /// Books whose cover could not be resolved this cycle; retried next scan.
    pub books_skipped: usize,
    /// New books left for the next cycle by `max_new_books_per_cycle`.
    pub books_deferred: usize,
    /// The cycle was stopped cooperatively before processing every new book.
    pub cancelled: bool,
}

impl ScanOutcome {
    pub(crate) fn mutation_count(&self) -> usize {
        self.series_created
            + self.series_restored
            + self.series_marked_missing
            + self.books_created
            + self.books_restored
            + self.books_marked_missing
    }
}

/// Derives display names from an on-disk folder or file-stem name.
///
/// The visible name is the raw name; the sort name is its lowercase form.
/// Applied at create time only and never reset on restore.
pub fn display_names(name: &str) -> (String, String) {
    (name.to_string(), name.to_lowercase())
}
