//! Seiri - Library Reconciliation and Text Extraction
//!
//! This crate implements the library reconciliation core of a self-hosted
//! manga/light-novel reader: a periodic (or on-demand) filesystem scan that
//! diffs an on-disk folder tree against a catalog to detect added, removed
//! and restored series and books, resolves each new book's cover-image
//! folder, and counts Japanese-script characters per page with a geometric
//! "is this text box really page content" heuristic.
//!
//! The surrounding server (HTTP routing, authentication, the document
//! database and the WebSocket push channel) stays outside this crate and is
//! reached through the [`Catalog`](catalog::Catalog) and
//! [`Notifier`](notify::Notifier) traits.
//!
//! # Getting Started
//!
//! Configure the engine through `SeiriConfig`'s builder and run a cycle:
//!
//! ```rust,no_run
//! use seiri::prelude::*;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> seiri::error::Result<()> {
//!     let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
//!
//!     let config = SeiriConfig::builder()
//!         .library_root(PathBuf::from("/srv/library"))
//!         .catalog(catalog)
//!         .apply_borders(true)
//!         .max_new_books_per_cycle(200usize)
//!         .build()?;
//!
//!     let outcome = config.run_reconciliation().await?;
//!     if outcome.changed {
//!         println!(
//!             "library changed: +{} books, {} series marked missing",
//!             outcome.books_created, outcome.series_marked_missing
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Reconciliation is idempotent: running it twice with no filesystem change
//! leaves the catalog untouched and reports `changed == false`.

pub mod analyzer;
pub mod catalog;
pub mod cover;
pub mod error;
pub mod notify;
pub mod scanner;
pub mod seiri;
pub mod types;

// Publicly expose the main `SeiriConfig` struct and its builder
pub use crate::seiri::{SeiriConfig, SeiriConfigBuilder};

// Re-export error and core types for direct access
pub use types::{
    BookRecord, BorderRatios, CoverInfo, NewBook, ObservedBook, ObservedLibrary, PageText,
    ScanOutcome, SeriesRecord, TextProfile,
};

/// Prelude module for convenient imports.
///
/// Re-exports the most commonly used types and traits, allowing a single
/// `use seiri::prelude::*;` statement.
pub mod prelude {
    pub use super::{
        error, BookRecord, BorderRatios, CoverInfo, NewBook, ObservedBook, ObservedLibrary,
        PageText, ScanOutcome, SeiriConfig, SeiriConfigBuilder, SeriesRecord, TextProfile,
    };
    pub use crate::analyzer::{analyze_book_file, analyze_book_html};
    pub use crate::catalog::{Catalog, MemoryCatalog};
    pub use crate::cover::resolve_manga_cover;
    pub use crate::notify::{LogNotifier, Notifier};
    pub use crate::scanner::Scanner;
    pub use std::path::{Path, PathBuf};
    pub use std::sync::Arc;
}
