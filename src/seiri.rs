use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};

use crate::analyzer;
use crate::catalog::Catalog;
use crate::cover;
use crate::error::{Error, Result};
use crate::notify::{LogNotifier, Notifier};
use crate::scanner::Scanner;
use crate::types::{display_names, BorderRatios, NewBook, ObservedBook, ScanOutcome, TextProfile};

/// The main Seiri reconciliation configuration, built declaratively using the
/// builder pattern.
///
/// A configured instance is the entry point to the engine:
///
/// - [`run_reconciliation`](SeiriConfig::run_reconciliation): one full scan
///   cycle that diffs the on-disk library against the catalog and applies
///   the minimal set of mutations
/// - [`recalculate_characters`](SeiriConfig::recalculate_characters):
///   re-run text analysis for a single existing book
/// - [`request_cancel`](SeiriConfig::request_cancel): cooperatively stop a
///   running cycle between per-book iterations
///
/// ## Builder pattern
///
/// ```rust,no_run
/// # use seiri::prelude::*;
/// # use std::path::PathBuf;
/// # use std::sync::Arc;
/// let catalog: Arc<dyn Catalog> = Arc::new(MemoryCatalog::new());
/// let config = SeiriConfig::builder()
///     .library_root(PathBuf::from("/srv/library"))
///     .catalog(catalog)
///     .apply_borders(true)
///     .build()
///     .expect("Invalid configuration");
/// ```
#[derive(Clone, derive_builder::Builder)]
#[builder(setter(into, strip_option), build_fn(validate = "Self::validate"))]
pub struct SeiriConfig {
    /// Root directory of the on-disk library:
    /// `<library_root>/<series>/<book>.html`.
    pub library_root: PathBuf,

    /// Whether the geometric border heuristic filters text boxes during
    /// character counting. Unfiltered mode is used for simple total counts.
    #[builder(default = "true")]
    pub apply_borders: bool,

    /// Border heuristic ratios; tunable per library instance.
    #[builder(default)]
    pub border_ratios: BorderRatios,

    /// Cap on newly processed books per cycle. The remainder is deferred to
    /// the next cycle so one slow batch cannot stall the schedule.
    #[builder(default)]
    pub max_new_books_per_cycle: Option<usize>,

    /// Persistence collaborator owning the series/book records.
    pub catalog: Arc<dyn Catalog>,

    /// Push-notification collaborator, fired at most once per cycle.
    #[builder(default = "Arc::new(LogNotifier) as Arc<dyn Notifier>")]
    pub notifier: Arc<dyn Notifier>,

    // At most one reconciliation cycle may be in flight per instance.
    #[builder(setter(skip), default)]
    scan_lock: Arc<Mutex<()>>,

    // Cooperative cancellation, checked between per-book iterations.
    #[builder(setter(skip), default)]
    cancel_flag: Arc<AtomicBool>,
}

impl std::fmt::Debug for SeiriConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeiriConfig")
            .field("library_root", &self.library_root)
            .field("apply_borders", &self.apply_borders)
            .field("border_ratios", &self.border_ratios)
            .field("max_new_books_per_cycle", &self.max_new_books_per_cycle)
            .field("catalog", &"Arc<dyn Catalog>")
            .field("notifier", &"Arc<dyn Notifier>")
            .finish()
    }
}

impl SeiriConfig {
    /// Creates a new builder for configuring `SeiriConfig`.
    pub fn builder() -> SeiriConfigBuilder {
        SeiriConfigBuilder::default()
    }

    /// Requests cooperative cancellation of the in-flight cycle. Already
    /// applied mutations are kept; reconciliation is idempotent and
    /// self-heals on the next cycle.
    pub fn request_cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    /// Runs one full reconciliation cycle.
    ///
    /// Takes one consistent snapshot of observed (filesystem) and persisted
    /// (catalog) state, reconciles series first, then books, and fires the
    /// notifier once iff anything changed. Every catalog write is awaited
    /// before the outcome is reported.
    ///
    /// # Errors
    ///
    /// [`Error::ScanInProgress`] when a cycle is already running on this
    /// instance; an unreadable library root aborts the cycle with the
    /// catalog untouched.
    pub async fn run_reconciliation(&self) -> Result<ScanOutcome> {
        let _guard = self
            .scan_lock
            .try_lock()
            .map_err(|_| Error::ScanInProgress)?;
        self.cancel_flag.store(false, Ordering::Relaxed);

        log::info!("starting reconciliation of {:?}", self.library_root);

        // Single snapshot; decisions are never recomputed mid-cycle.
        let observed = Scanner::new(&self.library_root).observe().await?;
        let active_series = self.catalog.find_non_missing_series().await?;
        let missing_series = self.catalog.find_missing_series().await?;
        let active_books = self.catalog.find_non_missing_books().await?;
        let missing_books = self.catalog.find_missing_books().await?;

        let mut outcome = ScanOutcome::default();

        // --- Series first: a book's creation needs its owning series id. ---
        let mut series_ids: HashMap<String, String> = active_series
            .iter()
            .map(|s| (s.path.clone(), s.id.clone()))
            .collect();
        let active_series_paths: HashSet<&str> =
            active_series.iter().map(|s| s.path.as_str()).collect();
        let missing_series_paths: HashSet<&str> =
            missing_series.iter().map(|s| s.path.as_str()).collect();

        let mut observed_series: Vec<&String> = observed.series_paths.iter().collect();
        observed_series.sort();
        for path in observed_series {
            if active_series_paths.contains(path.as_str()) {
                continue;
            }
            let (visible_name, sort_name) = display_names(path);
            let record = self
                .catalog
                .upsert_series(path, &visible_name, &sort_name)
                .await?;
            if missing_series_paths.contains(path.as_str()) {
                log::info!("restored series '{}'", path);
                outcome.series_restored += 1;
            } else {
                log::info!("created series '{}'", path);
                outcome.series_created += 1;
            }
            series_ids.insert(path.clone(), record.id);
        }

        for series in &active_series {
            if !observed.series_paths.contains(&series.path) {
                log::info!("series '{}' disappeared, marking missing", series.path);
                self.catalog.mark_series_missing(&series.path).await?;
                outcome.series_marked_missing += 1;
            }
        }

        // --- Books second, keyed by `<series>/<book>` exactly as series
        // are keyed by path. ---
        let active_book_paths: HashSet<&str> =
            active_books.iter().map(|b| b.path.as_str()).collect();
        let missing_book_paths: HashSet<&str> =
            missing_books.iter().map(|b| b.path.as_str()).collect();
        let observed_book_keys: HashSet<String> =
            observed.books.iter().map(|b| b.key()).collect();

        let mut new_books: Vec<ObservedBook> = Vec::new();
        for book in &observed.books {
            let key = book.key();
            if active_book_paths.contains(key.as_str()) {
                continue;
            }
            if missing_book_paths.contains(key.as_str()) {
                log::info!("restored book '{}'", key);
                self.catalog.restore_book(&key).await?;
                outcome.books_restored += 1;
            } else {
                new_books.push(book.clone());
            }
        }

        for book in &active_books {
            if !observed_book_keys.contains(&book.path) {
                log::info!("book '{}' disappeared, marking missing", book.path);
                self.catalog.mark_book_missing(&book.path).await?;
                outcome.books_marked_missing += 1;
            }
        }

        self.process_new_books(new_books, &series_ids, &mut outcome)
            .await?;

        outcome.changed = outcome.mutation_count() > 0;
        log::info!(
            "reconciliation finished: changed={} series(+{}/~{}/-{}) books(+{}/~{}/-{}) skipped={} deferred={}{}",
            outcome.changed,
            outcome.series_created,
            outcome.series_restored,
            outcome.series_marked_missing,
            outcome.books_created,
            outcome.books_restored,
            outcome.books_marked_missing,
            outcome.books_skipped,
            outcome.books_deferred,
            if outcome.cancelled { " (cancelled)" } else { "" },
        );

        if outcome.changed {
            self.notifier.notify_library_changed().await;
        }

        Ok(outcome)
    }

    /// Re-runs text analysis for one existing book, overwriting its
    /// `page_chars`/`characters` without touching presence state. Manual
    /// repair path for heuristic misfires.
    pub async fn recalculate_characters(
        &self,
        book_path: &str,
        apply_borders: bool,
    ) -> Result<()> {
        let book = self
            .catalog
            .get_book(book_path)
            .await?
            .ok_or_else(|| Error::NotFound(format!("book '{}'", book_path)))?;

        let file = self.locate_book_file(&book.path).await?;
        let profile = analyzer::analyze_book_file(&file, apply_borders, &self.border_ratios).await?;
        self.catalog
            .update_book_text(&book.path, profile.page_chars, profile.characters)
            .await?;
        log::info!(
            "recalculated characters for '{}' (apply_borders={})",
            book.path,
            apply_borders
        );
        Ok(())
    }

    /// Maps a catalog path key back to the on-disk file (manga `.html`,
    /// novel `.epub`).
    async fn locate_book_file(&self, path_key: &str) -> Result<PathBuf> {
        for extension in ["html", "epub"] {
            let candidate = self
                .library_root
                .join(format!("{}.{}", path_key, extension));
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Ok(candidate);
            }
        }
        Err(Error::NotFound(format!(
            "no file for book '{}' under {:?}",
            path_key, self.library_root
        )))
    }

    /// Cover resolution and text analysis for genuinely new books, with
    /// bounded concurrency. Extraction is file-I/O bound and runs in
    /// parallel; catalog writes are applied afterwards and every one is
    /// awaited before the cycle reports.
    async fn process_new_books(
        &self,
        mut new_books: Vec<ObservedBook>,
        series_ids: &HashMap<String, String>,
        outcome: &mut ScanOutcome,
    ) -> Result<()> {
        new_books.sort_by(|a, b| a.key().cmp(&b.key()));

        if let Some(cap) = self.max_new_books_per_cycle {
            if new_books.len() > cap {
                outcome.books_deferred = new_books.len() - cap;
                log::info!(
                    "deferring {} new books to the next cycle (cap {})",
                    outcome.books_deferred,
                    cap
                );
                new_books.truncate(cap);
            }
        }

        let semaphore = Arc::new(Semaphore::new(num_cpus::get().min(8)));
        let mut handles = Vec::new();

        for book in new_books {
            if self.cancel_flag.load(Ordering::Relaxed) {
                log::warn!("cancellation requested, stopping before '{}'", book.key());
                outcome.cancelled = true;
                break;
            }
            let semaphore = Arc::clone(&semaphore);
            let apply_borders = self.apply_borders;
            let ratios = self.border_ratios;
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await?;
                let extracted = extract_new_book(&book, apply_borders, &ratios).await?;
                Result::Ok((book, extracted))
            }));
        }

        let results = futures::future::try_join_all(handles)
            .await
            .map_err(|e| Error::Other(format!("Failed to join book processing tasks: {}", e)))?;

        for res in results {
            let (book, extracted) = res?;
            let (cover, profile) = match extracted {
                Some(pair) => pair,
                None => {
                    outcome.books_skipped += 1;
                    continue;
                }
            };
            let serie_id = match series_ids.get(&book.serie_path) {
                Some(id) => id.clone(),
                None => {
                    // Series listing failed mid-cycle; the book is retried
                    // next scan.
                    log::warn!("no series id for '{}', skipping", book.serie_path);
                    outcome.books_skipped += 1;
                    continue;
                }
            };

            let (visible_name, sort_name) = display_names(&book.book_name);
            let record = NewBook {
                path: book.key(),
                serie: serie_id.clone(),
                serie_path: book.serie_path.clone(),
                visible_name,
                sort_name,
                images_folder: cover.images_folder,
                thumbnail_path: cover.thumbnail,
                pages: cover.total_images,
                page_chars: profile.page_chars,
                characters: profile.characters,
            };
            self.catalog.insert_book(record).await?;
            self.catalog.increment_series_book_count(&serie_id).await?;
            log::info!("created book '{}'", book.key());
            outcome.books_created += 1;
        }

        Ok(())
    }
}

/// Runs cover resolution then text analysis for one new book. `None` means
/// "skip this cycle, retry on the next scan": the book's image folder may
/// still be mid-extraction on disk when the scan runs.
async fn extract_new_book(
    book: &ObservedBook,
    apply_borders: bool,
    ratios: &BorderRatios,
) -> Result<Option<(crate::types::CoverInfo, TextProfile)>> {
    let cover = match cover::resolve_manga_cover(&book.book_path).await? {
        Some(cover) => cover,
        None => {
            log::debug!("cover not resolvable for '{}', skipping this cycle", book.key());
            return Ok(None);
        }
    };

    match analyzer::analyze_book_file(&book.book_path, apply_borders, ratios).await {
        Ok(profile) => Ok(Some((cover, profile))),
        Err(e) => {
            log::warn!(
                "text analysis failed for '{}', skipping this cycle: {}",
                book.key(),
                e
            );
            Ok(None)
        }
    }
}

impl SeiriConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(root) = &self.library_root {
            if root.as_os_str().is_empty() {
                return Err("library_root must not be empty".to_string());
            }
        }
        if let Some(ratios) = &self.border_ratios {
            if !(0.0..=1.0).contains(&ratios.left_min)
                || !(0.0..=1.0).contains(&ratios.left_max)
                || !(0.0..=1.0).contains(&ratios.top_min)
            {
                return Err("border ratios must be within 0.0..=1.0".to_string());
            }
            if ratios.left_min >= ratios.left_max {
                return Err("border ratio left_min must be below left_max".to_string());
            }
        }
        Ok(())
    }
}
