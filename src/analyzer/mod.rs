//! Book-level text analysis.
//!
//! Turns a whole book into a cumulative character-count profile: for manga
//! HTML, one running total per page; for novel EPUBs, one per spine chapter.
//! A page or chapter that fails to parse contributes 0 and never aborts the
//! rest of the book; partial results are preferred over total failure since
//! administrators can re-run the analysis as a repair action.

use std::path::Path;

use lazy_static::lazy_static;
use scraper::{Html, Selector};
use tokio::task::spawn_blocking;

use crate::error::{Error, Result};
use crate::types::{BorderRatios, TextProfile};

pub mod epub;
pub mod page;

lazy_static! {
    static ref PAGE_SELECTOR: Selector = Selector::parse(".page").unwrap();
}

/// Analyzes a manga book's HTML content.
///
/// Iterates the `.page` elements in document order, running the page
/// extractor on each and appending the running total (not the per-page
/// delta) after every page, so `page_chars[i]` is the cumulative count
/// through page `i`. Pages with zero text boxes are still recorded.
pub fn analyze_book_html(html: &str, apply_borders: bool, ratios: &BorderRatios) -> TextProfile {
    let document = Html::parse_document(html);

    let mut running = 0usize;
    let mut page_chars = Vec::new();
    for page_element in document.select(&PAGE_SELECTOR) {
        let page = page::extract_page_text(page_element, apply_borders, ratios);
        running += page.characters;
        page_chars.push(running);
    }

    TextProfile {
        characters: running,
        page_chars,
    }
}

/// Analyzes a book file, dispatching on its extension.
///
/// `.epub` files take the novel path (per-chapter granularity); anything
/// else is read as manga HTML. Parsing runs on a blocking thread.
pub async fn analyze_book_file(
    path: &Path,
    apply_borders: bool,
    ratios: &BorderRatios,
) -> Result<TextProfile> {
    let is_epub = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("epub"))
        .unwrap_or(false);

    if is_epub {
        let path = path.to_path_buf();
        let ratios = *ratios;
        return spawn_blocking(move || epub::analyze_epub(&path, &ratios)).await?;
    }

    let html = tokio::fs::read_to_string(path).await.map_err(|e| {
        log::error!("failed to read book file {:?}: {}", path, e);
        Error::Io(e)
    })?;
    let ratios = *ratios;
    let profile = spawn_blocking(move || analyze_book_html(&html, apply_borders, &ratios)).await?;
    Ok(profile)
}
