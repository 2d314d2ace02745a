//! Novel (EPUB) text analysis.
//!
//! EPUB has no fixed pagination, so the profile is built at chapter
//! granularity: one cumulative entry per spine item in declared reading
//! order.

use std::path::Path;

use epub::doc::EpubDoc;
use lazy_static::lazy_static;
use scraper::{Html, Selector};

use crate::error::{Error, Result};
use crate::types::{BorderRatios, TextProfile};

lazy_static! {
    static ref PARAGRAPH_SELECTOR: Selector = Selector::parse("p").unwrap();
}

/// Walks the EPUB's spine and counts Japanese characters per chapter.
///
/// Chapters whose content cannot be retrieved contribute 0 and do not abort
/// the remaining chapters. Border filtering does not apply to novels; the
/// ratios are accepted for signature symmetry with the manga path.
pub fn analyze_epub(path: &Path, _ratios: &BorderRatios) -> Result<TextProfile> {
    let mut doc = EpubDoc::new(path)
        .map_err(|e| Error::Epub(format!("failed to open {:?}: {}", path, e)))?;

    doc.set_current_chapter(0);
    let mut running = 0usize;
    let mut page_chars = Vec::new();

    loop {
        match doc.get_current_str() {
            Some((content, _media_type)) => {
                running += count_chapter_chars(&content);
            }
            None => {
                log::warn!(
                    "unreadable chapter {} in {:?}, counting 0",
                    page_chars.len(),
                    path
                );
            }
        }
        page_chars.push(running);

        if !doc.go_next() {
            break;
        }
    }

    Ok(TextProfile {
        characters: running,
        page_chars,
    })
}

/// Extracts `<p>` text from one chapter's XHTML and counts matching
/// characters.
fn count_chapter_chars(content: &str) -> usize {
    let document = Html::parse_document(content);
    document
        .select(&PARAGRAPH_SELECTOR)
        .map(|p| super::page::count_japanese_chars(&p.text().collect::<String>()))
        .sum()
}
