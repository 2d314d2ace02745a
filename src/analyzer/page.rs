//! Per-page text extraction for manga HTML.
//!
//! Manga books bundle OCR'd dialogue as absolutely-positioned `div.textBox`
//! elements inside per-page containers. This module decides how many
//! Japanese-script characters a reader will see on one page, optionally
//! filtering out boxes that sit outside a plausible content region.

use lazy_static::lazy_static;
use scraper::{ElementRef, Selector};

use crate::types::{BorderRatios, PageText};

lazy_static! {
    static ref TEXT_BOX_SELECTOR: Selector = Selector::parse("div.textBox").unwrap();
    static ref PARAGRAPH_SELECTOR: Selector = Selector::parse("p").unwrap();
}

/// Extracts the visible Japanese text of one page element.
///
/// For each `div.textBox` the declared CSS `width`/`height` of its parent
/// give the page dimensions; the box's own `left`/`top` place it on the
/// page. When `apply_borders` is set, a box is only counted if it lies
/// inside `(ratios.left_min * w, ratios.left_max * w)` horizontally and
/// below `ratios.top_min * h`. A box with any missing dimension is treated
/// as always inside bounds. A page with zero text boxes yields a count of 0.
pub fn extract_page_text(page: ElementRef, apply_borders: bool, ratios: &BorderRatios) -> PageText {
    let mut result = PageText::default();

    for text_box in page.select(&TEXT_BOX_SELECTOR) {
        if apply_borders && !box_within_content_region(text_box, ratios) {
            continue;
        }

        let mut paragraphs = Vec::new();
        for paragraph in text_box.select(&PARAGRAPH_SELECTOR) {
            let text: String = paragraph.text().collect();
            result.characters += count_japanese_chars(&text);
            paragraphs.push(text);
        }
        result.boxes.push(paragraphs);
    }

    result
}

/// Counts characters in the kana (U+3040-U+30FF) and kanji (U+4E00-U+9FFF)
/// ranges. Latin text, punctuation and furigana-only glyphs are not counted.
pub fn count_japanese_chars(text: &str) -> usize {
    text.chars()
        .filter(|c| matches!(c, '\u{3040}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}'))
        .count()
}

/// Applies the geometric border heuristic to a single text box.
fn box_within_content_region(text_box: ElementRef, ratios: &BorderRatios) -> bool {
    let parent_style = text_box
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|parent| parent.value().attr("style"))
        .unwrap_or("");
    let page_width = css_px(parent_style, "width");
    let page_height = css_px(parent_style, "height");

    let box_style = text_box.value().attr("style").unwrap_or("");
    let left = css_px(box_style, "left");
    let top = css_px(box_style, "top");

    match (page_width, page_height, left, top) {
        (Some(w), Some(h), Some(left), Some(top)) => {
            let min_left = ratios.left_min * w;
            let max_left = ratios.left_max * w;
            let min_top = ratios.top_min * h;
            min_left < left && left < max_left && top > min_top
        }
        // Missing dimensions: always inside bounds.
        _ => true,
    }
}

/// Reads a CSS pixel value for `prop` out of an inline style declaration,
/// e.g. `css_px("left:100px;top:50px", "top") == Some(50.0)`.
pub(crate) fn css_px(style: &str, prop: &str) -> Option<f64> {
    for declaration in style.split(';') {
        let (key, value) = match declaration.split_once(':') {
            Some(pair) => pair,
            None => continue,
        };
        if !key.trim().eq_ignore_ascii_case(prop) {
            continue;
        }
        let value = value.trim();
        let value = value.strip_suffix("px").unwrap_or(value).trim();
        return value.parse::<f64>().ok();
    }
    None
}
