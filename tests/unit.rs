//! Unit tests for text extraction and cover-pattern parsing.
//!
//! Tests individual components in isolation without running a full
//! reconciliation cycle.

use scraper::{Html, Selector};

use seiri::analyzer::page::{count_japanese_chars, extract_page_text};
use seiri::analyzer::analyze_book_html;
use seiri::cover::image_folder_from_html;
use seiri::types::BorderRatios;

mod common;
use common::{page_div, text_box};

#[test]
fn test_count_japanese_chars_ranges() {
    // Hiragana and katakana (U+3040-U+30FF)
    assert_eq!(count_japanese_chars("こんにちは"), 5);
    assert_eq!(count_japanese_chars("カタカナ"), 4);
    // Kanji (U+4E00-U+9FFF)
    assert_eq!(count_japanese_chars("日本語"), 3);
    // Latin text, digits and Japanese punctuation are not counted
    assert_eq!(count_japanese_chars("abcこんにちは123"), 5);
    assert_eq!(count_japanese_chars("ふりがな、です。"), 6);
    assert_eq!(count_japanese_chars("Hello, world!"), 0);
    assert_eq!(count_japanese_chars(""), 0);
}

#[test]
fn test_border_filter_excludes_edge_box() {
    // 800x1200 page: min_left=96, max_left=680, min_top=60. A box at
    // left=100, top=50 fails `top > min_top` and is excluded when the
    // border filter is on, included when it is off.
    let html = page_div(800, 1200, &[text_box(100, 50, "メロスは激怒した。")]);
    let ratios = BorderRatios::default();

    let bordered = analyze_book_html(&html, true, &ratios);
    assert_eq!(bordered.characters, 0);
    assert_eq!(bordered.page_chars, vec![0]);

    let unbordered = analyze_book_html(&html, false, &ratios);
    assert_eq!(unbordered.characters, 8);
    assert_eq!(unbordered.page_chars, vec![8]);
}

#[test]
fn test_border_filter_containment_for_inner_boxes() {
    // All boxes strictly inside [0.12w, 0.85w] x [0.05h, inf): bordered and
    // unbordered counts must be equal.
    let html = page_div(
        800,
        1200,
        &[
            text_box(100, 100, "こんにちは"),
            text_box(400, 600, "日本語"),
        ],
    );
    let ratios = BorderRatios::default();

    let bordered = analyze_book_html(&html, true, &ratios);
    let unbordered = analyze_book_html(&html, false, &ratios);
    assert_eq!(bordered.characters, 8);
    assert_eq!(bordered.characters, unbordered.characters);
}

#[test]
fn test_border_filter_strictly_less_with_out_of_bounds_box() {
    let html = page_div(
        800,
        1200,
        &[
            text_box(400, 600, "日本語"),
            // left = 0.9 * w, outside max_left
            text_box(720, 600, "こんにちは"),
        ],
    );
    let ratios = BorderRatios::default();

    let bordered = analyze_book_html(&html, true, &ratios);
    let unbordered = analyze_book_html(&html, false, &ratios);
    assert_eq!(bordered.characters, 3);
    assert_eq!(unbordered.characters, 8);
    assert!(bordered.characters < unbordered.characters);
}

#[test]
fn test_missing_dimensions_always_inside_bounds() {
    // The page declares no width/height, so even an edge-positioned box is
    // counted with the border filter on.
    let html = format!(
        r#"<div class="page">{}</div>"#,
        text_box(0, 0, "カタカナ")
    );
    let profile = analyze_book_html(&html, true, &BorderRatios::default());
    assert_eq!(profile.characters, 4);
}

#[test]
fn test_page_chars_are_cumulative_and_monotonic() {
    let html = [
        page_div(800, 1200, &[text_box(400, 600, "こんにちは")]), // 5
        page_div(800, 1200, &[]),                                 // +0
        page_div(800, 1200, &[text_box(400, 600, "日本語")]),     // +3
    ]
    .concat();
    let profile = analyze_book_html(&html, true, &BorderRatios::default());

    // Running totals, not per-page deltas; empty pages still get an entry.
    assert_eq!(profile.page_chars, vec![5, 5, 8]);
    assert_eq!(profile.characters, 8);
    assert_eq!(*profile.page_chars.last().unwrap(), profile.characters);
    assert!(profile.page_chars.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_zero_pages_yields_empty_profile() {
    let profile = analyze_book_html("<html><body></body></html>", true, &BorderRatios::default());
    assert_eq!(profile.characters, 0);
    assert!(profile.page_chars.is_empty());
}

#[test]
fn test_extract_page_text_groups_paragraphs_by_box() {
    let html = page_div(
        800,
        1200,
        &[
            r#"<div class="textBox" style="left:200px;top:100px"><p>日本</p><p>語</p></div>"#
                .to_string(),
            text_box(400, 600, "こんにちは"),
        ],
    );
    let document = Html::parse_document(&html);
    let selector = Selector::parse(".page").unwrap();
    let page = document.select(&selector).next().unwrap();

    let result = extract_page_text(page, true, &BorderRatios::default());
    assert_eq!(result.characters, 8);
    assert_eq!(
        result.boxes,
        vec![
            vec!["日本".to_string(), "語".to_string()],
            vec!["こんにちは".to_string()],
        ]
    );
}

#[test]
fn test_image_folder_entity_form() {
    let html = r#"<style>.bg { background-image:url(&quot;vol1_files/003.jpg&quot;); }</style>"#;
    assert_eq!(image_folder_from_html(html), Some("vol1_files".to_string()));
}

#[test]
fn test_image_folder_plain_form_fallback() {
    let html = r#"<style>.bg { background-image:url("vol2_files/001.png"); }</style>"#;
    assert_eq!(image_folder_from_html(html), Some("vol2_files".to_string()));
}

#[test]
fn test_image_folder_entity_form_wins_over_plain() {
    // Both forms present: the entity-encoded pattern is tried first and the
    // plain pattern is only a fallback.
    let html = r#"url("plain_files/001.jpg") url(&quot;entity_files/001.jpg&quot;)"#;
    assert_eq!(
        image_folder_from_html(html),
        Some("entity_files".to_string())
    );
}

#[test]
fn test_image_folder_is_url_decoded() {
    let html = r#"url(&quot;vol%201%20files/001.jpg&quot;)"#;
    assert_eq!(image_folder_from_html(html), Some("vol 1 files".to_string()));
}

#[test]
fn test_image_folder_none_without_url_reference() {
    assert_eq!(image_folder_from_html("<html><body>no images</body></html>"), None);
}
