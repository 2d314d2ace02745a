//! Cover and image-folder resolution.
//!
//! Manga books reference their page images through a CSS `url(...)` in the
//! bundled HTML; the first path segment of that URL names the image folder
//! next to the HTML file. Novels carry an embedded cover inside the EPUB
//! instead.

use std::path::{Path, PathBuf};

use epub::doc::EpubDoc;
use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::Regex;
use tokio::fs;

use crate::error::{Error, Result};
use crate::types::CoverInfo;

lazy_static! {
    /// HTML-entity-encoded form: `url(&quot;folder/page.jpg&quot;)`.
    static ref ENTITY_URL_REGEX: Regex = Regex::new(r"url\(&quot;(.+?)&quot;\)").unwrap();
    /// Plain quoted form: `url("folder/page.jpg")`. Only consulted when the
    /// entity form yields no match.
    static ref PLAIN_URL_REGEX: Regex = Regex::new(r#"url\("(.+?)"\)"#).unwrap();
}

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Resolves a manga book's image folder, thumbnail and image count.
///
/// Returns `Ok(None)` (cover not resolvable, skip this book this cycle)
/// when no `url(...)` pattern matches, the image directory cannot be read
/// or listed, no image-extension file is found, or the directory is empty.
/// Each reason is logged; the caller retries on the next scan since the
/// folder may still be mid-extraction on disk. Dot-prefixed entries are
/// ignored and do not count towards the image total.
pub async fn resolve_manga_cover(book_html_path: &Path) -> Result<Option<CoverInfo>> {
    let html = match fs::read_to_string(book_html_path).await {
        Ok(html) => html,
        Err(e) => {
            log::warn!("book HTML {:?} is unreadable: {}", book_html_path, e);
            return Ok(None);
        }
    };

    let images_folder = match image_folder_from_html(&html) {
        Some(folder) => folder,
        None => {
            log::debug!("no url(...) reference found in {:?}", book_html_path);
            return Ok(None);
        }
    };

    let book_dir = book_html_path
        .parent()
        .ok_or_else(|| {
            Error::InvalidPath(
                book_html_path.to_path_buf(),
                "book file has no parent directory".to_string(),
            )
        })?;
    let images_dir = book_dir.join(&images_folder);

    let mut entries = match fs::read_dir(&images_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("image folder {:?} is unreadable: {}", images_dir, e);
            return Ok(None);
        }
    };

    // First image-extension file in directory listing order, not sorted.
    let mut thumbnail: Option<String> = None;
    let mut total_images = 0usize;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                log::debug!("failed to list image folder {:?}: {}", images_dir, e);
                return Ok(None);
            }
        };
        let path = entry.path();
        if crate::scanner::is_hidden(&path) || path.is_dir() {
            continue;
        }
        total_images += 1;
        if thumbnail.is_none() && has_image_extension(&path) {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                thumbnail = Some(name.to_string());
            }
        }
    }

    if total_images == 0 {
        log::debug!("image folder {:?} is empty", images_dir);
        return Ok(None);
    }
    let thumbnail = match thumbnail {
        Some(name) => name,
        None => {
            log::debug!("no image-extension file in {:?}", images_dir);
            return Ok(None);
        }
    };

    Ok(Some(CoverInfo {
        images_folder,
        thumbnail,
        total_images,
    }))
}

/// Extracts the image-folder name from a book's raw HTML: the URL-decoded
/// first path segment of the first `url(...)` reference, trying the
/// entity-encoded pattern before the plain one.
pub fn image_folder_from_html(html: &str) -> Option<String> {
    let url = ENTITY_URL_REGEX
        .captures(html)
        .or_else(|| PLAIN_URL_REGEX.captures(html))
        .and_then(|c| c.get(1))?
        .as_str();

    let segment = url.split('/').next()?;
    if segment.is_empty() {
        return None;
    }
    Some(percent_decode_str(segment).decode_utf8_lossy().into_owned())
}

/// Extracts a novel's embedded cover and writes it to `<bookName>.jpg`
/// alongside the source file.
///
/// Prefers the EPUB's declared cover; falls back to the first image entry of
/// the manifest. Fails with [`Error::Epub`] when the manifest has no
/// retrievable image or no decodable bytes.
pub async fn extract_epub_cover(epub_path: &Path) -> Result<PathBuf> {
    let path = epub_path.to_path_buf();
    let bytes = tokio::task::spawn_blocking(move || read_epub_cover_bytes(&path)).await??;

    let target = epub_path.with_extension("jpg");
    fs::write(&target, bytes).await?;
    Ok(target)
}

fn read_epub_cover_bytes(epub_path: &Path) -> Result<Vec<u8>> {
    let mut doc = EpubDoc::new(epub_path)
        .map_err(|e| Error::Epub(format!("failed to open {:?}: {}", epub_path, e)))?;

    if let Some((bytes, _mime)) = doc.get_cover() {
        return Ok(bytes);
    }

    // No declared cover: first image entry of the manifest, by id, so the
    // pick is stable across runs.
    let image_id = doc
        .resources
        .iter()
        .filter(|(_, item)| item.mime.starts_with("image/"))
        .map(|(id, _)| id.clone())
        .min()
        .ok_or_else(|| Error::Epub(format!("{:?} has no image manifest entries", epub_path)))?;

    doc.get_resource(&image_id)
        .map(|(bytes, _mime)| bytes)
        .ok_or_else(|| {
            Error::Epub(format!(
                "cover resource '{}' in {:?} has no decodable bytes",
                image_id, epub_path
            ))
        })
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}
