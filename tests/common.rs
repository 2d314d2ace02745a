//! Common test utilities and fixtures for the Seiri crate.
//!
//! Provides functions for setting up unique test directories, building manga
//! book HTML fixtures, and a counting notifier for reconciliation tests.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::{distributions::Alphanumeric, Rng};
use tokio::fs;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use seiri::notify::Notifier;

#[allow(dead_code)]
pub const TEST_TMP_DIR: &str = "tests/tmp";

/// Creates a clean, uniquely named test directory with a `library` root
/// inside it. Returns the base test path and the library root.
#[allow(dead_code)]
pub async fn setup_library(sub_path: &str) -> (PathBuf, PathBuf) {
    let rand_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let test_dir = PathBuf::from(TEST_TMP_DIR).join(format!("{}-{}", sub_path, rand_string));
    if test_dir.exists() {
        fs::remove_dir_all(&test_dir).await.unwrap();
    }
    let library_root = test_dir.join("library");
    fs::create_dir_all(&library_root).await.unwrap();
    (test_dir, library_root)
}

/// Builds one absolutely-positioned text box holding a single paragraph.
#[allow(dead_code)]
pub fn text_box(left: u32, top: u32, text: &str) -> String {
    format!(
        r#"<div class="textBox" style="left:{}px;top:{}px"><p>{}</p></div>"#,
        left, top, text
    )
}

/// Builds one page element declaring its dimensions in its inline style.
#[allow(dead_code)]
pub fn page_div(width: u32, height: u32, boxes: &[String]) -> String {
    format!(
        r#"<div class="page" style="width:{}px;height:{}px">{}</div>"#,
        width,
        height,
        boxes.concat()
    )
}

/// Builds a whole manga book HTML document with the entity-encoded
/// `url(&quot;...&quot;)` image-folder reference the cover resolver expects.
#[allow(dead_code)]
pub fn book_html(images_folder: &str, pages: &[String]) -> String {
    format!(
        "<html><head><style>.bg {{ background-image:url(&quot;{}/001.jpg&quot;); }}</style></head><body>{}</body></html>",
        images_folder,
        pages.concat()
    )
}

/// Writes a manga book under `<library_root>/<series>/`: the HTML file plus
/// an image folder named `<book>_files` holding `image_count` dummy JPEGs.
#[allow(dead_code)]
pub async fn create_manga_book(
    library_root: &Path,
    series: &str,
    book: &str,
    pages: &[String],
    image_count: usize,
) {
    let series_dir = library_root.join(series);
    fs::create_dir_all(&series_dir).await.unwrap();

    let images_folder = format!("{}_files", book);
    let images_dir = series_dir.join(&images_folder);
    fs::create_dir_all(&images_dir).await.unwrap();
    for i in 0..image_count {
        fs::write(
            images_dir.join(format!("{:03}.jpg", i + 1)),
            b"\xFF\xD8\xFF\xE0 not a real jpeg",
        )
        .await
        .unwrap();
    }

    fs::write(
        series_dir.join(format!("{}.html", book)),
        book_html(&images_folder, pages),
    )
    .await
    .unwrap();
}

#[allow(dead_code)]
pub const EPUB_COVER_BYTES: &[u8] = b"\xFF\xD8\xFF\xE0 cover bytes";

/// Writes a minimal novel EPUB fixture.
///
/// Each chapter is `(file name, body)`; a `None` body lists the chapter in
/// the spine while leaving its file out of the archive, so readers see it as
/// unretrievable. `declare_cover` controls whether the cover image (if any)
/// is announced in the package metadata or only present in the manifest.
#[allow(dead_code)]
pub async fn write_epub(
    path: &Path,
    chapters: &[(&str, Option<&str>)],
    cover: Option<&[u8]>,
    declare_cover: bool,
) {
    let bytes = build_epub_bytes(chapters, cover, declare_cover);
    fs::write(path, bytes).await.unwrap();
}

#[allow(dead_code)]
fn build_epub_bytes(
    chapters: &[(&str, Option<&str>)],
    cover: Option<&[u8]>,
    declare_cover: bool,
) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored: SimpleFileOptions =
        SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    zip.start_file("META-INF/container.xml", stored).unwrap();
    zip.write_all(
        br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
    )
    .unwrap();

    let mut manifest = String::new();
    let mut spine = String::new();
    for (i, (name, _)) in chapters.iter().enumerate() {
        manifest.push_str(&format!(
            r#"<item id="ch{}" href="{}" media-type="application/xhtml+xml"/>"#,
            i, name
        ));
        spine.push_str(&format!(r#"<itemref idref="ch{}"/>"#, i));
    }
    let mut cover_meta = String::new();
    if cover.is_some() {
        if declare_cover {
            manifest.push_str(
                r#"<item id="cover-image" href="cover.jpg" media-type="image/jpeg" properties="cover-image"/>"#,
            );
            cover_meta.push_str(r#"<meta name="cover" content="cover-image"/>"#);
        } else {
            manifest
                .push_str(r#"<item id="cover-image" href="cover.jpg" media-type="image/jpeg"/>"#);
        }
    }

    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="id">fixture</dc:identifier>
    <dc:title>fixture</dc:title>
    <dc:language>ja</dc:language>
    {}
  </metadata>
  <manifest>{}</manifest>
  <spine>{}</spine>
</package>"#,
        cover_meta, manifest, spine
    );
    zip.start_file("OEBPS/content.opf", stored).unwrap();
    zip.write_all(opf.as_bytes()).unwrap();

    for (name, body) in chapters {
        if let Some(body) = body {
            zip.start_file(format!("OEBPS/{}", name), stored).unwrap();
            zip.write_all(
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><html xmlns="http://www.w3.org/1999/xhtml"><body>{}</body></html>"#,
                    body
                )
                .as_bytes(),
            )
            .unwrap();
        }
    }
    if let Some(bytes) = cover {
        zip.start_file("OEBPS/cover.jpg", stored).unwrap();
        zip.write_all(bytes).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// [`Notifier`] that counts how many times the changed signal fired.
#[allow(dead_code)]
#[derive(Default)]
pub struct CountingNotifier {
    pub count: AtomicUsize,
}

impl CountingNotifier {
    #[allow(dead_code)]
    pub fn fired(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Notifier for CountingNotifier {
    async fn notify_library_changed(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
