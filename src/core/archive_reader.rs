/*
 * This module opens a single EPUB archive and extracts the material the
 * pipeline needs: a display title and one concatenated text blob built from
 * every markup document declared in the package manifest. It defines the
 * `ArchiveReaderOperations` trait for abstracting the extraction step and a
 * concrete implementation `CoreEpubReader` built on the `zip` and `quick-xml`
 * crates.
 *
 * Every failure here is recoverable at file granularity: the pipeline treats
 * any `ArchiveError` as "skip this file" and keeps going.
 */
use crate::core::models::ArchiveContent;
use quick_xml::events::Event;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Path, PathBuf};

/* Archives larger than this are rejected without being opened. */
pub const MAX_ARCHIVE_SIZE: u64 = 100 * 1024 * 1024;

/* Manifest media type identifying markup-bearing text entries. */
const MARKUP_MEDIA_TYPE: &str = "application/xhtml+xml";

/* Well-known container entry pointing at the package document. */
const CONTAINER_ENTRY: &str = "META-INF/container.xml";

#[derive(Debug)]
pub enum ArchiveError {
    FileMissing(PathBuf),
    TooLarge { path: PathBuf, size: u64 },
    Io(io::Error),
    Container(String),
    Packaging(String),
    NoTextContent(PathBuf),
}

impl From<io::Error> for ArchiveError {
    fn from(err: io::Error) -> Self {
        ArchiveError::Io(err)
    }
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveError::FileMissing(p) => write!(f, "File not found: {p:?}"),
            ArchiveError::TooLarge { path, size } => {
                write!(f, "File too large ({size} bytes): {path:?}")
            }
            ArchiveError::Io(e) => write!(f, "I/O error: {e}"),
            ArchiveError::Container(e) => write!(f, "Archive container error: {e}"),
            ArchiveError::Packaging(e) => write!(f, "Package document error: {e}"),
            ArchiveError::NoTextContent(p) => {
                write!(f, "No extractable markup text in archive: {p:?}")
            }
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArchiveError::Io(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

/*
 * Defines the contract for extracting title and text from one e-book
 * archive. Implementations must not mutate the source file.
 */
pub trait ArchiveReaderOperations: Send + Sync {
    fn read(&self, path: &Path) -> Result<ArchiveContent>;
}

/*
 * Reads EPUB files: a ZIP container carrying an OPF package document that
 * names the title (`dc:title`) and lists the markup documents in its
 * manifest. Fragments are decoded with lossy UTF-8 so malformed byte
 * sequences are replaced rather than failing the whole file.
 */
pub struct CoreEpubReader {
    size_limit: u64,
}

impl CoreEpubReader {
    pub fn new() -> Self {
        CoreEpubReader {
            size_limit: MAX_ARCHIVE_SIZE,
        }
    }

    /*
     * Builds a reader with a custom size limit, so the oversize-rejection
     * path can be exercised without gigantic fixtures.
     */
    pub fn with_size_limit(size_limit: u64) -> Self {
        CoreEpubReader { size_limit }
    }
}

impl Default for CoreEpubReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveReaderOperations for CoreEpubReader {
    /*
     * Validates the file's existence and size, then walks the package
     * manifest and concatenates every markup document in manifest order.
     * The title falls back to the file's base name when `dc:title` is
     * absent or blank.
     */
    fn read(&self, path: &Path) -> Result<ArchiveContent> {
        let metadata = fs::metadata(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ArchiveError::FileMissing(path.to_path_buf())
            } else {
                ArchiveError::Io(e)
            }
        })?;
        if !metadata.is_file() {
            return Err(ArchiveError::FileMissing(path.to_path_buf()));
        }
        let size = metadata.len();
        if size > self.size_limit {
            log::warn!("CoreEpubReader: File too large, not opening: {path:?} ({size} bytes)");
            return Err(ArchiveError::TooLarge {
                path: path.to_path_buf(),
                size,
            });
        }

        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file))
            .map_err(|e| ArchiveError::Container(e.to_string()))?;

        let opf_name = locate_package_document(&mut archive)?;
        let opf_xml = read_container_entry(&mut archive, &opf_name, self.size_limit)
            .map_err(ArchiveError::Packaging)?;
        let package = parse_package_document(&opf_xml).map_err(ArchiveError::Packaging)?;
        let opf_dir = parent_dir_of(&opf_name);

        let mut text = String::new();
        for href in &package.markup_hrefs {
            let entry_name = resolve_href(opf_dir, href);
            let bytes = match read_container_entry(&mut archive, &entry_name, self.size_limit) {
                Ok(bytes) => bytes,
                // Manifest hrefs occasionally omit the OPF directory prefix.
                Err(_) => match read_container_entry(&mut archive, href, self.size_limit) {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        log::error!(
                            "CoreEpubReader: Failed to read manifest item '{href}' in {path:?}: {e}"
                        );
                        continue;
                    }
                },
            };
            text.push_str(&String::from_utf8_lossy(&bytes));
        }

        if text.is_empty() {
            return Err(ArchiveError::NoTextContent(path.to_path_buf()));
        }

        let title = match package.title {
            Some(t) if !t.trim().is_empty() => t,
            _ => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        log::debug!(
            "CoreEpubReader: Extracted {} bytes of markup text from {path:?} (title '{title}')",
            text.len()
        );
        Ok(ArchiveContent { title, text })
    }
}

/* Title and markup item hrefs pulled from the OPF package document. */
struct PackageDocument {
    title: Option<String>,
    markup_hrefs: Vec<String>,
}

/*
 * Finds the package document inside the container. The well-known
 * `META-INF/container.xml` names it; archives missing that entry fall back
 * to the first `.opf` file present.
 */
fn locate_package_document<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> Result<String> {
    let container_xml = read_container_entry(archive, CONTAINER_ENTRY, MAX_ARCHIVE_SIZE).ok();
    if let Some(xml) = container_xml {
        if let Some(full_path) = parse_container_rootfile(&xml) {
            return Ok(full_path);
        }
        log::warn!("CoreEpubReader: container.xml present but no rootfile entry found.");
    }

    archive
        .file_names()
        .find(|name| name.to_ascii_lowercase().ends_with(".opf"))
        .map(String::from)
        .ok_or_else(|| ArchiveError::Packaging("no package document (.opf) found".to_string()))
}

/* Reads one named entry from the container, bounded to `limit` bytes. */
fn read_container_entry<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
    limit: u64,
) -> std::result::Result<Vec<u8>, String> {
    let entry = archive.by_name(name).map_err(|e| e.to_string())?;
    let mut bytes = Vec::new();
    entry
        .take(limit)
        .read_to_end(&mut bytes)
        .map_err(|e| e.to_string())?;
    Ok(bytes)
}

/*
 * Pulls the `full-path` attribute of the first `rootfile` element out of
 * `META-INF/container.xml`.
 */
fn parse_container_rootfile(xml: &[u8]) -> Option<String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"rootfile" {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"full-path" {
                            if let Ok(value) = attr.unescape_value() {
                                return Some(value.into_owned());
                            }
                        }
                    }
                }
            }
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/*
 * Parses the OPF package document: the first `dc:title` text node and the
 * hrefs of all manifest items whose declared media type is markup, in
 * document order.
 */
fn parse_package_document(xml: &[u8]) -> std::result::Result<PackageDocument, String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut title: Option<String> = None;
    let mut markup_hrefs: Vec<String> = Vec::new();
    let mut in_title = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"title" && title.is_none() {
                    in_title = true;
                } else if name.as_ref() == b"item" {
                    if let Some(href) = markup_item_href(&e) {
                        markup_hrefs.push(href);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"item" {
                    if let Some(href) = markup_item_href(&e) {
                        markup_hrefs.push(href);
                    }
                }
            }
            Ok(Event::Text(t)) if in_title => {
                title = Some(t.unescape().unwrap_or_default().into_owned());
                in_title = false;
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"title" {
                    in_title = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(PackageDocument {
        title,
        markup_hrefs,
    })
}

/*
 * Returns the href of a manifest `item` element if its media type marks it
 * as markup-bearing text, `None` otherwise.
 */
fn markup_item_href(element: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    let mut href: Option<String> = None;
    let mut is_markup = false;
    for attr in element.attributes().flatten() {
        match attr.key.as_ref() {
            b"href" => {
                if let Ok(value) = attr.unescape_value() {
                    href = Some(value.into_owned());
                }
            }
            b"media-type" => {
                if let Ok(value) = attr.unescape_value() {
                    is_markup = value == MARKUP_MEDIA_TYPE;
                }
            }
            _ => {}
        }
    }
    if is_markup { href } else { None }
}

/* Directory portion of a container entry name, "" for root-level entries. */
fn parent_dir_of(entry_name: &str) -> &str {
    match entry_name.rfind('/') {
        Some(idx) => &entry_name[..idx],
        None => "",
    }
}

/*
 * Resolves a manifest href relative to the package document's directory
 * using container path conventions (forward slashes, `.` and `..`
 * segments).
 */
fn resolve_href(opf_dir: &str, href: &str) -> String {
    let mut parts: Vec<&str> = if opf_dir.is_empty() {
        Vec::new()
    } else {
        opf_dir.split('/').collect()
    };
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;
    use zip::write::SimpleFileOptions;

    /*
     * Builds a minimal but structurally valid EPUB: mimetype, container.xml,
     * an OPF package with optional title, and one markup entry per chapter.
     * A stylesheet entry is always present so readers must filter on the
     * declared media type rather than taking every manifest item.
     */
    pub(crate) fn build_epub(path: &Path, title: Option<&str>, chapters: &[(&str, &str)]) {
        build_epub_raw(
            path,
            title,
            &chapters
                .iter()
                .map(|(name, body)| {
                    (
                        *name,
                        format!("<html><body><p>{body}</p></body></html>").into_bytes(),
                    )
                })
                .collect::<Vec<_>>(),
        );
    }

    /* Same as `build_epub` but with caller-supplied chapter bytes. */
    pub(crate) fn build_epub_raw(path: &Path, title: Option<&str>, chapters: &[(&str, Vec<u8>)]) {
        let file = File::create(path).expect("create epub fixture");
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        writer.start_file("mimetype", options).unwrap();
        writer.write_all(b"application/epub+zip").unwrap();

        writer.start_file("META-INF/container.xml", options).unwrap();
        writer
            .write_all(
                br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
            )
            .unwrap();

        let title_element = title
            .map(|t| format!("<dc:title>{t}</dc:title>"))
            .unwrap_or_default();
        let mut manifest = String::new();
        let mut spine = String::new();
        for (idx, (name, _)) in chapters.iter().enumerate() {
            manifest.push_str(&format!(
                r#"<item id="ch{idx}" href="{name}" media-type="application/xhtml+xml"/>"#
            ));
            spine.push_str(&format!(r#"<itemref idref="ch{idx}"/>"#));
        }
        manifest.push_str(r#"<item id="css" href="style.css" media-type="text/css"/>"#);

        writer.start_file("OEBPS/content.opf", options).unwrap();
        writer
            .write_all(
                format!(
                    r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" xmlns:dc="http://purl.org/dc/elements/1.1/" version="2.0">
  <metadata>{title_element}</metadata>
  <manifest>{manifest}</manifest>
  <spine>{spine}</spine>
</package>"#
                )
                .as_bytes(),
            )
            .unwrap();

        writer.start_file("OEBPS/style.css", options).unwrap();
        writer.write_all(b"body { margin: 0; }").unwrap();

        for (name, bytes) in chapters {
            writer
                .start_file(format!("OEBPS/{name}"), options)
                .unwrap();
            writer.write_all(bytes).unwrap();
        }

        writer.finish().unwrap();
    }
}
