//! Archive readers: list image entries, then decode only the ones asked for.
//!
//! RAR and ZIP sit behind one [`ArchiveReader`] trait so the orchestrator never
//! branches on format. [`open_with_fallback`] owns the one piece of format
//! logic left: when decoding under the detected format fails, it retries once
//! under the other format before giving up.

pub mod cbr;
pub mod cbz;

use crate::error::ComicError;
use crate::output::ArchiveBuffer;
use crate::pipeline::detect::{self, ArchiveFormat};
use crate::pipeline::sort;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Extensions treated as comic pages (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Decoder-level failure, folded into [`ComicError::ExtractionFailed`] by
/// [`open_with_fallback`].
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("invalid ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid RAR archive: {0}")]
    Rar(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read access to the image pages of one archive.
pub trait ArchiveReader {
    /// Container format this reader decodes.
    fn format(&self) -> ArchiveFormat;

    /// Names of image entries, in archive order.
    fn list_entries(&self) -> Result<Vec<String>, ArchiveError>;

    /// Decode the bytes of the named entries.
    ///
    /// Only the requested entries are decompressed. An entry that cannot be
    /// read is logged and left out of the map rather than failing the call.
    fn materialize(&self, names: &HashSet<String>) -> Result<HashMap<String, Vec<u8>>, ArchiveError>;
}

/// Returns true if `name` is an image entry we treat as a comic page.
///
/// macOS resource-fork entries (`__MACOSX/…`, `._name.jpg`) share the
/// extension of the real page but hold no image data.
pub fn is_image_entry(name: &str) -> bool {
    if name.ends_with('/') || name.ends_with('\\') {
        return false;
    }
    if name.starts_with("__MACOSX/") || name.contains("/__MACOSX/") {
        return false;
    }
    let path = Path::new(name);
    if path
        .file_name()
        .and_then(|f| f.to_str())
        .is_some_and(|f| f.starts_with("._"))
    {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Build the reader for `format` over `bytes`, failing if the container
/// cannot be opened.
pub fn open_reader<'a>(
    format: ArchiveFormat,
    bytes: &'a [u8],
) -> Result<Box<dyn ArchiveReader + 'a>, ArchiveError> {
    match format {
        ArchiveFormat::Zip => Ok(Box::new(cbz::ZipReader::open(bytes)?)),
        ArchiveFormat::Rar => Ok(Box::new(cbr::RarReader::open(bytes)?)),
    }
}

/// A decoded archive with its natural-sorted page list.
pub struct OpenedArchive<'a> {
    /// Declared filename of the source archive.
    pub filename: &'a str,
    /// Format that actually decoded (may differ from the detected one).
    pub format: ArchiveFormat,
    /// Image entry names in natural order.
    pub pages: Vec<String>,
    reader: Box<dyn ArchiveReader + 'a>,
}

impl OpenedArchive<'_> {
    /// Decode the named entries; see [`ArchiveReader::materialize`].
    pub fn materialize(
        &self,
        names: &HashSet<String>,
    ) -> Result<HashMap<String, Vec<u8>>, ArchiveError> {
        self.reader.materialize(names)
    }
}

fn open_and_list<'a>(
    format: ArchiveFormat,
    bytes: &'a [u8],
) -> Result<(Box<dyn ArchiveReader + 'a>, Vec<String>), ArchiveError> {
    let reader = open_reader(format, bytes)?;
    let entries = reader.list_entries()?;
    Ok((reader, entries))
}

/// Detect, decode and list an archive, sorting its pages naturally.
///
/// # Errors
/// * [`ComicError::UnknownFormat`] — neither signature nor extension matched
/// * [`ComicError::ExtractionFailed`] — detected and fallback decoders both failed
/// * [`ComicError::NoImagesFound`] — decoding worked but no image entries exist
pub fn open_with_fallback(buffer: &ArchiveBuffer) -> Result<OpenedArchive<'_>, ComicError> {
    let filename = buffer.filename.as_str();
    let detected = detect::detect(&buffer.bytes, filename)?;
    debug!("'{}' detected as {}", filename, detected);

    let (reader, mut pages) = match open_and_list(detected, &buffer.bytes) {
        Ok(opened) => opened,
        Err(primary) => {
            let fallback = detected.other();
            warn!(
                "Decoding '{}' as {} failed ({}); retrying as {}",
                filename, detected, primary, fallback
            );
            match open_and_list(fallback, &buffer.bytes) {
                Ok(opened) => opened,
                Err(secondary) => {
                    return Err(ComicError::ExtractionFailed {
                        filename: filename.to_string(),
                        primary: primary.to_string(),
                        fallback: secondary.to_string(),
                    });
                }
            }
        }
    };

    if pages.is_empty() {
        return Err(ComicError::NoImagesFound {
            filename: filename.to_string(),
        });
    }

    let format = reader.format();
    sort::sort_natural(&mut pages);
    info!("'{}' ({}): {} image pages", filename, format, pages.len());

    Ok(OpenedArchive {
        filename,
        format,
        pages,
        reader,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_entries_by_extension() {
        assert!(is_image_entry("page1.jpg"));
        assert!(is_image_entry("dir/PAGE2.JPEG"));
        assert!(is_image_entry("cover.Png"));
        assert!(is_image_entry("anim.gif"));
        assert!(is_image_entry("p.webp"));

        assert!(!is_image_entry("ComicInfo.xml"));
        assert!(!is_image_entry("scan.tiff"));
        assert!(!is_image_entry("folder.jpg/"));
        assert!(!is_image_entry("noext"));
    }

    #[test]
    fn resource_forks_are_not_pages() {
        assert!(!is_image_entry("__MACOSX/._page1.jpg"));
        assert!(!is_image_entry("issue/__MACOSX/page1.jpg"));
        assert!(!is_image_entry("issue/._page1.jpg"));
    }

    fn rar_fixture() -> Vec<u8> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("test_cases/issue.cbr");
        std::fs::read(&path).unwrap_or_else(|e| panic!("missing fixture {}: {e}", path.display()))
    }

    #[test]
    fn rar_pages_come_back_in_natural_order() {
        let buffer = ArchiveBuffer::new("issue.cbr", rar_fixture());
        let opened = open_with_fallback(&buffer).unwrap();
        assert_eq!(opened.format, ArchiveFormat::Rar);
        assert_eq!(opened.pages, vec!["page1.png", "page2.png", "page10.png"]);
    }

    #[test]
    fn cbz_named_rar_falls_back_to_rar_reader() {
        // Leading junk hides the RAR signature, so the `.cbz` extension sends
        // the first attempt to the ZIP reader.
        let mut bytes = b"JUNKJUNK".to_vec();
        bytes.extend(rar_fixture());
        let buffer = ArchiveBuffer::new("mislabelled.cbz", bytes);

        let opened = open_with_fallback(&buffer).unwrap();
        assert_eq!(opened.format, ArchiveFormat::Rar);
        let wanted: HashSet<String> = opened.pages.iter().cloned().collect();
        assert_eq!(opened.materialize(&wanted).unwrap().len(), 3);
    }

    #[test]
    fn unknown_format_is_not_retried() {
        let buffer = ArchiveBuffer::new("notes.txt", b"plain text".to_vec());
        let err = open_with_fallback(&buffer).err().expect("should fail");
        assert!(matches!(err, ComicError::UnknownFormat { .. }));
    }
}
