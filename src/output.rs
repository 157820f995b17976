//! Input and output value types.
//!
//! Everything here lives for exactly one request: an [`ArchiveBuffer`] goes
//! in, one [`ConversionResult`] (or a [`BatchOutput`]) comes out, and nothing
//! is cached in between.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw bytes of an uploaded archive plus its declared filename.
#[derive(Clone)]
pub struct ArchiveBuffer {
    /// Declared filename, e.g. `issue-01.cbz`. Only used for format fallback
    /// and to name outputs; the bytes are authoritative.
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ArchiveBuffer {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Output name for this archive's PDF: `.cbr`/`.cbz` (any case) becomes `.pdf`.
    pub fn pdf_filename(&self) -> String {
        pdf_filename_for(&self.filename)
    }
}

impl fmt::Debug for ArchiveBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveBuffer")
            .field("filename", &self.filename)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

/// Derive the output PDF filename from an archive filename.
///
/// A trailing `.cbr` or `.cbz` (case-insensitive) is replaced by `.pdf`; any
/// other name simply gains a `.pdf` suffix.
pub fn pdf_filename_for(archive_name: &str) -> String {
    let lower = archive_name.to_ascii_lowercase();
    if lower.ends_with(".cbr") || lower.ends_with(".cbz") {
        format!("{}.pdf", &archive_name[..archive_name.len() - 4])
    } else {
        format!("{archive_name}.pdf")
    }
}

/// Statistics for one produced PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Image pages found across the source archive(s).
    pub total_pages: usize,
    /// Pages the request asked for (range, editor selection, or all).
    pub selected_pages: usize,
    /// Pages actually present in the PDF.
    pub rendered_pages: usize,
    /// Selected pages dropped because they failed to decode or embed.
    pub failed_pages: usize,
    /// Wall-clock time for this artifact.
    pub duration_ms: u64,
}

/// One output PDF.
#[derive(Clone, Serialize)]
pub struct ConversionResult {
    pub filename: String,
    #[serde(skip)]
    pub pdf: Vec<u8>,
    pub stats: ConversionStats,
}

impl fmt::Debug for ConversionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionResult")
            .field("filename", &self.filename)
            .field("pdf", &format_args!("<{} bytes>", self.pdf.len()))
            .field("stats", &self.stats)
            .finish()
    }
}

/// A ZIP archive holding several converted PDFs.
#[derive(Clone)]
pub struct ZipBundle {
    pub filename: String,
    pub bytes: Vec<u8>,
    /// The individual results, in input order, as named inside the bundle.
    pub members: Vec<ConversionResult>,
}

impl fmt::Debug for ZipBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZipBundle")
            .field("filename", &self.filename)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("members", &self.members)
            .finish()
    }
}

/// An archive a batch or combine request skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveFailure {
    pub filename: String,
    pub error: String,
}

/// What a batch request hands back to its caller.
#[derive(Debug, Clone)]
pub enum BatchOutput {
    /// Exactly one archive converted: the PDF is returned directly.
    Single {
        result: ConversionResult,
        failures: Vec<ArchiveFailure>,
    },
    /// Two or more archives converted: the PDFs are bundled into one ZIP.
    Bundle {
        bundle: ZipBundle,
        failures: Vec<ArchiveFailure>,
    },
}

impl BatchOutput {
    /// Filename of the artifact to return (`.pdf` or `.zip`).
    pub fn filename(&self) -> &str {
        match self {
            BatchOutput::Single { result, .. } => &result.filename,
            BatchOutput::Bundle { bundle, .. } => &bundle.filename,
        }
    }

    /// Bytes of the artifact to return.
    pub fn bytes(&self) -> &[u8] {
        match self {
            BatchOutput::Single { result, .. } => &result.pdf,
            BatchOutput::Bundle { bundle, .. } => &bundle.bytes,
        }
    }

    /// `application/pdf` or `application/zip`.
    pub fn mime_type(&self) -> &'static str {
        match self {
            BatchOutput::Single { .. } => "application/pdf",
            BatchOutput::Bundle { .. } => "application/zip",
        }
    }

    /// Archives that were skipped.
    pub fn failures(&self) -> &[ArchiveFailure] {
        match self {
            BatchOutput::Single { failures, .. } | BatchOutput::Bundle { failures, .. } => {
                failures
            }
        }
    }

    /// Put `earlier` failures (for example inputs that never loaded) ahead
    /// of the ones the conversion recorded.
    pub fn with_failures(mut self, earlier: Vec<ArchiveFailure>) -> Self {
        let failures = match &mut self {
            BatchOutput::Single { failures, .. } | BatchOutput::Bundle { failures, .. } => {
                failures
            }
        };
        failures.splice(0..0, earlier);
        self
    }

    /// Number of PDFs produced.
    pub fn converted(&self) -> usize {
        match self {
            BatchOutput::Single { .. } => 1,
            BatchOutput::Bundle { bundle, .. } => bundle.members.len(),
        }
    }
}

/// One preview thumbnail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thumbnail {
    /// Position in the natural-sorted page list (0-indexed); matches
    /// [`crate::config::EditorPage::index`].
    pub index: usize,
    /// Entry name inside the archive.
    pub name: String,
    /// Always `image/jpeg`.
    pub mime_type: String,
    /// Base64-encoded JPEG bytes.
    pub data: String,
}

impl Thumbnail {
    /// `data:` URI ready for an `<img src>`.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Result of a preview query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewOutput {
    pub total_pages: usize,
    pub thumbnails: Vec<Thumbnail>,
}
