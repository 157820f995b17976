//! Error types for the comic2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ComicError`] — **Fatal**: the requested artifact cannot be produced
//!   (unknown archive type, both decoders failed, nothing to render). Returned
//!   as `Err(ComicError)` from the top-level `convert_*` functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page could not be decoded or
//!   embedded. The page is dropped from its document, logged, and reported
//!   through [`crate::progress::ConversionProgressCallback::on_page_error`];
//!   sibling pages carry on.
//!
//! Per-archive failures inside batch and combine workflows are also recovered
//! locally: the archive is skipped and its [`ComicError`] is logged instead of
//! returned.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the comic2pdf library.
#[derive(Debug, Error)]
pub enum ComicError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Archive not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Archive errors ────────────────────────────────────────────────────
    /// Neither the magic bytes nor the file extension identify RAR or ZIP.
    #[error("Unknown archive format for '{filename}': expected a RAR or ZIP based .cbr/.cbz file")]
    UnknownFormat { filename: String },

    /// Decoding failed under the detected format and under the fallback format.
    #[error("Failed to extract '{filename}': {primary}; fallback decoder also failed: {fallback}")]
    ExtractionFailed {
        filename: String,
        primary: String,
        fallback: String,
    },

    /// The archive decoded but holds no recognised image entries.
    #[error("No images found in '{filename}'")]
    NoImagesFound { filename: String },

    // ── Selection errors ──────────────────────────────────────────────────
    /// The requested page range is empty once clamped to the archive.
    #[error("Page range {start}-{end} selects no pages (archive has {total} pages)")]
    InvalidPageRange {
        start: usize,
        end: usize,
        total: usize,
    },

    /// Editor data could not be parsed.
    #[error("Invalid editor data: {0}")]
    InvalidEditorData(String),

    /// Every selected page was excluded or failed; no empty PDF is returned.
    #[error("No pages could be rendered for '{filename}'")]
    NoPagesRendered { filename: String },

    /// Every archive of a batch or combine request failed.
    #[error("All {total} archives failed to convert.\nFirst error: {first_error}")]
    AllConversionsFailed { total: usize, first_error: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// lopdf could not serialise the assembled document.
    #[error("Failed to assemble PDF: {0}")]
    PdfAssemblyFailed(String),

    /// The ZIP bundle of batch results could not be written.
    #[error("Failed to bundle PDFs into a ZIP archive: {0}")]
    BundleFailed(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ComicError {
    /// Structured `{ "error": "<message>" }` payload for callers that speak JSON.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

/// A non-fatal error for a single page.
///
/// `page` is the 1-indexed position of the page in the output selection.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The entry bytes could not be decoded or re-encoded as an image.
    #[error("Page {page} ('{name}'): image decode failed: {detail}")]
    ImageDecodeFailed {
        page: usize,
        name: String,
        detail: String,
    },

    /// The archive reader did not return bytes for a selected entry.
    #[error("Page {page} ('{name}'): entry could not be read from the archive")]
    MissingEntry { page: usize, name: String },

    /// Editor data referenced a page index past the end of the archive.
    #[error("Editor index {index} is out of range (archive has {total} pages)")]
    IndexOutOfRange { index: usize, total: usize },

    /// The normalised image could not be embedded into the PDF page.
    #[error("Page {page}: embedding failed: {detail}")]
    EmbedFailed { page: usize, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_failed_display_mentions_both_decoders() {
        let e = ComicError::ExtractionFailed {
            filename: "issue1.cbr".into(),
            primary: "bad rar header".into(),
            fallback: "invalid zip archive".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("issue1.cbr"), "got: {msg}");
        assert!(msg.contains("bad rar header"));
        assert!(msg.contains("invalid zip archive"));
    }

    #[test]
    fn all_conversions_failed_display() {
        let e = ComicError::AllConversionsFailed {
            total: 3,
            first_error: "No images found in 'a.cbz'".into(),
        };
        assert!(e.to_string().contains("All 3 archives"));
    }

    #[test]
    fn payload_wraps_message() {
        let e = ComicError::UnknownFormat {
            filename: "notes.txt".into(),
        };
        let payload = e.to_payload();
        let msg = payload["error"].as_str().expect("error field");
        assert!(msg.contains("notes.txt"));
    }

    #[test]
    fn page_error_display() {
        let e = PageError::ImageDecodeFailed {
            page: 4,
            name: "p04.jpg".into(),
            detail: "truncated".into(),
        };
        assert!(e.to_string().contains("Page 4"));
        assert!(e.to_string().contains("p04.jpg"));
    }
}
