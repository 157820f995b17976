//! Archive format detection.
//!
//! Users rename files freely, so the extension is only a hint. The leading
//! signature bytes decide whenever they are present; the extension is
//! consulted only when neither signature matches.

use crate::error::ComicError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// RAR 1.5–4.x marker block. RAR 5 differs in the seventh byte and is
/// therefore classified by extension.
pub const RAR_SIGNATURE: [u8; 7] = [0x52, 0x61, 0x72, 0x21, 0x1A, 0x07, 0x00];

/// ZIP local-file-header signature (`PK\x03\x04`).
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Container format of a comic archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveFormat {
    Rar,
    Zip,
}

impl ArchiveFormat {
    /// The format tried when decoding under `self` fails.
    pub fn other(self) -> Self {
        match self {
            ArchiveFormat::Rar => ArchiveFormat::Zip,
            ArchiveFormat::Zip => ArchiveFormat::Rar,
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveFormat::Rar => f.write_str("RAR"),
            ArchiveFormat::Zip => f.write_str("ZIP"),
        }
    }
}

/// Classify `bytes` as RAR or ZIP.
///
/// Decision order: RAR signature, ZIP signature, then the `.cbr` / `.cbz`
/// extension of `filename` (case-insensitive).
pub fn detect(bytes: &[u8], filename: &str) -> Result<ArchiveFormat, ComicError> {
    if let Some(format) = sniff(bytes) {
        return Ok(format);
    }
    from_extension(filename).ok_or_else(|| ComicError::UnknownFormat {
        filename: filename.to_string(),
    })
}

/// Signature-only classification.
pub fn sniff(bytes: &[u8]) -> Option<ArchiveFormat> {
    if bytes.starts_with(&RAR_SIGNATURE) {
        Some(ArchiveFormat::Rar)
    } else if bytes.starts_with(&ZIP_SIGNATURE) {
        Some(ArchiveFormat::Zip)
    } else {
        None
    }
}

/// Extension-only classification.
pub fn from_extension(filename: &str) -> Option<ArchiveFormat> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    match ext.as_str() {
        "cbr" => Some(ArchiveFormat::Rar),
        "cbz" => Some(ArchiveFormat::Zip),
        _ => None,
    }
}
