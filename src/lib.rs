//! # comic2pdf
//!
//! Convert comic-book archives (CBR/CBZ) into PDFs with one image per page.
//!
//! ## Why this crate?
//!
//! Comic archives are nothing more than RAR or ZIP files full of scans, but
//! readers, printers and e-ink devices want a PDF. A faithful conversion has
//! to survive mislabelled archives (`.cbr` files that are really ZIPs and the
//! reverse), order `page2` before `page10`, shrink oversized scans without
//! distorting them, and keep going when a single page is corrupt.
//!
//! ## Pipeline Overview
//!
//! ```text
//! CBR/CBZ bytes
//!  │
//!  ├─ 1. Detect     magic bytes first, extension second
//!  ├─ 2. Extract    RAR or ZIP reader, one retry with the other format
//!  ├─ 3. Sort       natural order ("2" before "10")
//!  ├─ 4. Select     page range, or editor data (order + per-page background)
//!  ├─ 5. Normalise  re-encode PNG/JPEG at the requested quality (spawn_blocking)
//!  └─ 6. Compose    one A4 page per image, centred on a solid background
//! ```
//!
//! Batch requests return one PDF, or a ZIP of PDFs when several archives
//! converted. Combine requests merge every archive into a single PDF.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use comic2pdf::{convert_single, ArchiveBuffer, BackgroundColor, ConversionConfig, PageSelection};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("issue-01.cbz")?;
//!     let config = ConversionConfig::builder()
//!         .pages(PageSelection::Range(1, 20))
//!         .background(BackgroundColor::Black)
//!         .quality(85)
//!         .build()?;
//!
//!     let result = convert_single(ArchiveBuffer::new("issue-01.cbz", bytes), &config).await?;
//!     std::fs::write(&result.filename, &result.pdf)?;
//!     eprintln!("{} pages", result.stats.rendered_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `comic2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! comic2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    parse_combination_editor_data, parse_editor_data, parse_quality, BackgroundColor,
    CombinationEditorData, ConversionConfig, ConversionConfigBuilder, EditorPage, PageSelection,
    RenderOptions,
};
pub use convert::{
    convert_batch, convert_combine, convert_combine_with_editor, convert_single,
    convert_single_with_editor, page_count, preview, write_output, BatchEntry,
};
pub use error::{ComicError, PageError};
pub use output::{
    ArchiveBuffer, ArchiveFailure, BatchOutput, ConversionResult, ConversionStats, PreviewOutput,
    Thumbnail, ZipBundle,
};
pub use pipeline::input::{resolve_input, resolve_inputs};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
