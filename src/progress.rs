//! Progress-callback trait for per-archive and per-page conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through each archive and page.
//!
//! # Example
//!
//! ```rust
//! use comic2pdf::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     pages: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, archive: &str, page_num: usize, total_pages: usize) {
//!         let done = self.pages.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{archive}: page {page_num}/{total_pages} ({done} so far)");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { pages: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline as it processes archives and pages.
///
/// Implementations must be `Send + Sync`: batch conversion works on several
/// archives at once from blocking worker threads, so the per-archive and
/// per-page methods may be called concurrently. All methods have default
/// no-op implementations so callers only override what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once per request before any archive is opened.
    ///
    /// # Arguments
    /// * `total_archives` — number of archives in the request
    fn on_conversion_start(&self, total_archives: usize) {
        let _ = total_archives;
    }

    /// Called when an archive has been decoded and its pages selected.
    ///
    /// # Arguments
    /// * `archive`        — source filename
    /// * `selected_pages` — number of pages that will be rendered
    fn on_archive_start(&self, archive: &str, selected_pages: usize) {
        let _ = (archive, selected_pages);
    }

    /// Called after a page has been appended to its PDF.
    ///
    /// # Arguments
    /// * `archive`     — source filename
    /// * `page_num`    — 1-indexed position within the archive's selection
    /// * `total_pages` — size of the archive's selection
    fn on_page_complete(&self, archive: &str, page_num: usize, total_pages: usize) {
        let _ = (archive, page_num, total_pages);
    }

    /// Called when a page is dropped (decode or embed failure).
    fn on_page_error(&self, archive: &str, page_num: usize, total_pages: usize, error: &str) {
        let _ = (archive, page_num, total_pages, error);
    }

    /// Called when a whole archive is skipped inside a batch or combine request.
    fn on_archive_failed(&self, archive: &str, error: &str) {
        let _ = (archive, error);
    }

    /// Called once after all archives have been processed.
    ///
    /// # Arguments
    /// * `total_archives` — archives in the request
    /// * `succeeded`      — archives that contributed at least one page
    fn on_conversion_complete(&self, total_archives: usize, succeeded: usize) {
        let _ = (total_archives, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
