//! Conversion workflows: single, batch, combine, and their editor-driven variants.
//!
//! Every workflow is the same three steps per archive:
//!
//! 1. **open**   — detect, decode (with one RAR↔ZIP fallback), list and sort pages
//! 2. **plan**   — pick which pages to render and on which background
//!    (a page range, or editor data)
//! 3. **render** — decode only the planned entries, normalise each, append
//!    it to a [`PdfAssembler`]
//!
//! The workflows differ only in how many archives feed how many assemblers
//! and in what happens when an archive fails: single-archive workflows return
//! the error, batch and combine workflows log it and carry on.
//!
//! Decoding and encoding are CPU/IO heavy and run on `spawn_blocking`
//! threads. Batch converts several archives at once; combine keeps a single
//! blocking task so exactly one writer appends pages, in archive order.

use crate::config::{
    BackgroundColor, CombinationEditorData, ConversionConfig, EditorPage, PageSelection,
    RenderOptions,
};
use crate::error::{ComicError, PageError};
use crate::output::{
    ArchiveBuffer, ArchiveFailure, BatchOutput, ConversionResult, ConversionStats, PreviewOutput,
    ZipBundle,
};
use crate::pipeline::archive::{self, OpenedArchive};
use crate::pipeline::compose::PdfAssembler;
use crate::pipeline::encode;
use crate::pipeline::normalize::{self, ImageKind};
use crate::progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Filename of the merged document produced by combine workflows.
pub const COMBINED_FILENAME: &str = "combined.pdf";
/// Filename of the ZIP bundle produced by a batch with several successes.
pub const BUNDLE_FILENAME: &str = "converted_comics.zip";
/// Most thumbnails a preview returns.
pub const MAX_PREVIEW_PAGES: usize = 100;

/// One archive of a batch request with its own quality and background.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub archive: ArchiveBuffer,
    pub options: RenderOptions,
}

impl BatchEntry {
    pub fn new(archive: ArchiveBuffer, options: RenderOptions) -> Self {
        Self { archive, options }
    }
}

/// One page to render: which entry, and on what background.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagePlan {
    pub name: String,
    pub background: BackgroundColor,
}

/// How pages of one archive are chosen.
#[derive(Debug, Clone)]
enum Selection<'a> {
    /// A page range in natural order, all on one background.
    Range {
        pages: PageSelection,
        background: BackgroundColor,
    },
    /// Explicit editor data: order, inclusion and background per page.
    Editor(&'a [EditorPage]),
}

/// Plan a page range over natural-sorted `pages`.
pub fn plan_range(
    pages: &[String],
    selection: &PageSelection,
    background: BackgroundColor,
) -> Vec<PagePlan> {
    selection
        .to_indices(pages.len())
        .into_iter()
        .map(|i| PagePlan {
            name: pages[i].clone(),
            background,
        })
        .collect()
}

/// Plan editor data over natural-sorted `pages`.
///
/// Only `included` entries are kept, in the order given (not natural order),
/// each with its own background. Indices past the end are logged and dropped.
pub fn plan_editor(filename: &str, pages: &[String], editor: &[EditorPage]) -> Vec<PagePlan> {
    editor
        .iter()
        .filter(|entry| entry.included)
        .filter_map(|entry| match pages.get(entry.index) {
            Some(name) => Some(PagePlan {
                name: name.clone(),
                background: entry.background_color,
            }),
            None => {
                let e = PageError::IndexOutOfRange {
                    index: entry.index,
                    total: pages.len(),
                };
                warn!("'{}': {}", filename, e);
                None
            }
        })
        .collect()
}

// ── Public workflows ─────────────────────────────────────────────────────

/// Convert one archive into one PDF, honouring `config.pages`.
///
/// # Errors
/// Any per-archive failure is fatal here: [`ComicError::UnknownFormat`],
/// [`ComicError::ExtractionFailed`], [`ComicError::NoImagesFound`],
/// [`ComicError::InvalidPageRange`], or [`ComicError::NoPagesRendered`] when
/// every selected page failed to decode.
pub async fn convert_single(
    archive: ArchiveBuffer,
    config: &ConversionConfig,
) -> Result<ConversionResult, ComicError> {
    info!("Starting single conversion: {}", archive.filename);
    let progress = progress_of(config);
    let selection = Selection::Range {
        pages: config.pages.clone(),
        background: config.background,
    };
    let quality = config.quality;

    progress.on_conversion_start(1);
    let cb = Arc::clone(&progress);
    let result = run_blocking(move || convert_one(&archive, selection, quality, cb.as_ref())).await;
    progress.on_conversion_complete(1, usize::from(result.is_ok()));
    result
}

/// Convert one archive following editor data: only included pages, in the
/// given order, each on its own background.
pub async fn convert_single_with_editor(
    archive: ArchiveBuffer,
    editor: Vec<EditorPage>,
    config: &ConversionConfig,
) -> Result<ConversionResult, ComicError> {
    info!(
        "Starting editor conversion: {} ({} editor entries)",
        archive.filename,
        editor.len()
    );
    let progress = progress_of(config);
    let quality = config.quality;

    progress.on_conversion_start(1);
    let cb = Arc::clone(&progress);
    let result = run_blocking(move || {
        convert_one(&archive, Selection::Editor(&editor), quality, cb.as_ref())
    })
    .await;
    progress.on_conversion_complete(1, usize::from(result.is_ok()));
    result
}

/// Convert each archive into its own PDF.
///
/// Archives that fail are logged and skipped. One success is returned as
/// the PDF itself; several are bundled into a ZIP in input order.
///
/// # Errors
/// [`ComicError::AllConversionsFailed`] when no archive converted.
pub async fn convert_batch(
    entries: Vec<BatchEntry>,
    config: &ConversionConfig,
) -> Result<BatchOutput, ComicError> {
    let total = entries.len();
    info!("Starting batch conversion of {} archives", total);
    let progress = progress_of(config);
    progress.on_conversion_start(total);

    let outcomes: Vec<(String, Result<ConversionResult, ComicError>)> =
        stream::iter(entries.into_iter().map(|entry| {
            let cb = Arc::clone(&progress);
            async move {
                let filename = entry.archive.filename.clone();
                let selection = Selection::Range {
                    pages: PageSelection::All,
                    background: entry.options.background,
                };
                let quality = entry.options.quality;
                let result = run_blocking(move || {
                    convert_one(&entry.archive, selection, quality, cb.as_ref())
                })
                .await;
                (filename, result)
            }
        }))
        .buffered(config.concurrency.max(1))
        .collect()
        .await;

    let mut converted = Vec::new();
    let mut failures = Vec::new();
    for (filename, outcome) in outcomes {
        match outcome {
            Ok(result) => converted.push(result),
            Err(e) => {
                warn!("Skipping '{}': {}", filename, e);
                progress.on_archive_failed(&filename, &e.to_string());
                failures.push(ArchiveFailure {
                    filename,
                    error: e.to_string(),
                });
            }
        }
    }
    progress.on_conversion_complete(total, converted.len());

    match converted.len() {
        0 => Err(ComicError::AllConversionsFailed {
            total,
            first_error: failures
                .first()
                .map(|f| format!("{}: {}", f.filename, f.error))
                .unwrap_or_else(|| "no archives were supplied".to_string()),
        }),
        1 => {
            let result = converted.remove(0);
            info!("Batch complete: 1/{} converted → {}", total, result.filename);
            Ok(BatchOutput::Single { result, failures })
        }
        n => {
            let bundle = run_blocking(move || bundle_zip(converted)).await?;
            info!(
                "Batch complete: {}/{} converted → {} ({} bytes)",
                n,
                total,
                bundle.filename,
                bundle.bytes.len()
            );
            Ok(BatchOutput::Bundle { bundle, failures })
        }
    }
}

/// Merge every page of every archive into one PDF, archives in list order and
/// each archive's pages in natural order, all on `config.background`.
///
/// An archive that fails is logged and contributes nothing.
pub async fn convert_combine(
    archives: Vec<ArchiveBuffer>,
    config: &ConversionConfig,
) -> Result<ConversionResult, ComicError> {
    info!("Starting combine conversion of {} archives", archives.len());
    let progress = progress_of(config);
    let quality = config.quality;
    let background = config.background;

    run_blocking(move || {
        let jobs: Vec<_> = archives
            .iter()
            .map(|a| {
                (
                    a,
                    Selection::Range {
                        pages: PageSelection::All,
                        background,
                    },
                )
            })
            .collect();
        combine_blocking(archives.len(), jobs, quality, progress.as_ref())
    })
    .await
}

/// Merge archives following per-archive editor data keyed by filename.
///
/// An archive with no entry in `editor` is skipped entirely rather than
/// defaulted to "all pages, white background".
pub async fn convert_combine_with_editor(
    archives: Vec<ArchiveBuffer>,
    editor: CombinationEditorData,
    config: &ConversionConfig,
) -> Result<ConversionResult, ComicError> {
    info!(
        "Starting editor combine of {} archives ({} with editor data)",
        archives.len(),
        editor.len()
    );
    let progress = progress_of(config);
    let quality = config.quality;

    run_blocking(move || {
        let jobs: Vec<_> = archives
            .iter()
            .filter_map(|a| match editor.get(&a.filename) {
                Some(pages) => Some((a, Selection::Editor(pages.as_slice()))),
                None => {
                    info!("'{}' has no editor data; skipping", a.filename);
                    None
                }
            })
            .collect();
        combine_blocking(archives.len(), jobs, quality, progress.as_ref())
    })
    .await
}

/// Number of image pages in an archive, without decoding any page.
pub async fn page_count(archive: ArchiveBuffer) -> Result<usize, ComicError> {
    run_blocking(move || Ok(archive::open_with_fallback(&archive)?.pages.len())).await
}

/// Up to [`MAX_PREVIEW_PAGES`] small JPEG thumbnails plus the total page count.
///
/// A page whose thumbnail cannot be produced is left out; its siblings keep
/// their natural-sort `index` so an editor can still address them.
pub async fn preview(archive: ArchiveBuffer) -> Result<PreviewOutput, ComicError> {
    run_blocking(move || {
        let opened = archive::open_with_fallback(&archive)?;
        let shown = &opened.pages[..opened.pages.len().min(MAX_PREVIEW_PAGES)];
        let wanted: HashSet<String> = shown.iter().cloned().collect();
        let bytes = materialize(&opened, &wanted)?;

        let thumbnails = shown
            .iter()
            .enumerate()
            .filter_map(|(index, name)| {
                let raw = bytes.get(name)?;
                encode::encode_thumbnail(index, name, raw)
                    .map_err(|e| warn!("Thumbnail for '{}' failed: {}", name, e))
                    .ok()
            })
            .collect::<Vec<_>>();

        debug!(
            "Preview of '{}': {}/{} thumbnails",
            archive.filename,
            thumbnails.len(),
            opened.pages.len()
        );
        Ok(PreviewOutput {
            total_pages: opened.pages.len(),
            thumbnails,
        })
    })
    .await
}

/// Write an artifact to disk.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_output(path: impl AsRef<Path>, bytes: &[u8]) -> Result<(), ComicError> {
    let path = path.as_ref();
    let write_err = |source| ComicError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("part");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn progress_of(config: &ConversionConfig) -> ProgressCallback {
    config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback))
}

/// Run blocking pipeline work off the async executor.
async fn run_blocking<T, F>(task: F) -> Result<T, ComicError>
where
    F: FnOnce() -> Result<T, ComicError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ComicError::Internal(format!("Conversion task panicked: {e}")))?
}

fn materialize(
    opened: &OpenedArchive<'_>,
    wanted: &HashSet<String>,
) -> Result<HashMap<String, Vec<u8>>, ComicError> {
    opened
        .materialize(wanted)
        .map_err(|e| ComicError::ExtractionFailed {
            filename: opened.filename.to_string(),
            primary: e.to_string(),
            fallback: format!("not retried; entries were already listed as {}", opened.format),
        })
}

/// Pages appended and dropped by one [`render_plan`] call.
#[derive(Debug, Default, Clone, Copy)]
struct RenderCounts {
    rendered: usize,
    failed: usize,
}

fn page_failed(
    progress: &dyn ConversionProgressCallback,
    archive: &str,
    page_num: usize,
    total: usize,
    error: PageError,
) {
    warn!("'{}': {}", archive, error);
    progress.on_page_error(archive, page_num, total, &error.to_string());
}

/// Decode the planned entries and append them to `pdf` in plan order.
///
/// Per-page failures are logged and skipped; only a failure to read the
/// archive at all is returned.
fn render_plan(
    pdf: &mut PdfAssembler,
    opened: &OpenedArchive<'_>,
    plan: &[PagePlan],
    quality: u8,
    progress: &dyn ConversionProgressCallback,
) -> Result<RenderCounts, ComicError> {
    let wanted: HashSet<String> = plan.iter().map(|p| p.name.clone()).collect();
    let bytes = materialize(opened, &wanted)?;
    let total = plan.len();
    let mut counts = RenderCounts::default();

    for (i, page) in plan.iter().enumerate() {
        let page_num = i + 1;
        let Some(raw) = bytes.get(&page.name) else {
            counts.failed += 1;
            let e = PageError::MissingEntry {
                page: page_num,
                name: page.name.clone(),
            };
            page_failed(progress, opened.filename, page_num, total, e);
            continue;
        };

        let kind = ImageKind::for_entry(&page.name, raw);
        let image = match normalize::normalize(raw, kind, quality) {
            Ok(image) => image,
            Err(e) => {
                counts.failed += 1;
                let e = PageError::ImageDecodeFailed {
                    page: page_num,
                    name: page.name.clone(),
                    detail: e.to_string(),
                };
                page_failed(progress, opened.filename, page_num, total, e);
                continue;
            }
        };

        match pdf.render_page(&image, page.background) {
            Ok(_) => {
                counts.rendered += 1;
                progress.on_page_complete(opened.filename, page_num, total);
            }
            Err(e) => {
                counts.failed += 1;
                let e = PageError::EmbedFailed {
                    page: page_num,
                    detail: e.to_string(),
                };
                page_failed(progress, opened.filename, page_num, total, e);
            }
        }
    }

    Ok(counts)
}

/// Open `archive` and resolve `selection` into a page plan.
fn open_and_plan<'a>(
    archive: &'a ArchiveBuffer,
    selection: &Selection<'_>,
) -> Result<(OpenedArchive<'a>, Vec<PagePlan>), ComicError> {
    let opened = archive::open_with_fallback(archive)?;
    let plan = match selection {
        Selection::Range { pages, background } => {
            let plan = plan_range(&opened.pages, pages, *background);
            if plan.is_empty() {
                let (start, end) = match pages {
                    PageSelection::Range(s, e) => (*s, *e),
                    PageSelection::All => (1, opened.pages.len()),
                };
                return Err(ComicError::InvalidPageRange {
                    start,
                    end,
                    total: opened.pages.len(),
                });
            }
            plan
        }
        Selection::Editor(editor) => plan_editor(&archive.filename, &opened.pages, editor),
    };
    debug!(
        "'{}': {} of {} pages selected",
        archive.filename,
        plan.len(),
        opened.pages.len()
    );
    Ok((opened, plan))
}

/// Blocking body shared by single, single-editor and batch: one archive in,
/// one PDF out.
fn convert_one(
    archive: &ArchiveBuffer,
    selection: Selection<'_>,
    quality: u8,
    progress: &dyn ConversionProgressCallback,
) -> Result<ConversionResult, ComicError> {
    let start = Instant::now();
    let (opened, plan) = open_and_plan(archive, &selection)?;
    progress.on_archive_start(&archive.filename, plan.len());

    let mut pdf = PdfAssembler::new();
    let counts = render_plan(&mut pdf, &opened, &plan, quality, progress)?;
    if pdf.page_count() == 0 {
        return Err(ComicError::NoPagesRendered {
            filename: archive.filename.clone(),
        });
    }
    let bytes = pdf.finish()?;

    let stats = ConversionStats {
        total_pages: opened.pages.len(),
        selected_pages: plan.len(),
        rendered_pages: counts.rendered,
        failed_pages: counts.failed,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "'{}' → {}: {}/{} pages, {} bytes, {}ms",
        archive.filename,
        archive.pdf_filename(),
        stats.rendered_pages,
        stats.selected_pages,
        bytes.len(),
        stats.duration_ms
    );

    Ok(ConversionResult {
        filename: archive.pdf_filename(),
        pdf: bytes,
        stats,
    })
}

/// Blocking body of both combine workflows: many archives, one assembler.
///
/// `requested` is the number of archives in the request (including any the
/// caller already filtered out of `jobs`).
fn combine_blocking(
    requested: usize,
    jobs: Vec<(&ArchiveBuffer, Selection<'_>)>,
    quality: u8,
    progress: &dyn ConversionProgressCallback,
) -> Result<ConversionResult, ComicError> {
    let start = Instant::now();
    progress.on_conversion_start(requested);

    let mut pdf = PdfAssembler::new();
    let mut stats = ConversionStats::default();
    let mut first_error: Option<String> = None;
    let mut attempted = 0;
    let mut failed_archives = 0;
    let mut succeeded = 0;

    for (archive, selection) in jobs {
        attempted += 1;
        let outcome = open_and_plan(archive, &selection).and_then(|(opened, plan)| {
            progress.on_archive_start(&archive.filename, plan.len());
            let counts = render_plan(&mut pdf, &opened, &plan, quality, progress)?;
            Ok((opened.pages.len(), plan.len(), counts))
        });

        match outcome {
            Ok((total, selected, counts)) => {
                stats.total_pages += total;
                stats.selected_pages += selected;
                stats.rendered_pages += counts.rendered;
                stats.failed_pages += counts.failed;
                if counts.rendered > 0 {
                    succeeded += 1;
                }
            }
            Err(e) => {
                failed_archives += 1;
                warn!("Skipping '{}' in combined PDF: {}", archive.filename, e);
                progress.on_archive_failed(&archive.filename, &e.to_string());
                if first_error.is_none() {
                    first_error = Some(format!("{}: {}", archive.filename, e));
                }
            }
        }
    }
    progress.on_conversion_complete(requested, succeeded);

    if pdf.page_count() == 0 {
        return Err(match first_error {
            Some(first_error) if failed_archives == attempted => ComicError::AllConversionsFailed {
                total: attempted,
                first_error,
            },
            _ => ComicError::NoPagesRendered {
                filename: COMBINED_FILENAME.to_string(),
            },
        });
    }

    let bytes = pdf.finish()?;
    stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Combined {}/{} archives → {}: {} pages, {} bytes, {}ms",
        succeeded,
        requested,
        COMBINED_FILENAME,
        stats.rendered_pages,
        bytes.len(),
        stats.duration_ms
    );

    Ok(ConversionResult {
        filename: COMBINED_FILENAME.to_string(),
        pdf: bytes,
        stats,
    })
}

/// Give duplicate member names a ` (2)`, ` (3)`, … suffix before `.pdf`.
fn unique_member_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(dot) => name.split_at(dot),
        None => (name, ""),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Bundle several PDFs into one ZIP, preserving order.
fn bundle_zip(mut results: Vec<ConversionResult>) -> Result<ZipBundle, ComicError> {
    let bundle_err = |e: &dyn std::fmt::Display| ComicError::BundleFailed(e.to_string());
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut used = HashSet::new();

    for result in &mut results {
        result.filename = unique_member_name(&result.filename, &mut used);
        zip.start_file(result.filename.as_str(), SimpleFileOptions::default())
            .map_err(|e| bundle_err(&e))?;
        zip.write_all(&result.pdf).map_err(|e| bundle_err(&e))?;
    }
    let bytes = zip.finish().map_err(|e| bundle_err(&e))?.into_inner();

    Ok(ZipBundle {
        filename: BUNDLE_FILENAME.to_string(),
        bytes,
        members: results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("p{i}.jpg")).collect()
    }

    #[test]
    fn range_plan_uses_one_background() {
        let plan = plan_range(&names(5), &PageSelection::Range(2, 3), BackgroundColor::Black);
        assert_eq!(
            plan,
            vec![
                PagePlan { name: "p2.jpg".into(), background: BackgroundColor::Black },
                PagePlan { name: "p3.jpg".into(), background: BackgroundColor::Black },
            ]
        );
    }

    #[test]
    fn editor_plan_keeps_order_and_overrides() {
        let editor = vec![
            EditorPage { index: 2, included: true, background_color: BackgroundColor::White },
            EditorPage { index: 1, included: false, background_color: BackgroundColor::Black },
            EditorPage { index: 0, included: true, background_color: BackgroundColor::Black },
            EditorPage { index: 9, included: true, background_color: BackgroundColor::Black },
        ];
        let plan = plan_editor("x.cbz", &names(3), &editor);
        assert_eq!(
            plan,
            vec![
                PagePlan { name: "p3.jpg".into(), background: BackgroundColor::White },
                PagePlan { name: "p1.jpg".into(), background: BackgroundColor::Black },
            ]
        );
    }

    #[test]
    fn editor_plan_allows_repeated_pages() {
        let editor = vec![
            EditorPage { index: 0, included: true, background_color: BackgroundColor::White },
            EditorPage { index: 0, included: true, background_color: BackgroundColor::Black },
        ];
        assert_eq!(plan_editor("x.cbz", &names(1), &editor).len(), 2);
    }

    #[test]
    fn duplicate_member_names_get_suffixes() {
        let mut used = HashSet::new();
        assert_eq!(unique_member_name("a.pdf", &mut used), "a.pdf");
        assert_eq!(unique_member_name("a.pdf", &mut used), "a (2).pdf");
        assert_eq!(unique_member_name("a.pdf", &mut used), "a (3).pdf");
        assert_eq!(unique_member_name("b.pdf", &mut used), "b.pdf");
        assert_eq!(unique_member_name("noext", &mut used), "noext");
        assert_eq!(unique_member_name("noext", &mut used), "noext (2)");
    }

    #[test]
    fn bundle_keeps_order_and_names() {
        let result = |name: &str, body: &[u8]| ConversionResult {
            filename: name.to_string(),
            pdf: body.to_vec(),
            stats: ConversionStats::default(),
        };
        let bundle = bundle_zip(vec![
            result("b.pdf", b"%PDF-b"),
            result("a.pdf", b"%PDF-a"),
            result("b.pdf", b"%PDF-b2"),
        ])
        .unwrap();
        assert_eq!(bundle.filename, BUNDLE_FILENAME);

        let mut zip = zip::ZipArchive::new(Cursor::new(bundle.bytes)).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["b.pdf", "a.pdf", "b (2).pdf"]);
    }

    #[tokio::test]
    async fn write_output_is_atomic_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.pdf");
        write_output(&path, b"%PDF-1.5").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.5");
        assert!(!path.with_extension("part").exists());
    }
}
