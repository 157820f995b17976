//! Integration tests for comic2pdf.
//!
//! ZIP archives are built in memory (ZIP writer + image-encoded pages). RAR
//! archives come from the small stored-RAR fixtures in `test_cases/`, which
//! `test_cases/make_rar_fixtures.py` regenerates. No test needs the network.
//!
//! Run with:
//!   cargo test --test conversion -- --nocapture

use comic2pdf::{
    convert_batch, convert_combine, convert_combine_with_editor, convert_single,
    convert_single_with_editor, page_count, preview, ArchiveBuffer, BackgroundColor, BatchEntry,
    BatchOutput, CombinationEditorData, ComicError, ConversionConfig, ConversionProgressCallback,
    EditorPage, PageSelection, RenderOptions,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::Content;
use lopdf::Document;
use pretty_assertions::assert_eq;
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// A solid page `width` pixels wide; widths identify pages inside the PDF.
fn page(width: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, 40, Rgb([200, 30, 30])));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), format)
        .expect("encode test page");
    out
}

fn png(width: u32) -> Vec<u8> {
    page(width, ImageFormat::Png)
}

fn jpeg(width: u32) -> Vec<u8> {
    page(width, ImageFormat::Jpeg)
}

fn zip_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn cbz(filename: &str, entries: &[(&str, Vec<u8>)]) -> ArchiveBuffer {
    ArchiveBuffer::new(filename, zip_bytes(entries))
}

/// Archive whose page `k` (1-based, natural order) is `k * 10` pixels wide.
fn numbered_cbz(filename: &str, pages: u32) -> ArchiveBuffer {
    let entries: Vec<(String, Vec<u8>)> = (1..=pages)
        .map(|k| (format!("page{k}.png"), png(k * 10)))
        .collect();
    let borrowed: Vec<(&str, Vec<u8>)> = entries
        .iter()
        .map(|(n, b)| (n.as_str(), b.clone()))
        .collect();
    cbz(filename, &borrowed)
}

/// Width of the image drawn on each page, in page order.
fn page_image_widths(pdf: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(pdf).expect("output must be a readable PDF");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).unwrap();
            let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
            let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
            let image_id = xobjects.get(b"Im1").unwrap().as_reference().unwrap();
            let image = doc.get_object(image_id).unwrap().as_stream().unwrap();
            image.dict.get(b"Width").unwrap().as_i64().unwrap()
        })
        .collect()
}

/// Fill colour (`rg` operands) of the background rectangle on each page.
fn page_backgrounds(pdf: &[u8]) -> Vec<[f32; 3]> {
    let mut doc = Document::load_mem(pdf).expect("output must be a readable PDF");
    doc.decompress();
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let raw = doc.get_page_content(page_id).unwrap();
            let content = Content::decode(&raw).unwrap();
            let fill = content
                .operations
                .iter()
                .find(|op| op.operator == "rg")
                .expect("every page paints a background");
            let rgb: Vec<f32> = fill.operands.iter().map(|o| o.as_float().unwrap()).collect();
            [rgb[0], rgb[1], rgb[2]]
        })
        .collect()
}

const BLACK: [f32; 3] = [0.0, 0.0, 0.0];
const WHITE: [f32; 3] = [1.0, 1.0, 1.0];

fn fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("test_cases").join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("missing fixture {}: {e}", path.display()))
}

fn config() -> ConversionConfig {
    ConversionConfig::default()
}

// ── Single conversion ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_single_all_pages_in_natural_order() {
    let archive = cbz(
        "issue1.cbz",
        &[
            ("page10.png", png(100)),
            ("page2.png", png(20)),
            ("page1.png", png(10)),
        ],
    );

    let result = convert_single(archive, &config()).await.unwrap();
    assert_eq!(result.filename, "issue1.pdf");
    assert_eq!(page_image_widths(&result.pdf), vec![10, 20, 100]);
    assert_eq!(result.stats.total_pages, 3);
    assert_eq!(result.stats.rendered_pages, 3);
    assert_eq!(result.stats.failed_pages, 0);
}

#[tokio::test]
async fn test_single_page_range() {
    let config = ConversionConfig::builder()
        .pages(PageSelection::Range(2, 4))
        .background(BackgroundColor::Black)
        .build()
        .unwrap();

    let result = convert_single(numbered_cbz("range.cbz", 6), &config)
        .await
        .unwrap();
    assert_eq!(page_image_widths(&result.pdf), vec![20, 30, 40]);
    assert_eq!(page_backgrounds(&result.pdf), vec![BLACK; 3]);
    assert_eq!(result.stats.selected_pages, 3);
}

#[tokio::test]
async fn test_single_range_is_clamped() {
    let config = ConversionConfig::builder()
        .pages(PageSelection::Range(0, 99))
        .build()
        .unwrap();

    let result = convert_single(numbered_cbz("clamp.cbz", 3), &config)
        .await
        .unwrap();
    assert_eq!(page_image_widths(&result.pdf), vec![10, 20, 30]);
}

#[tokio::test]
async fn test_single_empty_range_is_rejected() {
    let config = ConversionConfig::builder()
        .pages(PageSelection::Range(5, 2))
        .build()
        .unwrap();

    let err = convert_single(numbered_cbz("empty.cbz", 3), &config)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ComicError::InvalidPageRange { total: 3, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_single_mixed_jpeg_and_png_pages() {
    let archive = cbz("mixed.cbz", &[("01.jpg", jpeg(64)), ("02.png", png(32))]);
    let quality = ConversionConfig::builder().quality(30).build().unwrap();

    let result = convert_single(archive, &quality).await.unwrap();
    assert_eq!(page_image_widths(&result.pdf), vec![64, 32]);
}

#[tokio::test]
async fn test_corrupt_page_is_dropped_not_fatal() {
    let archive = cbz(
        "damaged.cbz",
        &[
            ("p1.png", png(10)),
            ("p2.jpg", b"definitely not a jpeg".to_vec()),
            ("p3.png", png(30)),
        ],
    );

    let result = convert_single(archive, &config()).await.unwrap();
    assert_eq!(page_image_widths(&result.pdf), vec![10, 30]);
    assert_eq!(result.stats.selected_pages, 3);
    assert_eq!(result.stats.rendered_pages, 2);
    assert_eq!(result.stats.failed_pages, 1);
}

#[tokio::test]
async fn test_all_pages_corrupt_is_an_error() {
    let archive = cbz("broken.cbz", &[("p1.jpg", b"junk".to_vec())]);
    let err = convert_single(archive, &config()).await.unwrap_err();
    assert!(matches!(err, ComicError::NoPagesRendered { .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_mislabelled_zip_falls_back_from_rar() {
    // Leading junk hides the ZIP signature, so the `.cbr` extension wins and
    // the RAR decoder is tried first.
    let mut bytes = b"JUNKJUNKJUNK".to_vec();
    bytes.extend(zip_bytes(&[("a.png", png(10)), ("b.png", png(20))]));
    let archive = ArchiveBuffer::new("mislabelled.cbr", bytes);

    let result = convert_single(archive, &config()).await.unwrap();
    assert_eq!(result.filename, "mislabelled.pdf");
    assert_eq!(page_image_widths(&result.pdf), vec![10, 20]);
}

#[tokio::test]
async fn test_rar_archive_in_natural_order() {
    let archive = ArchiveBuffer::new("issue.cbr", fixture("issue.cbr"));
    let result = convert_single(archive, &config()).await.unwrap();
    assert_eq!(result.filename, "issue.pdf");
    assert_eq!(page_image_widths(&result.pdf), vec![10, 20, 100]);
    assert_eq!(page_backgrounds(&result.pdf), vec![WHITE; 3]);
    assert_eq!(result.stats.total_pages, 3);
}

#[tokio::test]
async fn test_mislabelled_rar_falls_back_from_zip() {
    // The junk prefix hides the RAR signature from detection; the RAR reader
    // still finds the archive behind it.
    let mut bytes = b"JUNKJUNK".to_vec();
    bytes.extend(fixture("issue.cbr"));
    let archive = ArchiveBuffer::new("mislabelled-rar.cbz", bytes);

    let result = convert_single(archive, &config()).await.unwrap();
    assert_eq!(result.filename, "mislabelled-rar.pdf");
    assert_eq!(page_image_widths(&result.pdf), vec![10, 20, 100]);
}

#[tokio::test]
async fn test_rar_entry_with_bad_crc_is_dropped() {
    let archive = ArchiveBuffer::new("damaged.cbr", fixture("damaged.cbr"));
    let result = convert_single(archive, &config()).await.unwrap();
    assert_eq!(page_image_widths(&result.pdf), vec![10, 30]);
    assert_eq!(result.stats.total_pages, 3);
    assert_eq!(result.stats.rendered_pages, 2);
    assert_eq!(result.stats.failed_pages, 1);
}

#[tokio::test]
async fn test_zip_signature_beats_cbr_extension() {
    let archive = cbz("really-a-zip.cbr", &[("a.png", png(10))]);
    let result = convert_single(archive, &config()).await.unwrap();
    assert_eq!(page_image_widths(&result.pdf), vec![10]);
}

#[tokio::test]
async fn test_unknown_format() {
    let archive = ArchiveBuffer::new("notes.txt", b"hello world".to_vec());
    let err = convert_single(archive, &config()).await.unwrap_err();
    assert!(matches!(err, ComicError::UnknownFormat { .. }), "got: {err:?}");
    assert!(err.to_payload()["error"].as_str().unwrap().contains("notes.txt"));
}

#[tokio::test]
async fn test_undecodable_archive_reports_both_decoders() {
    let archive = ArchiveBuffer::new("garbage.cbz", b"not an archive at all".to_vec());
    let err = convert_single(archive, &config()).await.unwrap_err();
    assert!(matches!(err, ComicError::ExtractionFailed { .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_no_images_found() {
    let archive = cbz(
        "empty.cbz",
        &[
            ("ComicInfo.xml", b"<ComicInfo/>".to_vec()),
            ("__MACOSX/._p1.png", png(10)),
            ("._p2.png", png(10)),
        ],
    );
    let err = convert_single(archive, &config()).await.unwrap_err();
    assert!(matches!(err, ComicError::NoImagesFound { .. }), "got: {err:?}");
}

// ── Editor conversion ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_editor_order_and_inclusion() {
    let editor = vec![
        EditorPage {
            index: 2,
            included: true,
            background_color: BackgroundColor::Black,
        },
        EditorPage {
            index: 0,
            included: true,
            background_color: BackgroundColor::White,
        },
        EditorPage {
            index: 1,
            included: false,
            background_color: BackgroundColor::White,
        },
    ];

    let result = convert_single_with_editor(numbered_cbz("edit.cbz", 3), editor, &config())
        .await
        .unwrap();
    assert_eq!(page_image_widths(&result.pdf), vec![30, 10]);
    assert_eq!(page_backgrounds(&result.pdf), vec![BLACK, WHITE]);
    assert_eq!(result.stats.rendered_pages, 2);
}

#[tokio::test]
async fn test_editor_from_json_skips_out_of_range() {
    let editor = comic2pdf::parse_editor_data(
        r#"[{"index": 7, "included": true}, {"index": 1, "included": true, "backgroundColor": "purple"}]"#,
    )
    .unwrap();

    let result = convert_single_with_editor(numbered_cbz("json.cbz", 2), editor, &config())
        .await
        .unwrap();
    assert_eq!(page_image_widths(&result.pdf), vec![20]);
}

#[tokio::test]
async fn test_editor_excluding_everything_is_an_error() {
    let editor = vec![EditorPage {
        index: 0,
        included: false,
        background_color: BackgroundColor::White,
    }];
    let err = convert_single_with_editor(numbered_cbz("none.cbz", 2), editor, &config())
        .await
        .unwrap_err();
    assert!(matches!(err, ComicError::NoPagesRendered { .. }), "got: {err:?}");
}

// ── Batch conversion ─────────────────────────────────────────────────────────

fn entry(archive: ArchiveBuffer) -> BatchEntry {
    BatchEntry::new(archive, RenderOptions::default())
}

#[tokio::test]
async fn test_batch_bundles_successes_and_skips_failures() {
    let entries = vec![
        entry(numbered_cbz("a.cbz", 2)),
        entry(ArchiveBuffer::new("bad.cbz", b"nope".to_vec())),
        entry(numbered_cbz("b.cbz", 1)),
    ];

    let output = convert_batch(entries, &config()).await.unwrap();
    assert_eq!(output.filename(), "converted_comics.zip");
    assert_eq!(output.mime_type(), "application/zip");
    assert_eq!(output.converted(), 2);
    assert_eq!(output.failures().len(), 1);
    assert_eq!(output.failures()[0].filename, "bad.cbz");

    let mut zip = zip::ZipArchive::new(Cursor::new(output.bytes().to_vec())).unwrap();
    let names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf"]);

    let mut member = Vec::new();
    std::io::Read::read_to_end(&mut zip.by_name("a.pdf").unwrap(), &mut member).unwrap();
    assert_eq!(page_image_widths(&member), vec![10, 20]);
}

#[tokio::test]
async fn test_batch_single_success_returns_pdf() {
    let entries = vec![
        entry(ArchiveBuffer::new("bad.cbr", b"nope".to_vec())),
        entry(numbered_cbz("only.cbz", 2)),
    ];

    let output = convert_batch(entries, &config()).await.unwrap();
    match &output {
        BatchOutput::Single { result, failures } => {
            assert_eq!(result.filename, "only.pdf");
            assert_eq!(failures.len(), 1);
        }
        other => panic!("expected a single PDF, got {other:?}"),
    }
    assert_eq!(output.mime_type(), "application/pdf");
}

#[tokio::test]
async fn test_batch_all_failed() {
    let entries = vec![
        entry(ArchiveBuffer::new("x.cbz", b"1".to_vec())),
        entry(ArchiveBuffer::new("y.txt", b"2".to_vec())),
    ];
    let err = convert_batch(entries, &config()).await.unwrap_err();
    assert!(
        matches!(err, ComicError::AllConversionsFailed { total: 2, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_batch_duplicate_names_are_disambiguated() {
    let entries = vec![
        entry(numbered_cbz("same.cbz", 1)),
        entry(numbered_cbz("same.cbr", 1)),
    ];
    let output = convert_batch(entries, &config()).await.unwrap();
    match output {
        BatchOutput::Bundle { bundle, .. } => {
            let names: Vec<&str> = bundle.members.iter().map(|m| m.filename.as_str()).collect();
            assert_eq!(names, vec!["same.pdf", "same (2).pdf"]);
        }
        other => panic!("expected a bundle, got {other:?}"),
    }
}

// ── Combine conversion ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_combine_preserves_archive_then_page_order() {
    let archives = vec![
        numbered_cbz("vol1.cbz", 2),
        ArchiveBuffer::new("broken.cbz", b"zzz".to_vec()),
        cbz("vol2.cbz", &[("b.png", png(70)), ("a.png", png(50))]),
    ];

    let result = convert_combine(archives, &config()).await.unwrap();
    assert_eq!(result.filename, "combined.pdf");
    assert_eq!(page_image_widths(&result.pdf), vec![10, 20, 50, 70]);
    assert_eq!(result.stats.rendered_pages, 4);
}

#[tokio::test]
async fn test_combine_all_failed() {
    let archives = vec![ArchiveBuffer::new("a.cbz", b"1".to_vec())];
    let err = convert_combine(archives, &config()).await.unwrap_err();
    assert!(
        matches!(err, ComicError::AllConversionsFailed { total: 1, .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn test_combine_with_editor_skips_unlisted_archives() {
    let archives = vec![numbered_cbz("a.cbz", 3), numbered_cbz("b.cbz", 3)];
    let editor: CombinationEditorData = comic2pdf::parse_combination_editor_data(
        r#"{"a.cbz": [
              {"index": 1, "included": true, "backgroundColor": "black"},
              {"index": 0, "included": true}
           ]}"#,
    )
    .unwrap();

    let result = convert_combine_with_editor(archives, editor, &config())
        .await
        .unwrap();
    assert_eq!(page_image_widths(&result.pdf), vec![20, 10]);
}

// ── Queries ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_page_count() {
    assert_eq!(page_count(numbered_cbz("count.cbz", 4)).await.unwrap(), 4);
}

#[tokio::test]
async fn test_preview_thumbnails_in_natural_order() {
    let archive = cbz(
        "preview.cbz",
        &[
            ("p10.png", png(100)),
            ("p2.jpg", b"bad".to_vec()),
            ("p1.png", png(10)),
        ],
    );

    let output = preview(archive).await.unwrap();
    assert_eq!(output.total_pages, 3);
    let indexed: Vec<(usize, &str)> = output
        .thumbnails
        .iter()
        .map(|t| (t.index, t.name.as_str()))
        .collect();
    assert_eq!(indexed, vec![(0, "p1.png"), (2, "p10.png")]);
    assert!(output.thumbnails[0]
        .data_url()
        .starts_with("data:image/jpeg;base64,"));
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    completed: AtomicUsize,
    errors: AtomicUsize,
    failed_archives: Mutex<Vec<String>>,
    finished: Mutex<Option<(usize, usize)>>,
}

impl ConversionProgressCallback for Recorder {
    fn on_page_complete(&self, _archive: &str, _page_num: usize, _total_pages: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_page_error(&self, _archive: &str, _page_num: usize, _total: usize, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_archive_failed(&self, archive: &str, _error: &str) {
        self.failed_archives.lock().unwrap().push(archive.to_string());
    }

    fn on_conversion_complete(&self, total_archives: usize, succeeded: usize) {
        *self.finished.lock().unwrap() = Some((total_archives, succeeded));
    }
}

#[tokio::test]
async fn test_progress_events_for_batch() {
    let recorder = Arc::new(Recorder::default());
    let config = ConversionConfig::builder()
        .progress_callback(recorder.clone())
        .concurrency(2)
        .build()
        .unwrap();

    let entries = vec![
        entry(cbz("a.cbz", &[("1.png", png(10)), ("2.jpg", b"x".to_vec())])),
        entry(ArchiveBuffer::new("b.cbz", b"y".to_vec())),
        entry(numbered_cbz("c.cbz", 3)),
    ];
    convert_batch(entries, &config).await.unwrap();

    assert_eq!(recorder.completed.load(Ordering::SeqCst), 4);
    assert_eq!(recorder.errors.load(Ordering::SeqCst), 1);
    assert_eq!(*recorder.failed_archives.lock().unwrap(), vec!["b.cbz"]);
    assert_eq!(*recorder.finished.lock().unwrap(), Some((3, 2)));
}
