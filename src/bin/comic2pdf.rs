//! CLI binary for comic2pdf.
//!
//! A thin shim over the library crate that maps subcommands and flags
//! to `ConversionConfig` and writes the resulting artifacts.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comic2pdf::{
    convert_batch, convert_combine, convert_combine_with_editor, convert_single,
    convert_single_with_editor, page_count, parse_combination_editor_data, parse_editor_data,
    parse_quality, preview, resolve_input, resolve_inputs, write_output, ArchiveBuffer,
    BackgroundColor, BatchEntry, ComicError, ConversionConfig, ConversionProgressCallback,
    ConversionResult, PageSelection, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

/// Terminal progress callback: one bar counting pages across all archives,
/// plus a log line per archive and per dropped page. The bar grows as each
/// archive reports how many pages it selected.
struct CliProgressCallback {
    bar: ProgressBar,
    page_errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} pages  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Opening");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_errors: AtomicUsize::new(0),
        })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_archives: usize) {
        let noun = if total_archives == 1 { "archive" } else { "archives" };
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_archives} {noun}…"))
        ));
    }

    fn on_archive_start(&self, archive: &str, selected_pages: usize) {
        self.bar.inc_length(selected_pages as u64);
        self.bar.set_prefix("Converting");
        self.bar.set_message(archive.to_string());
        self.bar.println(format!(
            "  {} {}  {}",
            cyan("›"),
            archive,
            dim(&format!("{selected_pages} pages"))
        ));
    }

    fn on_page_complete(&self, _archive: &str, _page_num: usize, _total_pages: usize) {
        self.bar.inc(1);
    }

    fn on_page_error(&self, archive: &str, page_num: usize, total_pages: usize, error: &str) {
        self.page_errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {} page {:>3}/{:<3}  {}",
            red("✗"),
            archive,
            page_num,
            total_pages,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_archive_failed(&self, archive: &str, error: &str) {
        self.bar
            .println(format!("  {} {}  {}", red("✘"), archive, red(error)));
    }

    fn on_conversion_complete(&self, total_archives: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = total_archives.saturating_sub(succeeded);
        let dropped = self.page_errors.load(Ordering::SeqCst);

        if failed == 0 && dropped == 0 {
            eprintln!(
                "{} {} archives converted successfully",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} archives converted  ({} failed, {} pages dropped)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total_archives,
                red(&failed.to_string()),
                red(&dropped.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a whole comic
  comic2pdf convert issue-01.cbz

  # Pages 3 to 10 on black, written to a chosen path
  comic2pdf convert issue-01.cbr --start 3 --end 10 --background black -o out/issue.pdf

  # Reorder and recolour pages with editor data
  comic2pdf convert issue-01.cbz --editor-data pages.json

  # One PDF per archive (zipped when more than one converts)
  comic2pdf batch *.cbz -o converted.zip

  # Merge several archives into one PDF
  comic2pdf combine vol1.cbz vol2.cbr vol3.cbz -o omnibus.pdf

  # Page count and thumbnails for an editor front end
  comic2pdf pages issue-01.cbz
  comic2pdf preview issue-01.cbz --json > preview.json

EDITOR DATA:
  convert:  [{"index": 2, "included": true, "backgroundColor": "black"}, ...]
  combine:  {"vol1.cbz": [{"index": 0, "included": true}], "vol2.cbr": [...]}

  Indices are 0-based positions in natural page order. Only included pages
  are rendered, in the order listed. When combining with editor data,
  archives missing from the map are skipped.

ENVIRONMENT VARIABLES:
  COMIC2PDF_QUALITY       Image quality 1-100 (default 75)
  COMIC2PDF_BACKGROUND    white or black (default white)
  COMIC2PDF_CONCURRENCY   Archives converted at once in batch mode
  RUST_LOG                Override the log filter (e.g. comic2pdf=debug)
"#;

/// Convert comic-book archives (CBR/CBZ) to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "comic2pdf",
    version,
    about = "Convert comic-book archives (CBR/CBZ) to PDF",
    long_about = "Convert comic-book archives (local files or URLs) into PDFs with one image per \
A4 page. RAR and ZIP archives are detected from their content, so mislabelled .cbr/.cbz files \
still convert.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output structured JSON on stdout; errors become {"error": "..."}.
    #[arg(long, global = true, env = "COMIC2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "COMIC2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "COMIC2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "COMIC2PDF_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, global = true, env = "COMIC2PDF_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one archive into one PDF.
    Convert {
        /// Local archive path or HTTP/HTTPS URL.
        input: String,

        /// First page to include (1-indexed).
        #[arg(long, env = "COMIC2PDF_START")]
        start: Option<usize>,

        /// Last page to include (1-indexed, inclusive).
        #[arg(long, env = "COMIC2PDF_END")]
        end: Option<usize>,

        /// JSON editor data choosing order, inclusion and background per page.
        #[arg(long, env = "COMIC2PDF_EDITOR_DATA", conflicts_with_all = ["start", "end"])]
        editor_data: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Convert each archive into its own PDF; several results are zipped.
    Batch {
        /// Local archive paths or HTTP/HTTPS URLs.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Archives converted at once.
        #[arg(short, long, env = "COMIC2PDF_CONCURRENCY", default_value_t = 4)]
        concurrency: usize,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Merge several archives into one PDF, in the order given.
    Combine {
        /// Local archive paths or HTTP/HTTPS URLs.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// JSON object mapping archive filename to its editor data.
        #[arg(long, env = "COMIC2PDF_EDITOR_DATA")]
        editor_data: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// Print the number of image pages in an archive.
    Pages {
        /// Local archive path or HTTP/HTTPS URL.
        input: String,
    },

    /// Produce small JPEG thumbnails of the first pages.
    Preview {
        /// Local archive path or HTTP/HTTPS URL.
        input: String,

        /// Also write each thumbnail as NNN.jpg into this directory.
        #[arg(long, env = "COMIC2PDF_PREVIEW_DIR")]
        out_dir: Option<PathBuf>,
    },
}

/// Flags shared by every subcommand that writes a PDF.
#[derive(Args, Debug)]
struct RenderArgs {
    /// Write the artifact here instead of next to the current directory.
    #[arg(short, long, env = "COMIC2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Page background: white or black (anything else means white).
    #[arg(long, env = "COMIC2PDF_BACKGROUND", default_value = "white")]
    background: String,

    /// Image quality 1-100; invalid values fall back to 75.
    #[arg(long, env = "COMIC2PDF_QUALITY")]
    quality: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    match run(&cli, progress_cb).await {
        Ok(()) => Ok(()),
        Err(e) if cli.json => {
            let payload = e
                .downcast_ref::<ComicError>()
                .map(ComicError::to_payload)
                .unwrap_or_else(|| serde_json::json!({ "error": format!("{e:#}") }));
            println!("{payload}");
            std::process::exit(1);
        }
        Err(e) => Err(e),
    }
}

async fn run(cli: &Cli, progress: Option<ProgressCallback>) -> Result<()> {
    match &cli.command {
        Command::Convert {
            input,
            start,
            end,
            editor_data,
            render,
        } => {
            let pages = match (start, end) {
                (None, None) => PageSelection::All,
                (s, e) => PageSelection::Range(s.unwrap_or(1), e.unwrap_or(usize::MAX)),
            };
            let config = build_config(render, 1, cli.download_timeout, progress)?.pages(pages);
            let config = config.build().context("Invalid configuration")?;
            let archive = load(input, &config).await?;

            let result = match editor_data {
                Some(path) => {
                    let editor = parse_editor_data(&read_text(path).await?)?;
                    convert_single_with_editor(archive, editor, &config).await
                }
                None => convert_single(archive, &config).await,
            }
            .context("Conversion failed")?;

            let path = target_path(&render.output, &result.filename);
            write_output(&path, &result.pdf).await?;
            report_result(cli, &result, &path)
        }

        Command::Batch {
            inputs,
            concurrency,
            render,
        } => {
            let config = build_config(render, *concurrency, cli.download_timeout, progress)?
                .build()
                .context("Invalid configuration")?;
            let options = config.render_options();

            let (loaded, load_failures) =
                resolve_inputs(inputs, config.download_timeout_secs).await;
            if loaded.is_empty() {
                let first_error = load_failures
                    .first()
                    .map(|f| format!("{}: {}", f.filename, f.error))
                    .unwrap_or_default();
                return Err(ComicError::AllConversionsFailed {
                    total: inputs.len(),
                    first_error,
                })
                .context("Batch conversion failed");
            }
            let entries = loaded
                .into_iter()
                .map(|archive| BatchEntry::new(archive, options))
                .collect();

            let output = convert_batch(entries, &config)
                .await
                .context("Batch conversion failed")?
                .with_failures(load_failures);
            let path = target_path(&render.output, output.filename());
            write_output(&path, output.bytes()).await?;

            if cli.json {
                let members: Vec<&ConversionResult> = match &output {
                    comic2pdf::BatchOutput::Single { result, .. } => vec![result],
                    comic2pdf::BatchOutput::Bundle { bundle, .. } => bundle.members.iter().collect(),
                };
                let json = serde_json::json!({
                    "output": path,
                    "mimeType": output.mime_type(),
                    "converted": members,
                    "failures": output.failures(),
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json).context("Failed to serialise output")?
                );
            } else if !cli.quiet {
                eprintln!(
                    "{}  {} converted, {} skipped  →  {}",
                    if output.failures().is_empty() { green("✔") } else { cyan("⚠") },
                    output.converted(),
                    output.failures().len(),
                    bold(&path.display().to_string()),
                );
            }
            Ok(())
        }

        Command::Combine {
            inputs,
            editor_data,
            render,
        } => {
            let config = build_config(render, 1, cli.download_timeout, progress)?
                .build()
                .context("Invalid configuration")?;

            let mut archives = Vec::with_capacity(inputs.len());
            for input in inputs {
                archives.push(load(input, &config).await?);
            }

            let result = match editor_data {
                Some(path) => {
                    let editor = parse_combination_editor_data(&read_text(path).await?)?;
                    convert_combine_with_editor(archives, editor, &config).await
                }
                None => convert_combine(archives, &config).await,
            }
            .context("Combine failed")?;

            let path = target_path(&render.output, &result.filename);
            write_output(&path, &result.pdf).await?;
            report_result(cli, &result, &path)
        }

        Command::Pages { input } => {
            let archive = resolve_input(input, cli.download_timeout).await?;
            let filename = archive.filename.clone();
            let count = page_count(archive).await.context("Failed to read archive")?;
            if cli.json {
                println!("{}", serde_json::json!({ "filename": filename, "pageCount": count }));
            } else {
                println!("{count}");
            }
            Ok(())
        }

        Command::Preview { input, out_dir } => {
            let archive = resolve_input(input, cli.download_timeout).await?;
            let filename = archive.filename.clone();
            let output = preview(archive).await.context("Preview failed")?;

            if let Some(dir) = out_dir {
                write_thumbnails(dir, &output.thumbnails).await?;
            }

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&output).context("Failed to serialise preview")?
                );
            } else {
                println!("File:         {filename}");
                println!("Pages:        {}", output.total_pages);
                println!("Thumbnails:   {}", output.thumbnails.len());
                for t in &output.thumbnails {
                    println!("  {:>4}  {}", t.index, dim(&t.name));
                }
            }
            Ok(())
        }
    }
}

/// Map shared render flags to a config builder; callers add the rest.
fn build_config(
    render: &RenderArgs,
    concurrency: usize,
    download_timeout: u64,
    progress: Option<ProgressCallback>,
) -> Result<comic2pdf::ConversionConfigBuilder> {
    let mut builder = ConversionConfig::builder()
        .quality(parse_quality(render.quality.as_deref()))
        .background(BackgroundColor::parse(&render.background))
        .concurrency(concurrency)
        .download_timeout_secs(download_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    Ok(builder)
}

async fn load(input: &str, config: &ConversionConfig) -> Result<ArchiveBuffer> {
    resolve_input(input, config.download_timeout_secs)
        .await
        .with_context(|| format!("Failed to load '{input}'"))
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read editor data from {:?}", path))
}

fn target_path(output: &Option<PathBuf>, default_name: &str) -> PathBuf {
    output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_name))
}

fn report_result(cli: &Cli, result: &ConversionResult, path: &Path) -> Result<()> {
    if cli.json {
        let json = serde_json::json!({ "output": path, "result": result });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        let stats = &result.stats;
        eprintln!(
            "{}  {}/{} pages  {}ms  →  {}",
            if stats.failed_pages == 0 { green("✔") } else { cyan("⚠") },
            stats.rendered_pages,
            stats.selected_pages,
            stats.duration_ms,
            bold(&path.display().to_string()),
        );
    }
    Ok(())
}

async fn write_thumbnails(dir: &Path, thumbnails: &[comic2pdf::Thumbnail]) -> Result<()> {
    use base64::Engine;

    for t in thumbnails {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&t.data)
            .context("Thumbnail is not valid base64")?;
        write_output(dir.join(format!("{:03}.jpg", t.index)), &bytes).await?;
    }
    Ok(())
}
