//! Configuration types for comic-archive-to-PDF conversion.
//!
//! All archive-wide behaviour is controlled through [`ConversionConfig`],
//! built via its [`ConversionConfigBuilder`]. Per-page overrides coming from
//! an editor are modelled separately as [`EditorPage`] lists, because they
//! replace the archive-wide page selection and background rather than tweak
//! them.

use crate::error::ComicError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Quality used when the caller supplies none (or something non-numeric).
pub const DEFAULT_QUALITY: u8 = 75;

/// Configuration for a conversion request.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use comic2pdf::{BackgroundColor, ConversionConfig, PageSelection};
///
/// let config = ConversionConfig::builder()
///     .quality(90)
///     .background(BackgroundColor::Black)
///     .pages(PageSelection::Range(2, 10))
///     .build()
///     .unwrap();
/// assert_eq!(config.quality, 90);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Re-encoding quality, 1–100. Default: 75.
    ///
    /// JPEG pages use it directly; PNG pages map it onto a compression level
    /// of `quality / 20` (0–5).
    pub quality: u8,

    /// Archive-wide page background. Default: white.
    ///
    /// Editor-driven workflows ignore it in favour of each page's own color.
    pub background: BackgroundColor,

    /// Page selection for single convert. Default: all pages.
    ///
    /// Batch and combine workflows always convert every page.
    pub pages: PageSelection,

    /// Number of archives a batch converts at once. Default: 4.
    pub concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional receiver for per-archive and per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            background: BackgroundColor::default(),
            pages: PageSelection::default(),
            concurrency: 4,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("quality", &self.quality)
            .field("background", &self.background)
            .field("pages", &self.pages)
            .field("concurrency", &self.concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The quality/background pair applied to every page of one archive.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            quality: self.quality,
            background: self.background,
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn quality(mut self, quality: u8) -> Self {
        self.config.quality = quality.clamp(1, 100);
        self
    }

    pub fn background(mut self, color: BackgroundColor) -> Self {
        self.config.background = color;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ComicError> {
        if self.config.download_timeout_secs == 0 {
            return Err(ComicError::InvalidConfig(
                "Download timeout must be at least 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Parse a caller-supplied quality value.
///
/// Absent or non-numeric input yields [`DEFAULT_QUALITY`]; numeric input is
/// clamped into 1–100.
pub fn parse_quality(raw: Option<&str>) -> u8 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .map(|q| q.clamp(1, 100) as u8)
        .unwrap_or(DEFAULT_QUALITY)
}

/// Quality and background applied to one archive's pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub quality: u8,
    pub background: BackgroundColor,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            background: BackgroundColor::White,
        }
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Solid fill painted edge-to-edge behind each page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundColor {
    #[default]
    White,
    Black,
}

impl BackgroundColor {
    /// Lenient parse: `black` (any case) is black, everything else is white.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("black") {
            BackgroundColor::Black
        } else {
            BackgroundColor::White
        }
    }

    /// DeviceRGB components in 0.0–1.0.
    pub fn rgb(self) -> [f32; 3] {
        match self {
            BackgroundColor::White => [1.0, 1.0, 1.0],
            BackgroundColor::Black => [0.0, 0.0, 0.0],
        }
    }
}

impl<'de> Deserialize<'de> for BackgroundColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(BackgroundColor::parse).unwrap_or_default())
    }
}

impl fmt::Display for BackgroundColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackgroundColor::White => f.write_str("white"),
            BackgroundColor::Black => f.write_str("black"),
        }
    }
}

/// Specifies which pages of the natural-sorted archive a single convert renders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
}

impl PageSelection {
    /// Expand the selection into ascending 0-indexed positions.
    ///
    /// Both bounds are clamped into `[1, total_pages]`; a range whose start
    /// ends up past its end selects nothing.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Range(start, end) => {
                if total_pages == 0 {
                    return Vec::new();
                }
                let s = (*start).clamp(1, total_pages);
                let e = (*end).clamp(1, total_pages);
                (s - 1..e).collect()
            }
        }
    }
}

/// One entry of editor data: which natural-sorted page to render and how.
///
/// Deserialised from the camelCase JSON an editor front end sends:
/// `{"index": 0, "included": true, "backgroundColor": "black"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorPage {
    /// Position in the natural-sorted entry list (0-indexed).
    pub index: usize,
    /// Only pages with `included = true` are rendered.
    #[serde(default)]
    pub included: bool,
    /// Per-page background; missing or unrecognised values mean white.
    #[serde(default)]
    pub background_color: BackgroundColor,
}

/// Editor data per source archive, keyed by the archive's filename.
pub type CombinationEditorData = HashMap<String, Vec<EditorPage>>;

/// Parse a single-archive editor data document (a JSON array).
pub fn parse_editor_data(json: &str) -> Result<Vec<EditorPage>, ComicError> {
    serde_json::from_str(json).map_err(|e| ComicError::InvalidEditorData(e.to_string()))
}

/// Parse a combination editor data document (a JSON object of arrays).
pub fn parse_combination_editor_data(json: &str) -> Result<CombinationEditorData, ComicError> {
    serde_json::from_str(json).map_err(|e| ComicError::InvalidEditorData(e.to_string()))
}
