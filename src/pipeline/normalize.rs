//! Image normalisation: arbitrary page bytes → canonical PNG or JPEG.
//!
//! Comic archives mix JPEG, PNG, GIF and WebP pages, sometimes with stripped
//! or wrong metadata. Every page is decoded and re-encoded so the PDF stage
//! only ever embeds two well-formed formats, and its pixel size is read back
//! from the re-encoded bytes rather than trusted from the source.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::error::{EncodingError, ImageFormatHint, LimitError, LimitErrorKind};
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// PNG signature prefix used when the entry name gives no hint.
const PNG_MAGIC: [u8; 2] = [0x89, 0x50];

/// Output encoding of a normalised page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    /// PNG when the entry is named `.png` or its bytes start with the PNG
    /// signature; JPEG for everything else (including GIF and WebP sources).
    pub fn for_entry(name: &str, bytes: &[u8]) -> Self {
        let png_by_name = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if png_by_name || bytes.starts_with(&PNG_MAGIC) {
            ImageKind::Png
        } else {
            ImageKind::Jpeg
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            ImageKind::Png => ImageFormat::Png,
            ImageKind::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// A re-encoded page and its authoritative pixel size.
#[derive(Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for NormalizedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizedImage")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("kind", &self.kind)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// PNG compression level for a quality setting: `quality / 20`, so 1–100 maps to 0–5.
pub fn png_compression_level(quality: u8) -> u8 {
    quality.clamp(1, 100) / 20
}

/// Deflate setting for a PNG compression level: 0 stores, 1–5 are zlib levels.
fn compression_type(level: u8) -> CompressionType {
    match level {
        0 => CompressionType::Uncompressed,
        n => CompressionType::Level(n),
    }
}

/// Decode `bytes` and re-encode them as `kind` at `quality` (1–100).
pub fn normalize(bytes: &[u8], kind: ImageKind, quality: u8) -> Result<NormalizedImage, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let encoded = match kind {
        ImageKind::Png => encode_png(&img, quality)?,
        ImageKind::Jpeg => encode_jpeg(&img, quality)?,
    };

    let (width, height) =
        ImageReader::with_format(Cursor::new(encoded.as_slice()), kind.image_format()).into_dimensions()?;
    debug!(
        "Normalised {} → {:?} {}x{} ({} bytes)",
        bytes.len(),
        kind,
        width,
        height,
        encoded.len()
    );

    Ok(NormalizedImage {
        bytes: encoded,
        kind,
        width,
        height,
    })
}

fn encode_png(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let canonical = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let mut buf = Vec::new();
    let encoder = PngEncoder::new_with_quality(
        &mut buf,
        compression_type(png_compression_level(quality)),
        FilterType::Adaptive,
    );
    canonical.write_with_encoder(encoder)?;
    Ok(buf)
}

/// Progressive JPEG at `quality`, with any alpha flattened onto white.
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = flatten_onto_white(img);
    let (width, height) = match (u16::try_from(rgb.width()), u16::try_from(rgb.height())) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(ImageError::Limits(LimitError::from_kind(
                LimitErrorKind::DimensionError,
            )))
        }
    };

    let mut buf = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut buf, quality.clamp(1, 100));
    encoder.set_progressive(true);
    encoder
        .encode(rgb.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
        .map_err(|e| {
            ImageError::Encoding(EncodingError::new(
                ImageFormatHint::Exact(ImageFormat::Jpeg),
                e,
            ))
        })?;
    Ok(buf)
}

/// JPEG has no alpha channel; transparent GIF/WebP pixels are composited
/// onto white instead of whatever color the dropped channel happened to hide.
fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * a + 255 * (255 - a)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
