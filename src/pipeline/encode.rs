//! Thumbnail encoding: page bytes → small base64 JPEG for previews.
//!
//! Previews go to a browser as JSON, so each thumbnail is a base64 string.
//! JPEG at quality 60 keeps a hundred thumbnails in the low megabytes; the
//! editor only needs to recognise the page, not read it.

use crate::output::Thumbnail;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::debug;

/// Thumbnail width in pixels; height follows the page's aspect ratio.
pub const THUMBNAIL_WIDTH: u32 = 300;
/// JPEG quality used for thumbnails.
pub const THUMBNAIL_QUALITY: u8 = 60;

/// Decode a page, resize it to [`THUMBNAIL_WIDTH`] wide and wrap it as a
/// base64 JPEG [`Thumbnail`].
pub fn encode_thumbnail(index: usize, name: &str, bytes: &[u8]) -> Result<Thumbnail, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let small = img.resize(THUMBNAIL_WIDTH, u32::MAX, FilterType::Triangle);
    let rgb = small.to_rgb8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, THUMBNAIL_QUALITY).encode_image(&rgb)?;

    let data = STANDARD.encode(&buf);
    debug!("Thumbnail '{}' → {}x{}, {} bytes base64", name, rgb.width(), rgb.height(), data.len());

    Ok(Thumbnail {
        index,
        name: name.to_string(),
        mime_type: "image/jpeg".to_string(),
        data,
    })
}
