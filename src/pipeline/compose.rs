//! Page composition: one normalised image per A4 page, assembled with lopdf.
//!
//! Every page is a full-bleed canvas: a background rectangle covering the
//! whole MediaBox, then the image scaled (aspect preserved) to the full width
//! or the full height of the canvas, whichever keeps it inside both bounds,
//! and centred on the other axis.

use crate::config::BackgroundColor;
use crate::error::ComicError;
use crate::pipeline::normalize::{ImageKind, NormalizedImage};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::ImageFormat;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;
use thiserror::Error;
use tracing::debug;

/// A4 portrait width in points.
pub const A4_WIDTH: f32 = 595.28;
/// A4 portrait height in points.
pub const A4_HEIGHT: f32 = 841.89;

/// Resource name of the page image inside each page's XObject dictionary.
const IMAGE_NAME: &[u8] = b"Im1";

/// Why a single page could not be appended.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("image has zero width or height")]
    EmptyImage,

    #[error("could not decode normalised image: {0}")]
    Image(#[from] image::ImageError),

    #[error("could not compress pixel data: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode page content: {0}")]
    Pdf(#[from] lopdf::Error),
}

/// Where the image lands on the canvas, in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Placement {
    /// Fit an `image_width` × `image_height` pixel image onto the A4 canvas.
    pub fn fit(image_width: u32, image_height: u32) -> Self {
        Self::fit_within(image_width, image_height, A4_WIDTH, A4_HEIGHT)
    }

    /// Fit onto an arbitrary canvas: full width first, full height if the
    /// image would otherwise overflow vertically.
    pub fn fit_within(image_width: u32, image_height: u32, canvas_width: f32, canvas_height: f32) -> Self {
        let iw = image_width as f32;
        let ih = image_height as f32;

        let mut width = canvas_width;
        let mut height = width * (ih / iw);
        if height > canvas_height {
            height = canvas_height;
            width = height * (iw / ih);
        }

        Self {
            x: (canvas_width - width) / 2.0,
            y: (canvas_height - height) / 2.0,
            width,
            height,
        }
    }
}

/// Incrementally builds one PDF, one page at a time.
///
/// A single assembler is owned by exactly one writer; combine workflows
/// thread theirs through every archive in order.
pub struct PdfAssembler {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAssembler {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append one page: background fill, then the centred image.
    ///
    /// On error nothing is added to the page tree, so a failed page leaves no
    /// blank page behind.
    pub fn render_page(
        &mut self,
        image: &NormalizedImage,
        background: BackgroundColor,
    ) -> Result<Placement, EmbedError> {
        if image.width == 0 || image.height == 0 {
            return Err(EmbedError::EmptyImage);
        }
        let placement = Placement::fit(image.width, image.height);
        let (mut image_dict, pixels, alpha) = image_stream_parts(image)?;

        if let Some(alpha) = alpha {
            let smask_dict = image_xobject_dict(image.width, image.height, b"DeviceGray", b"FlateDecode");
            let smask_id = self
                .doc
                .add_object(Stream::new(smask_dict, alpha).with_compression(false));
            image_dict.set("SMask", Object::Reference(smask_id));
        }
        let image_id = self
            .doc
            .add_object(Stream::new(image_dict, pixels).with_compression(false));

        let [r, g, b] = background.rgb();
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
                Operation::new(
                    "re",
                    vec![
                        Object::Real(0.0),
                        Object::Real(0.0),
                        Object::Real(A4_WIDTH),
                        Object::Real(A4_HEIGHT),
                    ],
                ),
                Operation::new("f", vec![]),
                Operation::new("Q", vec![]),
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(placement.width),
                        Object::Real(0.0),
                        Object::Real(0.0),
                        Object::Real(placement.height),
                        Object::Real(placement.x),
                        Object::Real(placement.y),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_NAME.to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.encode()?));

        let resources = Dictionary::from_iter([(
            "XObject",
            Object::Dictionary(Dictionary::from_iter([(
                "Im1",
                Object::Reference(image_id),
            )])),
        )]);

        let page_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(self.pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(A4_WIDTH),
                    Object::Real(A4_HEIGHT),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Dictionary(resources)),
        ]));
        self.kids.push(Object::Reference(page_id));

        debug!(
            "Page {}: {}x{} px → {:.2}x{:.2} pt at ({:.2}, {:.2}) on {}",
            self.kids.len(),
            image.width,
            image.height,
            placement.width,
            placement.height,
            placement.x,
            placement.y,
            background
        );
        Ok(placement)
    }

    /// Close the page tree and serialise the document.
    pub fn finish(mut self) -> Result<Vec<u8>, ComicError> {
        let total_pages = self.kids.len() as i64;
        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(self.kids)),
            ("Count", Object::Integer(total_pages)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        let info_id = self.doc.add_object(Dictionary::from_iter([(
            "Producer",
            Object::string_literal(concat!("comic2pdf ", env!("CARGO_PKG_VERSION"))),
        )]));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.trailer.set("Info", Object::Reference(info_id));
        self.doc.compress();

        let mut output = Vec::new();
        self.doc
            .save_to(&mut output)
            .map_err(|e| ComicError::PdfAssemblyFailed(e.to_string()))?;
        Ok(output)
    }
}

fn image_xobject_dict(width: u32, height: u32, color_space: &[u8], filter: &[u8]) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(i64::from(width))),
        ("Height", Object::Integer(i64::from(height))),
        ("ColorSpace", Object::Name(color_space.to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
        ("Filter", Object::Name(filter.to_vec())),
    ])
}

/// Image dictionary, pixel stream body, and optional alpha (SMask) body.
///
/// JPEG bytes embed as-is under DCTDecode. PNG pages are unpacked to raw RGB
/// (plus a separate alpha plane when present) and zlib-compressed.
fn image_stream_parts(image: &NormalizedImage) -> Result<(Dictionary, Vec<u8>, Option<Vec<u8>>), EmbedError> {
    match image.kind {
        ImageKind::Jpeg => Ok((
            image_xobject_dict(image.width, image.height, b"DeviceRGB", b"DCTDecode"),
            image.bytes.clone(),
            None,
        )),
        ImageKind::Png => {
            let decoded = image::load_from_memory_with_format(&image.bytes, ImageFormat::Png)?;
            let dict = image_xobject_dict(decoded.width(), decoded.height(), b"DeviceRGB", b"FlateDecode");
            if decoded.color().has_alpha() {
                let rgba = decoded.to_rgba8();
                let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
                let mut alpha = Vec::with_capacity(rgba.len() / 4);
                for px in rgba.chunks_exact(4) {
                    rgb.extend_from_slice(&px[..3]);
                    alpha.push(px[3]);
                }
                Ok((dict, zlib(&rgb)?, Some(zlib(&alpha)?)))
            } else {
                Ok((dict, zlib(decoded.to_rgb8().as_raw())?, None))
            }
        }
    }
}

fn zlib(data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
