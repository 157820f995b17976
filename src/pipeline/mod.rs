//! Pipeline stages for comic-archive-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the orchestrator in [`crate::convert`] only wires
//! them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ detect ──▶ archive ──▶ sort ──▶ [select] ──▶ archive ──▶ normalize ──▶ compose
//! (path/URL) (magic)   (list)     (natural)             (materialize) (PNG/JPEG)   (A4 page)
//! ```
//!
//! 1. [`input`]     — turn a local path or URL into an in-memory archive buffer
//! 2. [`detect`]    — classify the buffer as RAR or ZIP (magic bytes, then extension)
//! 3. [`archive`]   — list image entries and decode only the selected ones;
//!    retries once under the other format when decoding fails
//! 4. [`sort`]      — order entry names the way a reader expects (`page9` < `page10`)
//! 5. [`normalize`] — re-encode each page as PNG or JPEG and read back its size
//! 6. [`compose`]   — place the image on an A4 canvas and append it to the PDF
//!
//! [`encode`] is the side branch used by previews: small base64 JPEG thumbnails.

pub mod archive;
pub mod compose;
pub mod detect;
pub mod encode;
pub mod input;
pub mod normalize;
pub mod sort;
