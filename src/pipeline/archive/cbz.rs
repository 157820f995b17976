//! ZIP-backed archives (`.cbz`).
//!
//! The reader keeps a borrowed slice of the upload and re-opens a
//! `ZipArchive` over an in-memory cursor per call; the central directory is
//! small, so this costs far less than holding decompressed pages.

use super::{is_image_entry, ArchiveError, ArchiveReader};
use crate::pipeline::detect::ArchiveFormat;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use tracing::warn;
use zip::ZipArchive;

/// Upper bound on the up-front allocation for one entry; the declared size
/// in a hostile archive cannot be trusted.
const MAX_PREALLOC: u64 = 64 * 1024 * 1024;

pub struct ZipReader<'a> {
    data: &'a [u8],
}

impl<'a> ZipReader<'a> {
    /// Validate the central directory and wrap `data`.
    pub fn open(data: &'a [u8]) -> Result<Self, ArchiveError> {
        ZipArchive::new(Cursor::new(data))?;
        Ok(Self { data })
    }

    fn archive(&self) -> Result<ZipArchive<Cursor<&'a [u8]>>, ArchiveError> {
        Ok(ZipArchive::new(Cursor::new(self.data))?)
    }
}

impl ArchiveReader for ZipReader<'_> {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Zip
    }

    fn list_entries(&self) -> Result<Vec<String>, ArchiveError> {
        let mut archive = self.archive()?;
        let mut names = Vec::new();
        for i in 0..archive.len() {
            let file = archive.by_index_raw(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            if is_image_entry(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn materialize(&self, names: &HashSet<String>) -> Result<HashMap<String, Vec<u8>>, ArchiveError> {
        let mut archive = self.archive()?;
        let mut out = HashMap::with_capacity(names.len());
        for name in names {
            let mut file = match archive.by_name(name) {
                Ok(f) => f,
                Err(e) => {
                    warn!("ZIP entry '{}' could not be opened: {}", name, e);
                    continue;
                }
            };
            let mut buf = Vec::with_capacity(file.size().min(MAX_PREALLOC) as usize);
            match file.read_to_end(&mut buf) {
                Ok(_) => {
                    out.insert(name.clone(), buf);
                }
                Err(e) => warn!("ZIP entry '{}' could not be decompressed: {}", name, e),
            }
        }
        Ok(out)
    }
}
