//! RAR-backed archives (`.cbr`).
//!
//! unrar only reads from the file system, so the upload is spilled into a
//! per-archive temp directory that is removed when the reader is dropped,
//! whether the conversion succeeded or not.

use super::{is_image_entry, ArchiveError, ArchiveReader};
use crate::pipeline::detect::ArchiveFormat;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::{debug, warn};
use unrar::Archive;

fn rar_error(e: impl Display) -> ArchiveError {
    ArchiveError::Rar(e.to_string())
}

pub struct RarReader {
    path: PathBuf,
    // Held for its Drop: deletes the spilled archive.
    _temp_dir: TempDir,
}

impl RarReader {
    /// Spill `data` to disk and check that unrar accepts it.
    pub fn open(data: &[u8]) -> Result<Self, ArchiveError> {
        let temp_dir = tempfile::Builder::new().prefix("comic2pdf-").tempdir()?;
        let path = temp_dir.path().join("archive.rar");
        std::fs::write(&path, data)?;
        Archive::new(&path).open_for_listing().map_err(rar_error)?;
        debug!("Spilled RAR archive to {}", path.display());
        Ok(Self {
            path,
            _temp_dir: temp_dir,
        })
    }
}

impl ArchiveReader for RarReader {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Rar
    }

    fn list_entries(&self) -> Result<Vec<String>, ArchiveError> {
        let listing = Archive::new(&self.path)
            .open_for_listing()
            .map_err(rar_error)?;
        let mut names = Vec::new();
        for header in listing {
            let header = header.map_err(rar_error)?;
            if header.is_directory() {
                continue;
            }
            let name = header.filename.to_string_lossy().into_owned();
            if is_image_entry(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    fn materialize(&self, names: &HashSet<String>) -> Result<HashMap<String, Vec<u8>>, ArchiveError> {
        let mut out = HashMap::with_capacity(names.len());
        let mut resume_at = 0;

        // A failed read consumes the open archive, so recovery means reopening
        // and skipping forward past the broken entry.
        loop {
            match self.walk(names, &mut out, resume_at)? {
                Walk::FailedAt(index) if index >= resume_at => resume_at = index + 1,
                _ => break,
            }
        }
        Ok(out)
    }
}

/// How one pass over the RAR headers ended.
enum Walk {
    Finished,
    FailedAt(usize),
}

impl RarReader {
    /// One sequential pass: read wanted entries at or after header `resume_at`,
    /// skip everything else.
    fn walk(
        &self,
        names: &HashSet<String>,
        out: &mut HashMap<String, Vec<u8>>,
        resume_at: usize,
    ) -> Result<Walk, ArchiveError> {
        let mut archive = Archive::new(&self.path)
            .open_for_processing()
            .map_err(rar_error)?;
        let mut index = 0;

        while out.len() < names.len() {
            let header = match archive.read_header() {
                Ok(Some(header)) => header,
                Ok(None) => break,
                Err(e) => {
                    warn!("RAR header {} could not be read: {}", index, e);
                    break;
                }
            };
            let name = header.entry().filename.to_string_lossy().into_owned();
            let wanted = index >= resume_at
                && !header.entry().is_directory()
                && names.contains(&name)
                && !out.contains_key(&name);

            archive = if wanted {
                match header.read() {
                    Ok((data, rest)) => {
                        out.insert(name, data);
                        rest
                    }
                    Err(e) => {
                        warn!("RAR entry '{}' could not be extracted: {}", name, e);
                        return Ok(Walk::FailedAt(index));
                    }
                }
            } else {
                match header.skip() {
                    Ok(rest) => rest,
                    Err(e) => {
                        warn!("RAR entry '{}' could not be skipped: {}", name, e);
                        return Ok(Walk::FailedAt(index));
                    }
                }
            };
            index += 1;
        }
        Ok(Walk::Finished)
    }
}
