//! Input resolution: turn a user-supplied path or URL into an [`ArchiveBuffer`].
//!
//! The conversion core only ever sees bytes plus a declared filename; this
//! module is the CLI-facing edge that reads them from disk or downloads them.
//! No signature check happens here: a wrongly named archive is still handed
//! to the detector, which trusts magic bytes over the name.

use crate::error::ComicError;
use crate::output::{ArchiveBuffer, ArchiveFailure};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory archive.
///
/// If the input is a URL, download it; otherwise read the local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ArchiveBuffer, ComicError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

/// Resolve every input, keeping the ones that load.
///
/// An input that cannot be read or downloaded becomes an [`ArchiveFailure`]
/// named after the input string, so one bad path does not sink a batch.
pub async fn resolve_inputs(
    inputs: &[String],
    timeout_secs: u64,
) -> (Vec<ArchiveBuffer>, Vec<ArchiveFailure>) {
    let mut loaded = Vec::with_capacity(inputs.len());
    let mut failures = Vec::new();
    for input in inputs {
        match resolve_input(input, timeout_secs).await {
            Ok(buffer) => loaded.push(buffer),
            Err(e) => {
                warn!("Skipping '{}': {}", input, e);
                failures.push(ArchiveFailure {
                    filename: input.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    (loaded, failures)
}

/// Read a local archive, mapping the common I/O failures to distinct errors.
async fn read_local(path_str: &str) -> Result<ArchiveBuffer, ComicError> {
    let path = PathBuf::from(path_str);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ComicError::PermissionDenied { path });
        }
        Err(_) => return Err(ComicError::FileNotFound { path }),
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());
    debug!("Read local archive: {} ({} bytes)", path.display(), bytes.len());

    Ok(ArchiveBuffer::new(filename, bytes))
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ArchiveBuffer, ComicError> {
    info!("Downloading archive from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ComicError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ComicError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ComicError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ComicError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = extract_filename(url);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ComicError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded '{}' ({} bytes)", filename, bytes.len());
    Ok(ArchiveBuffer::new(filename, bytes.to_vec()))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.cbz".to_string()
}
