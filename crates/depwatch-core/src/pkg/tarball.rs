//! Tarball download and inspection.

use super::error::PkgError;
use bytes::{Bytes, BytesMut};
use flate2::read::GzDecoder;
use futures::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tar::Archive;

/// Maximum tarball size (200 MB).
pub const MAX_TARBALL_SIZE: u64 = 200 * 1024 * 1024;

/// Per-request timeout for tarball downloads, longer than the packument timeout.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Stream a tarball into memory, refusing to buffer more than `max_bytes`.
///
/// An advertised `Content-Length` over the limit fails before any body is
/// read; chunked responses are cut off as soon as they cross it.
///
/// # Errors
/// Returns `PKG_DOWNLOAD_FAILED` on transport errors, non-success status, or
/// an oversized body.
pub async fn download_tarball(
    client: &Client,
    url: &str,
    max_bytes: u64,
) -> Result<Bytes, PkgError> {
    let too_large = |size: u64| {
        PkgError::download_failed(format!(
            "Tarball too large: {size} bytes (max: {max_bytes})"
        ))
    };

    let response = client
        .get(url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| PkgError::download_failed(format!("GET {url}: {e}")))?;

    let expected = response.content_length();
    if let Some(len) = expected.filter(|len| *len > max_bytes) {
        return Err(too_large(len));
    }
    tracing::debug!(url, expected, "downloading tarball");

    let capacity = expected.map_or(0, |len| usize::try_from(len).unwrap_or(0));
    let mut body = BytesMut::with_capacity(capacity);
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk =
            chunk.map_err(|e| PkgError::download_failed(format!("Reading body of {url}: {e}")))?;
        let received = (body.len() + chunk.len()) as u64;
        if received > max_bytes {
            return Err(too_large(received));
        }
        body.extend_from_slice(&chunk);
    }

    tracing::trace!(url, size = body.len(), "tarball downloaded");
    Ok(body.freeze())
}

/// File statistics of a `.tgz`, comparable to `dist.fileCount` and
/// `dist.unpackedSize`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TarballStats {
    pub file_count: u64,
    pub unpacked_size: u64,
}

/// Count regular files and their total size without extracting to disk.
///
/// # Errors
/// Returns an error if the archive is not a readable gzip'd tar.
pub fn tarball_stats(bytes: &[u8]) -> Result<TarballStats, PkgError> {
    let mut archive = Archive::new(GzDecoder::new(bytes));
    let mut stats = TarballStats::default();

    let entries = archive
        .entries()
        .map_err(|e| PkgError::download_failed(format!("Failed to read tarball: {e}")))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| PkgError::download_failed(format!("Corrupt tarball entry: {e}")))?;
        if entry.header().entry_type().is_file() {
            stats.file_count += 1;
            stats.unpacked_size += entry.size();
        }
    }

    Ok(stats)
}
