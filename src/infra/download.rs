//! HTTP transfers
//!
//! Platform and tool archives are fetched into the staging directory, index
//! documents into the toolchain root. Either way the body is streamed into
//! `<dest>.part` and hashed on the way; only a complete body that matches
//! its index checksum is renamed over `dest`, so a previous copy survives a
//! failed transfer. Nothing is retried.

use std::ffi::OsString;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::error::DownloadError;

/// Progress callback receiving (`bytes_downloaded`, `total_bytes`)
///
/// `total_bytes` is 0 when the server sends no length.
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// HTTP client for archives, index documents and `ETag` lookups
#[derive(Debug, Clone)]
pub struct DownloadManager {
    client: reqwest::Client,
}

impl DownloadManager {
    /// Create a client with connect and transfer timeouts
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(600))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Fetch `url` into `dest`, returning the number of bytes written
    ///
    /// `checksum` is the index form `SHA-256:<hex>`; checksums using other
    /// algorithms are not verified.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        checksum: Option<&str>,
        progress: Option<ProgressCallback>,
    ) -> Result<u64, DownloadError> {
        let partial = part_path(dest);
        let result = self
            .fetch_verified(url, dest, &partial, checksum, progress.as_ref())
            .await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(&partial).await;
        }
        result
    }

    async fn fetch_verified(
        &self,
        url: &str,
        dest: &Path,
        partial: &Path,
        checksum: Option<&str>,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64, DownloadError> {
        let (size, digest) = self.stream_to(url, partial, progress).await?;
        if let Some(expected) = checksum.and_then(sha256_hex) {
            if !digest.eq_ignore_ascii_case(expected) {
                tracing::warn!("{url}: expected SHA-256 {expected}, got {digest}");
                return Err(DownloadError::ChecksumFailed {
                    file: dest.display().to_string(),
                });
            }
        }
        tokio::fs::rename(partial, dest)
            .await
            .map_err(|e| io_error(dest, e))?;
        Ok(size)
    }

    /// Stream the response body into `path`, returning size and hex digest
    async fn stream_to(
        &self,
        url: &str,
        path: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<(u64, String), DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;
        if !response.status().is_success() {
            return Err(network_error(url, format!("HTTP {}", response.status())));
        }
        let total = response.content_length().unwrap_or(0);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| io_error(path, e))?;

        let mut hasher = Sha256::new();
        let mut written: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| network_error(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| io_error(path, e))?;
            hasher.update(&chunk);
            written += chunk.len() as u64;
            if let Some(cb) = progress {
                cb(written, total);
            }
        }
        file.flush().await.map_err(|e| io_error(path, e))?;

        Ok((written, hex::encode(hasher.finalize())))
    }

    /// Fetch the remote `ETag` of a URL with a HEAD request
    ///
    /// Returns `None` when the server is unreachable or sends no `ETag`.
    pub async fn remote_etag(&self, url: &str) -> Option<String> {
        let response = self.client.head(url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim_matches('"').to_string())
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the hex digest from an index checksum (`SHA-256:<hex>`)
///
/// A bare 64-character hex string is accepted as well.
pub fn sha256_hex(checksum: &str) -> Option<&str> {
    match checksum.split_once(':') {
        Some((algo, digest)) if algo.eq_ignore_ascii_case("SHA-256") => Some(digest),
        Some(_) => None,
        None if checksum.len() == 64 && checksum.chars().all(|c| c.is_ascii_hexdigit()) => {
            Some(checksum)
        }
        None => None,
    }
}

/// `<dest>.part`
fn part_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

fn network_error(url: &str, error: impl Display) -> DownloadError {
    DownloadError::NetworkError {
        url: url.to_string(),
        error: error.to_string(),
    }
}

fn io_error(path: &Path, error: std::io::Error) -> DownloadError {
    DownloadError::IoError {
        path: path.to_path_buf(),
        error: error.to_string(),
    }
}
