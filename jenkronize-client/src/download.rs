//! Resumable artifact downloads
//!
//! Artifacts can be large and connections to CI servers flaky, so a download
//! that finds a partial file on disk asks the server for the missing tail
//! only. Repeating a download for the same URL and destination always
//! converges to the complete file.

use crate::JenkinsClient;
use crate::error::{ClientError, Result};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_RANGE, RANGE};
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

impl JenkinsClient {
    /// Download `url` into the file at `dest`, resuming a partial file
    ///
    /// The parent directory is created if absent.
    ///
    /// # Returns
    /// The final size of the file in bytes
    pub async fn download_file(&self, url: &str, dest: &Path) -> Result<u64> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::io(parent, e))?;
        }

        let url = self.resolve_url(url);
        let existing = match fs::metadata(dest).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => 0,
        };

        if existing == 0 {
            info!("Download starting: {}", url);
            let size = self.fetch_full(&url, dest).await?;
            info!("Download complete: {} ({} bytes)", url, size);
            return Ok(size);
        }

        info!("Download resuming at byte {}: {}", existing, url);
        let response = self
            .get(&url)
            .header(RANGE, format!("bytes={}-", existing))
            .send()
            .await
            .map_err(|e| ClientError::request(&url, e))?;

        let size = match response.status() {
            StatusCode::PARTIAL_CONTENT => {
                match content_range_start(&response) {
                    Some(start) if start == existing => {
                        let mut file = OpenOptions::new()
                            .append(true)
                            .open(dest)
                            .await
                            .map_err(|e| ClientError::io(dest, e))?;
                        existing + write_body(&url, dest, response, &mut file).await?
                    }
                    other => {
                        warn!(
                            "Server answered range {:?} instead of {}; restarting {}",
                            other, existing, url
                        );
                        self.fetch_full(&url, dest).await?
                    }
                }
            }
            StatusCode::RANGE_NOT_SATISFIABLE => {
                if content_range_total(&response) == Some(existing) {
                    debug!("{} already complete on disk", dest.display());
                    existing
                } else {
                    warn!("Partial file {} is not a prefix; restarting", dest.display());
                    self.fetch_full(&url, dest).await?
                }
            }
            status if status.is_success() => {
                // Server ignored the range and sent the whole body
                let mut file = File::create(dest)
                    .await
                    .map_err(|e| ClientError::io(dest, e))?;
                write_body(&url, dest, response, &mut file).await?
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                return Err(ClientError::api_error(&url, status.as_u16(), message));
            }
        };

        info!("Download complete: {} ({} bytes)", url, size);
        Ok(size)
    }

    /// Downloads the whole body into `dest`, truncating what was there
    async fn fetch_full(&self, url: &str, dest: &Path) -> Result<u64> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::api_error(url, status.as_u16(), message));
        }

        let mut file = File::create(dest)
            .await
            .map_err(|e| ClientError::io(dest, e))?;
        write_body(url, dest, response, &mut file).await
    }
}

/// Streams a response body into `file`, returning the number of bytes written
async fn write_body(
    url: &str,
    dest: &Path,
    mut response: reqwest::Response,
    file: &mut File,
) -> Result<u64> {
    let mut written = 0u64;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| ClientError::request(url, e))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| ClientError::io(dest, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| ClientError::io(dest, e))?;
    file.sync_all().await.map_err(|e| ClientError::io(dest, e))?;
    Ok(written)
}

/// First byte of a `Content-Range: bytes <start>-<end>/<total>` header
fn content_range_start(response: &reqwest::Response) -> Option<u64> {
    let value = response.headers().get(CONTENT_RANGE)?.to_str().ok()?;
    let range = value.trim().strip_prefix("bytes ")?;
    let (start, _) = range.split_once('-')?;
    start.trim().parse().ok()
}

/// Total length from a `Content-Range: bytes */<total>` header
fn content_range_total(response: &reqwest::Response) -> Option<u64> {
    let value = response.headers().get(CONTENT_RANGE)?.to_str().ok()?;
    let (_, total) = value.trim().rsplit_once('/')?;
    total.trim().parse().ok()
}
