//! Archive download to scoped temporary storage.

use reqwest::Client;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

use pulumi_bootstrap_core::{Error, Result};

/// A downloaded archive held in process-local temporary storage.
///
/// The backing directory is removed when this value is dropped, on every
/// exit path of the pipeline, success or failure.
#[derive(Debug)]
pub struct DownloadedArchive {
    path: PathBuf,
    _dir: TempDir,
}

impl DownloadedArchive {
    /// Path of the archive on local disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Downloads distribution archives over HTTPS.
pub struct ArchiveFetcher {
    client: Client,
}

impl Default for ArchiveFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveFetcher {
    /// Create a new archive fetcher.
    ///
    /// # Panics
    ///
    /// `reqwest::Client::builder().build()` only fails when the TLS backend
    /// cannot initialize, which indicates a fundamental environment issue.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent("pulumi-bootstrap")
                .build()
                .expect("Failed to create HTTP client - TLS backend initialization failed"),
        }
    }

    /// Download the archive at `url` to a temporary location.
    ///
    /// A transport error, a non-success status, or a transfer shorter than
    /// the advertised `Content-Length` fails the download; a partial file is
    /// never adopted as valid because the temporary directory is dropped
    /// with the error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DownloadFailed`] carrying the URL and the cause.
    pub async fn fetch(&self, url: &str) -> Result<DownloadedArchive> {
        info!(%url, "Downloading distribution archive");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::download_failed(url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::download_failed(
                url,
                format!("HTTP {}", response.status()),
            ));
        }

        let expected_len = response.content_length();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::download_failed(url, e.to_string()))?;

        if let Some(expected) = expected_len {
            if bytes.len() as u64 != expected {
                return Err(Error::download_failed(
                    url,
                    format!("truncated transfer: got {} of {expected} bytes", bytes.len()),
                ));
            }
        }

        let dir = tempfile::tempdir().map_err(|e| {
            Error::download_failed(url, format!("failed to create temporary directory: {e}"))
        })?;
        let path = dir.path().join(archive_file_name(url));
        std::fs::write(&path, &bytes).map_err(|e| {
            Error::download_failed(url, format!("failed to write downloaded archive: {e}"))
        })?;

        debug!(path = %path.display(), size = bytes.len(), "Archive downloaded");
        Ok(DownloadedArchive { path, _dir: dir })
    }
}

/// Derive a local file name from the final path segment of a URL.
fn archive_file_name(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("archive")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulumi_bootstrap_core::Error;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Serve one raw HTTP response, returning the URL to fetch.
    async fn serve_raw(response: Vec<u8>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}/pulumi-v3.2.1-linux-x64.tar.gz")
    }

    #[tokio::test]
    async fn test_non_success_status_is_download_failed() {
        let url = serve_raw(
            b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                .to_vec(),
        )
        .await;

        let err = ArchiveFetcher::new().fetch(&url).await.unwrap_err();

        assert!(matches!(err, Error::DownloadFailed { .. }));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_truncated_transfer_is_download_failed() {
        // Advertise 100 bytes, deliver 5, close. Whether the transport
        // reports the short read or the length check catches it, the
        // partial archive must never be adopted as valid.
        let url = serve_raw(
            b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\nconnection: close\r\n\r\nshort".to_vec(),
        )
        .await;

        let err = ArchiveFetcher::new().fetch(&url).await.unwrap_err();

        assert!(matches!(err, Error::DownloadFailed { .. }));
    }

    #[test]
    fn test_archive_file_name_from_sdk_url() {
        assert_eq!(
            archive_file_name("https://get.pulumi.com/releases/sdk/pulumi-v3.2.1-linux-x64.tar.gz"),
            "pulumi-v3.2.1-linux-x64.tar.gz"
        );
    }

    #[test]
    fn test_archive_file_name_fallback() {
        assert_eq!(archive_file_name("https://get.pulumi.com///"), "archive");
        assert_eq!(archive_file_name(""), "archive");
    }

    #[test]
    fn test_downloaded_archive_cleans_up_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.tar.gz");
        std::fs::write(&path, b"bytes").unwrap();
        let dir_path = dir.path().to_path_buf();

        let archive = DownloadedArchive { path, _dir: dir };
        assert!(archive.path().exists());

        drop(archive);
        assert!(!dir_path.exists());
    }
}
