use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode, Url};
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::Transport;
use crate::core::error::{JarlinkError, JarlinkResult};
use crate::core::http::build_http_client;

/// Streaming, optionally SHA-1 validated downloader over `reqwest`.
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> JarlinkResult<Self> {
        let client = build_http_client(connect_timeout, request_timeout)?;
        Ok(Self { client })
    }

    async fn get_ok(&self, url: &str) -> JarlinkResult<reqwest::Response> {
        let parsed = Url::parse(url).map_err(|_| JarlinkError::MalformedUrl(url.to_string()))?;
        let response = self.client.get(parsed).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(JarlinkError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    // ── Single file download ────────────────────────────

    /// Download `url` to `dest`, streaming through a `.part` sibling.
    ///
    /// The part file is renamed into place only after the body is complete
    /// and the checksum (if any) matched.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> JarlinkResult<u64> {
        let response = self.get_ok(url).await?;
        let part = part_path(dest);

        let written = match stream_to_file(response, &part, url, sha1_expected).await {
            Ok(n) => n,
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&part, dest)
            .await
            .map_err(|e| JarlinkError::io(dest, e))?;

        debug!("Downloaded: {} -> {:?} ({} bytes)", url, dest, written);
        Ok(written)
    }
}

#[async_trait]
impl Transport for Downloader {
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> JarlinkResult<u64> {
        self.download_file(url, dest, sha1_expected).await
    }

    async fn fetch_bytes(&self, url: &str) -> JarlinkResult<Vec<u8>> {
        let response = self.get_ok(url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_text(&self, url: &str) -> JarlinkResult<Option<String>> {
        match self.get_ok(url).await {
            Ok(response) => Ok(Some(response.text().await?)),
            Err(JarlinkError::DownloadFailed { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

async fn stream_to_file(
    response: reqwest::Response,
    part: &Path,
    url: &str,
    sha1_expected: Option<&str>,
) -> JarlinkResult<u64> {
    let mut hasher = Sha1::new();
    let mut written = 0u64;

    // Write inside a block so the handle is closed before the rename.
    {
        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| JarlinkError::io(part, e))?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            hasher.update(&chunk);
            file.write_all(&chunk)
                .await
                .map_err(|e| JarlinkError::io(part, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| JarlinkError::io(part, e))?;
    }

    if let Some(expected) = sha1_expected {
        let actual = hex::encode(hasher.finalize());
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(JarlinkError::ChecksumMismatch {
                url: url.to_string(),
                expected: expected.to_string(),
                actual,
            });
        }
    }

    Ok(written)
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_file_sits_next_to_destination() {
        let part = part_path(Path::new("/tmp/cache/org.example_lib_1.2.0.jar"));
        assert_eq!(
            part,
            PathBuf::from("/tmp/cache/org.example_lib_1.2.0.jar.part")
        );
    }

    #[tokio::test]
    async fn malformed_url_is_rejected_before_any_request() {
        let downloader =
            Downloader::new(Duration::from_secs(1), Duration::from_secs(1)).unwrap();
        let err = downloader
            .download_file("not a url", Path::new("/tmp/never-written.jar"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, JarlinkError::MalformedUrl(_)));
    }
}
