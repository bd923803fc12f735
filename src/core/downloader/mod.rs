mod client;

pub use client::Downloader;

use std::path::Path;

use async_trait::async_trait;

use crate::core::error::JarlinkResult;

/// The raw network collaborator: fetch a URL, report status, hand over the body.
///
/// `Downloader` is the production implementation; tests plug in their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and stream the body into `dest`, replacing any existing file.
    ///
    /// Only a 200 answer counts as success. When `sha1_expected` is given the
    /// body is hashed while streaming and rejected on mismatch; `dest` is left
    /// untouched on any failure. Returns the number of bytes written.
    async fn download(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> JarlinkResult<u64>;

    /// GET `url` fully into memory.
    async fn fetch_bytes(&self, url: &str) -> JarlinkResult<Vec<u8>>;

    /// GET a small text document. `Ok(None)` when the server has no such file.
    async fn fetch_text(&self, url: &str) -> JarlinkResult<Option<String>>;
}
