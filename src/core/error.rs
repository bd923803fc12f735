use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the resolver, the source chain and the CLI.
/// Every module returns `Result<T, JarlinkError>`.
#[derive(Debug, Error)]
pub enum JarlinkError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Configuration ───────────────────────────────────
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ── Host splice ─────────────────────────────────────
    #[error("Host context refused the intercept: {0}")]
    Access(String),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Malformed repository URL: {0}")]
    MalformedUrl(String),

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    // ── Strict mode ─────────────────────────────────────
    #[error("Unsatisfied dependencies: {}", .0.join(", "))]
    Unsatisfied(Vec<String>),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Convenience alias used throughout the crate.
pub type JarlinkResult<T> = Result<T, JarlinkError>;

impl JarlinkError {
    /// Wraps an IO error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        JarlinkError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for JarlinkError {
    fn from(source: std::io::Error) -> Self {
        JarlinkError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
