//! Error types for media operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while fetching or managing downloaded media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    /// The extraction tool ran and reported a failure. Displays the tool's
    /// own message unchanged.
    #[error("{message}")]
    InvocationFailed { message: String },

    /// The tool reported success but no `<id>.*` file exists afterwards.
    #[error("File not found after download: {download_id}")]
    OutputMissing { download_id: String },

    #[error("Download timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not read download metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl MediaError {
    /// Create an invocation failure error.
    pub fn invocation_failed(message: impl Into<String>) -> Self {
        Self::InvocationFailed {
            message: message.into(),
        }
    }

    /// Create an output missing error.
    pub fn output_missing(download_id: impl Into<String>) -> Self {
        Self::OutputMissing {
            download_id: download_id.into(),
        }
    }

    /// User-facing text: the message up to the first `;`.
    ///
    /// yt-dlp appends verbose diagnostics after a semicolon; those never
    /// reach the browser.
    pub fn flash_message(&self) -> String {
        truncate_at_semicolon(&self.to_string())
    }
}

/// Text before the first `;`, trimmed.
pub fn truncate_at_semicolon(message: &str) -> String {
    message
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
