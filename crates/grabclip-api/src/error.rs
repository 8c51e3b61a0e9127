//! API error types.

use grabclip_media::error::truncate_at_semicolon;
use grabclip_media::MediaError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything that can send a submission back to the form.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or missing input. The message is shown as is.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Fetch(#[from] MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the downloader was (or could have been) reached.
    pub fn is_validation(&self) -> bool {
        matches!(self, ApiError::Validation(_))
    }

    /// Text for the flash message shown on the form.
    ///
    /// Anything after the first `;` is dropped. Internal details are hidden
    /// in production.
    pub fn flash_message(&self, production: bool) -> String {
        match self {
            ApiError::Validation(msg) => msg.clone(),
            ApiError::Fetch(e) => format!("Error: {}", e.flash_message()),
            ApiError::Io(_) | ApiError::Internal(_) => {
                if production {
                    "Error: An internal error occurred".to_string()
                } else {
                    format!("Error: {}", truncate_at_semicolon(&self.to_string()))
                }
            }
        }
    }
}
