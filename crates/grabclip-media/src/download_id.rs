//! Per-request download identifiers.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique token namespacing one request's output file.
///
/// Every call to [`DownloadId::new`] yields a fresh random value, so two
/// in-flight downloads never share a filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DownloadId(String);

impl DownloadId {
    /// Generate a new random download ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// yt-dlp output template `<dir>/<id>.%(ext)s`.
    pub fn output_template(&self, dir: &Path) -> String {
        dir.join(format!("{}.%(ext)s", self.0))
            .to_string_lossy()
            .into_owned()
    }

    /// Whether `file_name` belongs to this download (`<id>.<anything>`).
    pub fn owns_file_name(&self, file_name: &str) -> bool {
        file_name
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl Default for DownloadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
