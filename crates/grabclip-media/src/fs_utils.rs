//! Filesystem utilities for transient download files.
//!
//! A served file must disappear once its response is done, whichever way the
//! request ends. [`TempDownload`] ties the deletion to a value's lifetime:
//! move it into the response body and the file goes away when the body is
//! fully sent or dropped by a disconnecting client.

use std::io::ErrorKind;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use scopeguard::ScopeGuard;

/// Owns a downloaded file and deletes it on drop.
///
/// Deletion failures are logged, never raised. The stale-file sweeper picks
/// up anything left behind.
pub struct TempDownload {
    guard: ScopeGuard<PathBuf, fn(PathBuf)>,
}

impl TempDownload {
    /// Take ownership of `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            guard: scopeguard::guard(path.into(), remove_quietly as fn(PathBuf)),
        }
    }

    /// Path of the owned file.
    pub fn path(&self) -> &Path {
        &self.guard
    }
}

impl Deref for TempDownload {
    type Target = Path;

    fn deref(&self) -> &Path {
        self.path()
    }
}

impl std::fmt::Debug for TempDownload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TempDownload")
            .field("path", &self.path())
            .finish()
    }
}

/// Remove `path`, logging instead of failing.
fn remove_quietly(path: PathBuf) {
    match std::fs::remove_file(&path) {
        Ok(()) => tracing::debug!(path = %path.display(), "Removed served download"),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Served download already removed");
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to delete served download: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_drop_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.mp4");
        std::fs::write(&path, b"data").unwrap();

        let guard = TempDownload::new(&path);
        assert_eq!(guard.path(), path.as_path());
        assert!(path.exists());

        drop(guard);
        assert!(!path.exists(), "File should be removed when the guard drops");
    }

    #[test]
    fn test_drop_tolerates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.mp4");

        // Must not panic.
        drop(TempDownload::new(&path));
        assert!(!path.exists());
    }

    #[test]
    fn test_removes_file_on_early_return() {
        fn failing_step(path: &Path) -> Result<(), String> {
            let _guard = TempDownload::new(path);
            Err("boom".to_string())
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.webm");
        std::fs::write(&path, b"data").unwrap();

        assert!(failing_step(&path).is_err());
        assert!(!path.exists());
    }
}
