//! Age-based cleanup of the shared download directory.
//!
//! Runs at the start of every submission. Files are only ever left behind
//! when a response guard could not delete them, so a short retention window
//! keeps the directory bounded.

use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::error::MediaResult;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries examined
    pub scanned: u32,
    /// Files deleted
    pub removed: u32,
    /// Entries that could not be examined or deleted
    pub failed: u32,
}

/// Delete regular files in `dir` last modified before `now - max_age`.
///
/// Per-entry problems (a file vanishing mid-scan, a failed delete) are logged
/// and counted, never returned. Only failing to open the directory is an
/// error; a directory that does not exist yet is an empty sweep.
pub async fn sweep_stale_files(dir: &Path, max_age: Duration) -> MediaResult<SweepReport> {
    let mut report = SweepReport::default();

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(e.into()),
    };

    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %dir.display(), "Failed to read directory entry: {}", e);
                report.failed += 1;
                break;
            }
        };
        report.scanned += 1;

        let path = entry.path();
        let modified = match entry.metadata().await {
            Ok(meta) if !meta.is_file() => continue,
            Ok(meta) => meta.modified(),
            Err(e) => Err(e),
        };

        let modified = match modified {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "File vanished during sweep");
                continue;
            }
            Err(e) => {
                warn!(path = %path.display(), "Failed to stat file during sweep: {}", e);
                report.failed += 1;
                continue;
            }
        };

        if modified >= cutoff {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed stale download");
                report.removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "Stale download already removed");
            }
            Err(e) => {
                warn!(path = %path.display(), "Failed to remove stale download: {}", e);
                report.failed += 1;
            }
        }
    }

    if report.removed > 0 || report.failed > 0 {
        info!(
            dir = %dir.display(),
            scanned = report.scanned,
            removed = report.removed,
            failed = report.failed,
            "Stale download sweep complete"
        );
    }

    Ok(report)
}
