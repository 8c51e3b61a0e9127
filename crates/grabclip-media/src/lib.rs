//! yt-dlp invocation and transient download file management.
//!
//! This crate provides:
//! - A `MediaFetcher` seam over the external extraction tool, with a yt-dlp
//!   implementation
//! - Output path resolution by download identifier
//! - Age-based sweeping of the shared download directory
//! - A scoped guard that deletes a served file on every exit path
//! - Display-name sanitization for attachment headers

pub mod command;
pub mod download;
pub mod download_id;
pub mod error;
pub mod filename;
pub mod fs_utils;
pub mod sweep;

pub use command::check_ytdlp;
pub use download::{
    fetch_media, resolve_output, FetchRequest, FetchedMedia, MediaFetcher, MediaInfo,
    YtDlpConfig, YtDlpFetcher, DEFAULT_EXTRACTOR_ARGS, DEFAULT_FORMAT,
};
pub use download_id::DownloadId;
pub use error::{MediaError, MediaResult};
pub use filename::{ascii_fallback, display_name, sanitize_display_name};
pub use fs_utils::TempDownload;
pub use sweep::{sweep_stale_files, SweepReport};
