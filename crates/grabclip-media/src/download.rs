//! Media download using yt-dlp.
//!
//! The extraction tool is an opaque collaborator behind [`MediaFetcher`]. It
//! writes `<id>.<ext>` into the output directory and reports metadata; the
//! real file is then located by identifier, because merging may pick a
//! different container than the one requested.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::command::{check_ytdlp, run_command, YtDlpCommand};
use crate::download_id::DownloadId;
use crate::error::{MediaError, MediaResult};
use crate::filename::display_name;

/// Best MP4 available, else best overall.
pub const DEFAULT_FORMAT: &str = "best[ext=mp4]/best";

/// Player clients tried for YouTube, in order.
pub const DEFAULT_EXTRACTOR_ARGS: &str = "youtube:player_client=android,web";

/// Suffixes yt-dlp uses for in-progress files.
const PARTIAL_SUFFIXES: [&str; 2] = [".part", ".ytdl"];

/// One fetch: what to download and where to put it.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub download_id: DownloadId,
    pub output_dir: PathBuf,
    /// Format selector preference
    pub format: String,
    /// Never expand playlists
    pub no_playlist: bool,
}

impl FetchRequest {
    /// Create a request with the default format and playlist expansion off.
    pub fn new(url: impl Into<String>, download_id: DownloadId, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            download_id,
            output_dir: output_dir.into(),
            format: DEFAULT_FORMAT.to_string(),
            no_playlist: true,
        }
    }
}

/// Metadata reported by the extraction tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Extension the tool intended to write. Not authoritative.
    #[serde(default)]
    pub ext: Option<String>,
}

/// A downloaded file plus its metadata.
#[derive(Debug, Clone)]
pub struct FetchedMedia {
    /// Resolved on-disk path
    pub path: PathBuf,
    pub info: MediaInfo,
}

impl FetchedMedia {
    /// Extension of the file actually written.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    /// Sanitized attachment name: title plus real extension.
    pub fn display_name(&self) -> String {
        display_name(self.info.title.as_deref(), self.extension())
    }
}

/// External extraction/download capability.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Resolve `request.url` and write the media into `request.output_dir`
    /// named after `request.download_id`.
    async fn fetch(&self, request: &FetchRequest) -> MediaResult<MediaInfo>;
}

/// yt-dlp settings.
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    /// Binary name or path
    pub binary: PathBuf,
    pub extractor_args: Option<String>,
    /// `None` waits indefinitely
    pub timeout: Option<Duration>,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            extractor_args: Some(DEFAULT_EXTRACTOR_ARGS.to_string()),
            timeout: None,
        }
    }
}

/// [`MediaFetcher`] backed by the yt-dlp CLI.
#[derive(Debug, Clone, Default)]
pub struct YtDlpFetcher {
    config: YtDlpConfig,
}

impl YtDlpFetcher {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, request: &FetchRequest) -> YtDlpCommand {
        let mut cmd = YtDlpCommand::new(
            request.url.clone(),
            request.download_id.output_template(&request.output_dir),
        )
        .format(request.format.clone())
        .no_playlist(request.no_playlist);

        if let Some(args) = &self.config.extractor_args {
            cmd = cmd.extractor_args(args.clone());
        }
        cmd
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> MediaResult<MediaInfo> {
        let binary = check_ytdlp(&self.config.binary)?;
        let args = self.build_command(request).build_args();

        info!(
            download_id = %request.download_id,
            url = %request.url,
            "Downloading media"
        );

        let output = run_command(&binary, &args, self.config.timeout).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            debug!("yt-dlp stderr: {}", stderr);
            let message = error_message_from_stderr(&stderr).unwrap_or_else(|| match output.status.code() {
                Some(code) => format!("yt-dlp exited with status {}", code),
                None => "yt-dlp was terminated by a signal".to_string(),
            });
            return Err(MediaError::invocation_failed(message));
        }

        parse_media_info(&String::from_utf8_lossy(&output.stdout))
    }
}

/// The most useful line of yt-dlp's stderr: the first `ERROR:` line, else
/// the last non-empty line.
fn error_message_from_stderr(stderr: &str) -> Option<String> {
    let mut lines = stderr.lines().map(str::trim).filter(|l| !l.is_empty());
    stderr
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.next_back())
        .map(str::to_string)
}

/// Parse the JSON metadata line `--dump-json` prints last.
fn parse_media_info(stdout: &str) -> MediaResult<MediaInfo> {
    let line = stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .unwrap_or("{}");
    Ok(serde_json::from_str(line)?)
}

/// Find the file written for `id` in `dir`.
///
/// The on-disk extension wins over whatever was requested. In-progress
/// fragments are ignored.
pub async fn resolve_output(dir: &Path, id: &DownloadId) -> MediaResult<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !id.owns_file_name(name) || PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            continue;
        }
        match entry.file_type().await {
            Ok(ft) if ft.is_file() => return Ok(entry.path()),
            Ok(_) => continue,
            Err(e) => {
                warn!(path = %entry.path().display(), "Failed to stat download candidate: {}", e);
            }
        }
    }

    Err(MediaError::output_missing(id.as_str()))
}

/// Invoke `fetcher`, then locate the file it wrote.
pub async fn fetch_media(fetcher: &dyn MediaFetcher, request: &FetchRequest) -> MediaResult<FetchedMedia> {
    let info = fetcher.fetch(request).await?;
    let path = resolve_output(&request.output_dir, &request.download_id).await?;

    if let (Some(requested), Some(actual)) = (info.ext.as_deref(), path.extension().and_then(|e| e.to_str())) {
        if requested != actual {
            debug!(
                download_id = %request.download_id,
                requested,
                actual,
                "Extension differs from reported metadata"
            );
        }
    }

    info!(
        download_id = %request.download_id,
        path = %path.display(),
        title = info.title.as_deref().unwrap_or("<untitled>"),
        "Downloaded media successfully"
    );

    Ok(FetchedMedia { path, info })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct WritesFile {
        ext: &'static str,
        reported_ext: &'static str,
    }

    #[async_trait]
    impl MediaFetcher for WritesFile {
        async fn fetch(&self, request: &FetchRequest) -> MediaResult<MediaInfo> {
            let path = request
                .output_dir
                .join(format!("{}.{}", request.download_id, self.ext));
            tokio::fs::write(&path, b"media").await?;
            Ok(MediaInfo {
                id: Some("xyz".to_string()),
                title: Some("My Clip".to_string()),
                ext: Some(self.reported_ext.to_string()),
            })
        }
    }

    struct WritesNothing;

    #[async_trait]
    impl MediaFetcher for WritesNothing {
        async fn fetch(&self, _request: &FetchRequest) -> MediaResult<MediaInfo> {
            Ok(MediaInfo::default())
        }
    }

    #[test]
    fn test_fetch_request_defaults() {
        let req = FetchRequest::new("https://example.com", DownloadId::new(), "downloads");
        assert_eq!(req.format, "best[ext=mp4]/best");
        assert!(req.no_playlist);
    }

    #[test]
    fn test_build_command_uses_request_and_config() {
        let fetcher = YtDlpFetcher::default();
        let id = DownloadId::new();
        let req = FetchRequest::new("https://example.com/v", id.clone(), "downloads");
        let args = fetcher.build_command(&req).build_args();

        assert!(args.contains(&DEFAULT_FORMAT.to_string()));
        assert!(args.contains(&DEFAULT_EXTRACTOR_ARGS.to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.iter().any(|a| a.contains(id.as_str())));
    }

    #[test]
    fn test_error_message_prefers_error_line() {
        let stderr = "[generic] Extracting URL\nERROR: unsupported url; details here\nsome trailer\n";
        assert_eq!(
            error_message_from_stderr(stderr).as_deref(),
            Some("ERROR: unsupported url; details here")
        );
    }

    #[test]
    fn test_error_message_falls_back_to_last_line() {
        assert_eq!(
            error_message_from_stderr("first\nlast\n\n").as_deref(),
            Some("last")
        );
        assert_eq!(error_message_from_stderr("   \n"), None);
    }

    #[test]
    fn test_parse_media_info() {
        let stdout = r#"{"id": "abc", "title": "My Clip", "ext": "mp4", "duration": 12.5}"#;
        let info = parse_media_info(stdout).unwrap();
        assert_eq!(info.title.as_deref(), Some("My Clip"));
        assert_eq!(info.ext.as_deref(), Some("mp4"));

        assert!(matches!(parse_media_info("not json"), Err(MediaError::Metadata(_))));
        assert_eq!(parse_media_info("").unwrap(), MediaInfo::default());
    }

    #[tokio::test]
    async fn test_fetch_media_uses_on_disk_extension() {
        let dir = TempDir::new().unwrap();
        let fetcher = WritesFile {
            ext: "webm",
            reported_ext: "mp4",
        };
        let req = FetchRequest::new("https://example.com/video1", DownloadId::new(), dir.path());

        let media = fetch_media(&fetcher, &req).await.unwrap();

        assert_eq!(media.extension(), Some("webm"));
        assert_eq!(media.display_name(), "My Clip.webm");
        assert!(media.path.exists());
    }

    #[tokio::test]
    async fn test_fetch_media_reports_missing_output() {
        let dir = TempDir::new().unwrap();
        let req = FetchRequest::new("https://example.com/video1", DownloadId::new(), dir.path());

        let err = fetch_media(&WritesNothing, &req).await.unwrap_err();
        assert!(matches!(err, MediaError::OutputMissing { .. }));
    }

    #[tokio::test]
    async fn test_resolve_output_ignores_other_ids_and_partials() {
        let dir = TempDir::new().unwrap();
        let id = DownloadId::new();
        let other = DownloadId::new();

        tokio::fs::write(dir.path().join(format!("{}.mp4", other)), b"x").await.unwrap();
        tokio::fs::write(dir.path().join(format!("{}.mp4.part", id)), b"x").await.unwrap();

        assert!(matches!(
            resolve_output(dir.path(), &id).await,
            Err(MediaError::OutputMissing { .. })
        ));

        tokio::fs::write(dir.path().join(format!("{}.mkv", id)), b"x").await.unwrap();
        let path = resolve_output(dir.path(), &id).await.unwrap();
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), format!("{}.mkv", id));
    }

    /// Executable shell script standing in for yt-dlp.
    #[cfg(unix)]
    fn fake_ytdlp(dir: &Path, body: &str) -> YtDlpFetcher {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        YtDlpFetcher::new(YtDlpConfig {
            binary: path,
            ..YtDlpConfig::default()
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ytdlp_fetcher_reads_metadata_and_locates_file() {
        let bin = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let id = DownloadId::new();
        let target = out.path().join(format!("{}.webm", id));
        let fetcher = fake_ytdlp(
            bin.path(),
            &format!(
                "printf media > '{}'\necho '{{\"id\": \"xyz\", \"title\": \"My Clip\", \"ext\": \"mp4\"}}'",
                target.display()
            ),
        );
        let req = FetchRequest::new("https://example.com/video1", id, out.path());

        let media = fetch_media(&fetcher, &req).await.unwrap();

        assert_eq!(media.path, target);
        assert_eq!(media.display_name(), "My Clip.webm");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ytdlp_fetcher_reports_error_line() {
        let bin = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let fetcher = fake_ytdlp(
            bin.path(),
            "echo '[generic] Extracting URL' >&2\necho 'ERROR: unsupported url; details here' >&2\nexit 1",
        );
        let req = FetchRequest::new("https://example.com/video1", DownloadId::new(), out.path());

        let err = fetcher.fetch(&req).await.unwrap_err();

        assert!(matches!(err, MediaError::InvocationFailed { .. }));
        assert_eq!(err.flash_message(), "ERROR: unsupported url");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ytdlp_fetcher_reports_exit_status_without_stderr() {
        let bin = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let fetcher = fake_ytdlp(bin.path(), "exit 3");
        let req = FetchRequest::new("https://example.com/video1", DownloadId::new(), out.path());

        let err = fetcher.fetch(&req).await.unwrap_err();

        assert!(matches!(err, MediaError::InvocationFailed { .. }));
        assert_eq!(err.to_string(), "yt-dlp exited with status 3");
    }
}
