//! yt-dlp command builder and runner.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Builder for yt-dlp commands.
#[derive(Debug, Clone)]
pub struct YtDlpCommand {
    /// Target URL
    url: String,
    /// Output template (`-o`)
    output_template: String,
    /// Format selector (`-f`)
    format: Option<String>,
    /// Skip playlist expansion
    no_playlist: bool,
    /// Extra `--extractor-args`
    extractor_args: Option<String>,
}

impl YtDlpCommand {
    /// Create a new yt-dlp command.
    pub fn new(url: impl Into<String>, output_template: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            output_template: output_template.into(),
            format: None,
            no_playlist: false,
            extractor_args: None,
        }
    }

    /// Set the format selector.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Disable playlist expansion.
    pub fn no_playlist(mut self, no_playlist: bool) -> Self {
        self.no_playlist = no_playlist;
        self
    }

    /// Set extractor arguments.
    pub fn extractor_args(mut self, args: impl Into<String>) -> Self {
        self.extractor_args = Some(args.into());
        self
    }

    /// Build the command arguments.
    ///
    /// Metadata is printed as a single JSON line on stdout while the download
    /// still happens (`--dump-json --no-simulate`). `--no-mtime` keeps the
    /// file's mtime at download time so the sweeper sees its real age. The
    /// URL always follows `--` so it can never be read as an option.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "--dump-json".to_string(),
            "--no-simulate".to_string(),
            "--no-mtime".to_string(),
        ];

        if let Some(format) = &self.format {
            args.push("-f".to_string());
            args.push(format.clone());
        }

        args.push("-o".to_string());
        args.push(self.output_template.clone());

        if self.no_playlist {
            args.push("--no-playlist".to_string());
        }

        if let Some(extractor_args) = &self.extractor_args {
            args.push("--extractor-args".to_string());
            args.push(extractor_args.clone());
        }

        args.push("--".to_string());
        args.push(self.url.clone());

        args
    }
}

/// Run `binary` with `args`, capturing stdout and stderr.
///
/// With a timeout the child is killed once the deadline passes. Without one
/// the call waits for the process however long it takes.
pub async fn run_command(
    binary: &Path,
    args: &[String],
    timeout: Option<Duration>,
) -> MediaResult<Output> {
    debug!("Running: {} {}", binary.display(), args.join(" "));

    let child = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                // Dropping the future drops the child, which kills it.
                warn!(
                    "{} timed out after {} seconds, killing process",
                    binary.display(),
                    limit.as_secs()
                );
                Err(MediaError::Timeout(limit.as_secs()))
            }
        },
        None => Ok(child.wait_with_output().await?),
    }
}

/// Check if yt-dlp is available, resolving `binary` through `PATH`.
pub fn check_ytdlp(binary: impl AsRef<Path>) -> MediaResult<PathBuf> {
    which::which(binary.as_ref()).map_err(|_| MediaError::YtDlpNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let args = YtDlpCommand::new("https://example.com/video1", "downloads/x.%(ext)s")
            .format("best[ext=mp4]/best")
            .no_playlist(true)
            .extractor_args("youtube:player_client=android,web")
            .build_args();

        assert!(args.contains(&"--dump-json".to_string()));
        assert!(args.contains(&"--no-simulate".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        // Server Last-Modified must not make a fresh file look stale.
        assert!(args.contains(&"--no-mtime".to_string()));

        let f = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[f + 1], "best[ext=mp4]/best");

        let o = args.iter().position(|a| a == "-o").unwrap();
        assert_eq!(args[o + 1], "downloads/x.%(ext)s");

        let n = args.len();
        assert_eq!(args[n - 2], "--");
        assert_eq!(args[n - 1], "https://example.com/video1");
    }

    #[test]
    fn test_command_builder_defaults() {
        let args = YtDlpCommand::new("u", "t").build_args();
        assert!(!args.contains(&"--no-playlist".to_string()));
        assert!(!args.contains(&"-f".to_string()));
        assert!(!args.contains(&"--extractor-args".to_string()));
    }

    #[test]
    fn test_check_ytdlp_missing_binary() {
        let result = check_ytdlp("definitely-not-a-real-ytdlp-binary");
        assert!(matches!(result, Err(MediaError::YtDlpNotFound)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_times_out() {
        let result = run_command(
            Path::new("sleep"),
            &["5".to_string()],
            Some(Duration::from_millis(100)),
        )
        .await;
        assert!(matches!(result, Err(MediaError::Timeout(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_captures_output() {
        let output = run_command(Path::new("echo"), &["hello".to_string()], None)
            .await
            .unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }
}
