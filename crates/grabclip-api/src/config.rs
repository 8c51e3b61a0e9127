//! Server configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use grabclip_media::YtDlpConfig;

/// Server configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Flat directory holding transient downloads
    pub download_dir: PathBuf,
    /// Files older than this are swept
    pub retention: Duration,
    /// Limit on a single yt-dlp run. `None` waits indefinitely.
    pub download_timeout: Option<Duration>,
    /// yt-dlp binary name or path
    pub ytdlp_binary: PathBuf,
    /// Max request body size
    pub max_body_size: usize,
    /// Expose `/metrics`
    pub metrics_enabled: bool,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            download_dir: PathBuf::from("downloads"),
            retention: Duration::from_secs(300),
            download_timeout: None,
            ytdlp_binary: PathBuf::from("yt-dlp"),
            max_body_size: 16 * 1024, // 16KB
            metrics_enabled: true,
            environment: "development".to_string(),
        }
    }
}

impl AppConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("GRABCLIP_HOST").unwrap_or(defaults.host),
            port: env_parse("GRABCLIP_PORT").unwrap_or(defaults.port),
            download_dir: std::env::var("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
            retention: env_parse("RETENTION_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.retention),
            download_timeout: env_parse::<u64>("DOWNLOAD_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            ytdlp_binary: std::env::var("YTDLP_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ytdlp_binary),
            max_body_size: env_parse("MAX_BODY_SIZE").unwrap_or(defaults.max_body_size),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// yt-dlp settings derived from this config.
    pub fn ytdlp(&self) -> YtDlpConfig {
        YtDlpConfig {
            binary: self.ytdlp_binary.clone(),
            timeout: self.download_timeout,
            ..YtDlpConfig::default()
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
