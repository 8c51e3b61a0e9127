//! Application state.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use grabclip_media::{MediaFetcher, YtDlpFetcher};
use tracing::info;

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub fetcher: Arc<dyn MediaFetcher>,
    /// Signs flash cookies. Regenerated on every start.
    pub cookie_key: Key,
}

impl AppState {
    /// Create application state backed by yt-dlp.
    pub async fn new(config: AppConfig) -> std::io::Result<Self> {
        let fetcher = Arc::new(YtDlpFetcher::new(config.ytdlp()));
        Self::with_fetcher(config, fetcher).await
    }

    /// Create application state with an arbitrary fetcher.
    ///
    /// Ensures the download directory exists.
    pub async fn with_fetcher(config: AppConfig, fetcher: Arc<dyn MediaFetcher>) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&config.download_dir).await?;
        info!(dir = %config.download_dir.display(), "Download directory ready");

        Ok(Self {
            config,
            fetcher,
            cookie_key: Key::generate(),
        })
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
