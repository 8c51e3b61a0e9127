//! Download submission handler.
//!
//! Sweeps stale files, validates the URL, runs the fetcher and streams the
//! result back as an attachment. Every failure becomes a flash message on
//! a redirect to the form.

use std::path::Path;
use std::time::Instant;

use axum::body::Body;
use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::SignedCookieJar;
use futures_util::StreamExt;
use grabclip_media::{
    ascii_fallback, fetch_media, sweep_stale_files, DownloadId, FetchRequest, TempDownload,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};
use url::Url;

use crate::error::{ApiError, ApiResult};
use crate::flash::{self, Flash};
use crate::metrics;
use crate::state::AppState;

pub const MISSING_URL_MESSAGE: &str = "Please enter a URL";
pub const INVALID_URL_MESSAGE: &str = "Please enter a valid http(s) URL";

/// Submitted form.
#[derive(Debug, Deserialize)]
pub struct DownloadForm {
    #[serde(default)]
    pub url: Option<String>,
}

/// Fetch the submitted URL and stream the file back.
///
/// POST /download
pub async fn download(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    form: Result<Form<DownloadForm>, FormRejection>,
) -> Response {
    sweep_download_dir(&state).await;

    let raw_url = form.ok().and_then(|Form(f)| f.url);
    let start = Instant::now();

    match serve_download(&state, raw_url.as_deref()).await {
        Ok(response) => {
            metrics::record_download("success", start.elapsed().as_secs_f64());
            response
        }
        Err(e) => {
            if e.is_validation() {
                info!("Rejected submission: {}", e);
                metrics::record_download("invalid", start.elapsed().as_secs_f64());
            } else {
                warn!(error = %e, "Download failed");
                metrics::record_download("failed", start.elapsed().as_secs_f64());
            }
            let notice = Flash::error(e.flash_message(state.config.is_production()));
            (flash::set(jar, &notice), Redirect::to("/")).into_response()
        }
    }
}

/// Best-effort sweep; errors are logged and dropped.
async fn sweep_download_dir(state: &AppState) {
    match sweep_stale_files(&state.config.download_dir, state.config.retention).await {
        Ok(report) => metrics::record_sweep(report.removed),
        Err(e) => warn!(
            dir = %state.config.download_dir.display(),
            "Stale download sweep failed: {}", e
        ),
    }
}

async fn serve_download(state: &AppState, raw_url: Option<&str>) -> ApiResult<Response> {
    let url = validate_url(raw_url)?;
    let request = FetchRequest::new(url, DownloadId::new(), &state.config.download_dir);

    let media = fetch_media(state.fetcher.as_ref(), &request).await?;
    let display_name = media.display_name();
    let file = TempDownload::new(media.path);

    attachment_response(file, &display_name).await
}

/// Require a non-blank absolute http(s) URL.
pub fn validate_url(raw: Option<&str>) -> ApiResult<String> {
    let url = raw
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::validation(MISSING_URL_MESSAGE))?;

    let parsed = Url::parse(url).map_err(|_| ApiError::validation(INVALID_URL_MESSAGE))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::validation(INVALID_URL_MESSAGE));
    }

    Ok(url.to_string())
}

/// Stream `file` as an attachment named `display_name`.
///
/// The guard moves into the body stream, so the file is deleted once the
/// body has been sent or dropped. If building the response fails the guard
/// drops here instead.
pub async fn attachment_response(file: TempDownload, display_name: &str) -> ApiResult<Response> {
    let handle = tokio::fs::File::open(file.path()).await?;
    let length = handle.metadata().await?.len();
    let content_type = content_type_for(file.path());

    info!(
        path = %file.path().display(),
        size_mb = length as f64 / (1024.0 * 1024.0),
        display_name,
        "Streaming download"
    );

    let stream = ReaderStream::new(handle).map(move |chunk| {
        let _owner = &file;
        chunk
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, length)
        .header(header::CONTENT_DISPOSITION, content_disposition(display_name))
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}

/// `attachment` header with an ASCII `filename` and a UTF-8 `filename*`.
pub fn content_disposition(display_name: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback(display_name),
        urlencoding::encode(display_name)
    )
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("mov") => "video/quicktime",
        Some("m4a") => "audio/mp4",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_rejects_blank() {
        for raw in [None, Some(""), Some("   ")] {
            let err = validate_url(raw).unwrap_err();
            assert_eq!(err.flash_message(false), MISSING_URL_MESSAGE);
        }
    }

    #[test]
    fn test_validate_url_rejects_non_http() {
        for raw in ["not a url", "file:///etc/passwd", "ftp://example.com/v.mp4"] {
            let err = validate_url(Some(raw)).unwrap_err();
            assert_eq!(err.flash_message(false), INVALID_URL_MESSAGE);
        }
    }

    #[test]
    fn test_validate_url_trims() {
        assert_eq!(
            validate_url(Some("  https://example.com/video1 ")).unwrap(),
            "https://example.com/video1"
        );
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("My Clip.mp4"),
            "attachment; filename=\"My Clip.mp4\"; filename*=UTF-8''My%20Clip.mp4"
        );
        assert_eq!(
            content_disposition("Café.mp4"),
            "attachment; filename=\"Caf.mp4\"; filename*=UTF-8''Caf%C3%A9.mp4"
        );
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a.MP4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("a.webm")), "video/webm");
        assert_eq!(content_type_for(Path::new("a")), "application/octet-stream");
    }
}
