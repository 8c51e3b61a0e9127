//! Attachment display names.
//!
//! The allow-list only keeps characters that are harmless inside a
//! `Content-Disposition` header. It is not a filesystem-safety guarantee.

/// Title used when the tool reports none.
const DEFAULT_TITLE: &str = "video";

/// Name used when sanitization leaves nothing.
const EMPTY_FALLBACK: &str = "download";

/// Keep letters, digits, spaces and periods; trim trailing whitespace.
pub fn sanitize_display_name(name: &str) -> String {
    let kept: String = name
        .chars()
        .filter(|c| c.is_alphabetic() || c.is_numeric() || *c == ' ' || *c == '.')
        .collect();
    kept.trim_end().to_string()
}

/// Title plus extension, sanitized.
///
/// A title with no letters or digits left after sanitizing becomes
/// `download`, so `"???"` with `mp4` yields `download.mp4` rather than a
/// bare `.mp4`. A nameless attachment is never sent, even though the
/// plain allow-list alone would produce one.
pub fn display_name(title: Option<&str>, ext: Option<&str>) -> String {
    let title = title.unwrap_or(DEFAULT_TITLE);
    let title = if sanitize_display_name(title).chars().any(char::is_alphanumeric) {
        title
    } else {
        EMPTY_FALLBACK
    };

    let raw = match ext {
        Some(ext) => format!("{}.{}", title, ext),
        None => title.to_string(),
    };
    sanitize_display_name(&raw)
}

/// ASCII-only variant for the plain `filename=` parameter.
pub fn ascii_fallback(name: &str) -> String {
    let ascii: String = name.chars().filter(|c| c.is_ascii()).collect();
    let ascii = ascii.trim();
    if !ascii.chars().any(|c| c.is_ascii_alphanumeric()) {
        EMPTY_FALLBACK.to_string()
    } else if ascii.starts_with('.') {
        format!("{}{}", EMPTY_FALLBACK, ascii)
    } else {
        ascii.to_string()
    }
}
