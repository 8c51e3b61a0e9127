//! Submission form.

use axum::response::Html;
use axum_extra::extract::cookie::SignedCookieJar;

use crate::flash::{self, Flash};

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Render the form, showing and clearing any pending flash.
///
/// GET /
pub async fn index(jar: SignedCookieJar) -> (SignedCookieJar, Html<String>) {
    let (jar, pending) = flash::take(jar);
    (jar, Html(render_index(pending.as_ref())))
}

/// Fill the template's flash slot.
pub fn render_index(flash: Option<&Flash>) -> String {
    let markup = flash
        .map(|f| {
            format!(
                r#"<div class="flash {}" role="alert">{}</div>"#,
                f.level.as_str(),
                escape_html(&f.message)
            )
        })
        .unwrap_or_default();
    INDEX_TEMPLATE.replace("{{ flash }}", &markup)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
