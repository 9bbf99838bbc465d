//! Embedded frontend bundle and entry document rendering.
//!
//! Any path that does not name a bundled file gets `index.html`, so the
//! client-side router can resolve it.

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;
use serde_json::Value;

use crate::api::AppState;

/// Prebuilt frontend from `frontend/dist/`.
#[derive(Embed)]
#[folder = "frontend/dist/"]
struct Bundle;

const ENTRY_DOCUMENT: &str = "index.html";

/// Fallback handler: a bundled file, or the entry document.
pub async fn serve_bundle(State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri.path().trim_start_matches('/');

    if !path.is_empty() && path != ENTRY_DOCUMENT {
        if let Some(content) = Bundle::get(path) {
            let mime = mime_guess::from_path(path)
                .first_or_octet_stream()
                .to_string();
            return (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime)],
                content.data.into_owned(),
            )
                .into_response();
        }
    }

    entry_document(&state.config.path_prefix, state.config.footer_text.as_deref())
}

fn entry_document(prefix: &str, footer_text: Option<&str>) -> Response {
    match Bundle::get(ENTRY_DOCUMENT) {
        Some(content) => {
            let html = String::from_utf8_lossy(&content.data);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                render_index(&html, prefix, footer_text),
            )
                .into_response()
        }
        None => {
            tracing::error!("entry document missing from bundle");
            (StatusCode::NOT_FOUND, "index not found").into_response()
        }
    }
}

/// Rewrite the entry document for a mount prefix and inject runtime globals
/// (`window.__PATH_PREFIX__`, `window.__FOOTER_TEXT__`) before `</head>`.
pub fn render_index(html: &str, prefix: &str, footer_text: Option<&str>) -> String {
    let mut html = html.to_string();
    let mut globals = Vec::new();

    if !prefix.is_empty() {
        let rewrites = [
            ("href=\"/assets/", format!("href=\"{prefix}/assets/")),
            ("src=\"/assets/", format!("src=\"{prefix}/assets/")),
            ("href=\"/favicon.svg\"", format!("href=\"{prefix}/favicon.svg\"")),
        ];
        for (from, to) in &rewrites {
            html = html.replace(from, to);
        }
        globals.push(format!("window.__PATH_PREFIX__={}", script_string(prefix)));
    }

    if let Some(footer) = footer_text.filter(|t| !t.trim().is_empty()) {
        globals.push(format!("window.__FOOTER_TEXT__={}", script_string(footer)));
    }

    if !globals.is_empty() {
        let script = format!("<script>{};</script></head>", globals.join(";"));
        html = html.replacen("</head>", &script, 1);
    }

    html
}

/// JS string literal that is also safe inside an inline `<script>`.
fn script_string(value: &str) -> String {
    Value::String(value.to_string())
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
