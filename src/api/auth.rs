//! Bearer-token gate for the ingestion endpoint.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use super::error::ApiError;
use super::state::AppState;

/// Extract `<token>` from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Reject requests whose bearer token does not match the configured one.
/// A no-op when no token is configured.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(expected) = state.config.api_token.as_deref() {
        if bearer_token(request.headers()) != Some(expected) {
            warn!(
                path = %request.uri().path(),
                has_header = request.headers().contains_key(header::AUTHORIZATION),
                "rejected webhook request"
            );
            return Err(ApiError::Unauthorized);
        }
    }

    Ok(next.run(request).await)
}
