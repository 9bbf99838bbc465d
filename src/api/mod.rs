//! API layer -- axum routes, handlers, and middleware.

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

pub use self::error::ApiError;
pub use self::state::AppState;

use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::web;

/// Build the application router: JSON API, gated webhook, and the frontend
/// bundle as fallback, all mounted under the configured path prefix.
pub fn router(state: AppState) -> Router {
    let webhook = Router::new()
        .route("/webhook", post(routes::webhook))
        .route_layer(from_fn_with_state(state.clone(), auth::require_bearer));

    let prefix = state.config.path_prefix.clone();
    let app = Router::new()
        .nest("/api", routes::api_routes())
        .merge(webhook)
        .fallback(web::serve_bundle)
        .with_state(state.clone());

    // `nest` covers `{prefix}` and `{prefix}/...` but not `{prefix}/` itself.
    let app = if prefix.is_empty() {
        app
    } else {
        Router::new()
            .route(
                &format!("{prefix}/"),
                get(web::serve_bundle).with_state(state),
            )
            .nest(&prefix, app)
            .fallback(not_found)
    };

    app.layer(TraceLayer::new_for_http())
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}
