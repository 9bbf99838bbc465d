//! API route definitions.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::error::ApiError;
use super::state::AppState;
use crate::storage::{runs, NewTestRun, ProjectSummary, RunFilter, TestRun};

/// Row cap for `/api/projects/{project}/results` when `limit` is absent or invalid.
pub const DEFAULT_PROJECT_LIMIT: u32 = 100;

/// Row cap for `/api/results` when `limit` is absent or invalid.
pub const DEFAULT_GLOBAL_LIMIT: u32 = 200;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/projects", get(list_projects))
        .route("/projects/{project}/results", get(project_results))
        .route("/results", get(all_results))
}

/// Optional filters shared by both result listings. Empty values are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct ResultsQuery {
    pub status: Option<String>,
    pub browser: Option<String>,
    pub spec: Option<String>,
    pub limit: Option<String>,
}

impl ResultsQuery {
    fn into_filter(self, project: Option<String>, default_limit: u32) -> RunFilter {
        RunFilter {
            project,
            status: non_empty(self.status),
            browser: non_empty(self.browser),
            spec: non_empty(self.spec),
            limit: parse_limit(self.limit.as_deref(), default_limit),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parse a `limit` query value, falling back to `default` when it is absent
/// or not a non-negative integer.
pub fn parse_limit(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// POST /webhook
///
/// The body is decoded as JSON whatever the `Content-Type`, since CI scripts
/// often post with bare `curl -d`.
pub async fn webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let run: NewTestRun = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "rejecting malformed webhook body");
        ApiError::bad_request("invalid JSON")
    })?;

    if !run.is_valid() {
        return Err(ApiError::bad_request("project and status are required"));
    }

    let stored = state.with_conn(move |conn| runs::insert_run(conn, &run)).await?;
    info!(
        id = stored.id,
        project = %stored.project,
        status = %stored.status,
        "recorded test result"
    );

    Ok((StatusCode::CREATED, Json(json!({ "status": "ok" }))))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "time": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    let summaries = state.with_conn(runs::project_summaries).await?;
    Ok(Json(summaries))
}

async fn project_results(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<Vec<TestRun>>, ApiError> {
    let filter = query.into_filter(Some(project), DEFAULT_PROJECT_LIMIT);
    let found = state
        .with_conn(move |conn| runs::query_runs(conn, &filter))
        .await?;
    Ok(Json(found))
}

async fn all_results(
    State(state): State<AppState>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<Vec<TestRun>>, ApiError> {
    let filter = query.into_filter(None, DEFAULT_GLOBAL_LIMIT);
    let found = state
        .with_conn(move |conn| runs::query_runs(conn, &filter))
        .await?;
    Ok(Json(found))
}
