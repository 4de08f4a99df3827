//! Route handlers for the optional HTTP service. Each handler builds an
//! [`IngestOptions`] from its request shape and drives the same
//! [`crate::ingest::ingest`] pipeline the CLI uses.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::CacheBackend;
use crate::error::Error;
use crate::types::IngestOptions;

use super::AppState;

/// In-process store backing `/api/download/file/{id}` when no object-storage
/// cache is configured: streams the persisted digest blob directly; `503`
/// when an object-storage cache is configured instead.
#[derive(Default)]
pub struct DownloadStore {
    blobs: Mutex<HashMap<Uuid, String>>,
}

impl DownloadStore {
    fn insert(&self, id: Uuid, blob: String) {
        self.blobs.lock().unwrap().insert(id, blob);
    }

    fn get(&self, id: &Uuid) -> Option<String> {
        self.blobs.lock().unwrap().get(id).cloned()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Include,
    Exclude,
}

#[derive(Debug, Deserialize)]
pub struct IngestBody {
    pub input_text: String,
    pub max_file_size: Option<u64>,
    pub pattern_type: Option<PatternType>,
    pub pattern: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IngestQueryParams {
    pub max_file_size: Option<u64>,
    pub pattern_type: Option<PatternType>,
    pub pattern: Option<String>,
    pub token: Option<String>,
    pub branch: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub summary: String,
    pub tree: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest_url: Option<String>,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

pub async fn ingest_post(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IngestBody>,
) -> Result<Json<IngestResponse>, ApiError> {
    let (include, exclude) = split_pattern(body.pattern_type, body.pattern);
    let opts = IngestOptions {
        max_file_size: body.max_file_size.unwrap_or(state.config.default_max_file_size),
        max_files: state.config.default_max_files,
        max_total_size: state.config.default_max_total_size,
        include_patterns: include,
        exclude_patterns: exclude,
        token: body.token,
        ..IngestOptions::default()
    };
    run_ingest(&state, &body.input_text, opts).await
}

pub async fn ingest_get(
    State(state): State<Arc<AppState>>,
    Path((user, repo)): Path<(String, String)>,
    Query(params): Query<IngestQueryParams>,
) -> Result<Json<IngestResponse>, ApiError> {
    let source = format!("{user}/{repo}");
    let (include, exclude) = split_pattern(params.pattern_type, params.pattern);
    let opts = IngestOptions {
        max_file_size: params.max_file_size.unwrap_or(state.config.default_max_file_size),
        max_files: state.config.default_max_files,
        max_total_size: state.config.default_max_total_size,
        include_patterns: include,
        exclude_patterns: exclude,
        branch: params.branch,
        tag: params.tag,
        token: params.token,
        ..IngestOptions::default()
    };
    run_ingest(&state, &source, opts).await
}

async fn run_ingest(state: &AppState, source: &str, opts: IngestOptions) -> Result<Json<IngestResponse>, ApiError> {
    let digest = crate::ingest::ingest(source, &opts, state.cache.as_ref()).await?;

    let digest_url = if state.cache.is_none() {
        let id = Uuid::new_v4();
        state.downloads.insert(id, digest.as_blob());
        Some(format!("/api/download/file/{id}"))
    } else {
        None
    };

    Ok(Json(IngestResponse {
        summary: digest.summary,
        tree: digest.tree,
        content: digest.content,
        digest_url,
    }))
}

/// Serves a previously-ingested blob by id, or `503` when the object-storage
/// cache is enabled (callers should use the `digest_url` the ingest call
/// already returned instead of this endpoint).
pub async fn download_file(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    if state.config.cache_backend != CacheBackend::Disabled {
        return (StatusCode::SERVICE_UNAVAILABLE, "object-storage cache is enabled; use digest_url").into_response();
    }
    match state.downloads.get(&id) {
        Some(blob) => ([("content-type", "text/plain; charset=utf-8")], blob).into_response(),
        None => (StatusCode::NOT_FOUND, "unknown digest id").into_response(),
    }
}

fn split_pattern(kind: Option<PatternType>, pattern: Option<String>) -> (Vec<String>, Vec<String>) {
    let Some(pattern) = pattern else {
        return (Vec::new(), Vec::new());
    };
    match kind {
        Some(PatternType::Include) => (vec![pattern], Vec::new()),
        Some(PatternType::Exclude) | None => (Vec::new(), vec![pattern]),
    }
}

/// Maps the library's `Error` taxonomy onto HTTP status codes. Credentials
/// never flow through `Display`, so it's safe to forward the message
/// verbatim to the client.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidInput(_) | Error::InvalidPattern(_) | Error::NotADirectory(_) => StatusCode::BAD_REQUEST,
            Error::UnknownDomain(_) | Error::NoHostFound(_) => StatusCode::BAD_REQUEST,
            Error::RepoNotFound(_) | Error::RefNotFound(_) => StatusCode::NOT_FOUND,
            Error::RemoteError(_) | Error::CloneError(_) => StatusCode::BAD_GATEWAY,
            Error::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::LimitExceeded(_) | Error::InvalidNotebook(_) => StatusCode::OK,
            Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}
