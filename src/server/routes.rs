//! JSON routes over [`Library`].
//!
//! Every library call blocks, so handlers hop onto the blocking pool and
//! await the result. Failures come back as `{ok: false, error}`.

use crate::catalog::facets::FiltersPayload;
use crate::catalog::search::{SearchHit, SearchRequest};
use crate::error::ShelfError;
use crate::models::{InstallRequest, Library, Outcome, StatusReport};
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,
}

impl AppState {
    #[must_use]
    pub fn new(library: Arc<Library>) -> Self {
        Self { library }
    }
}

/// Error body `{ok: false, error}` with a status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ShelfError> for ApiError {
    fn from(e: ShelfError) -> Self {
        if e.is_invalid_input() {
            Self::bad_request(e.to_string())
        } else {
            Self::internal(e.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}", self.message);
        }
        (self.status, Json(json!({ "ok": false, "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Run a library call on the blocking pool
async fn blocking<T, F>(state: &AppState, call: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Library) -> T + Send + 'static,
{
    let library = Arc::clone(&state.library);
    tokio::task::spawn_blocking(move || call(&library))
        .await
        .map_err(|e| ApiError::internal(format!("Worker task failed: {e}")))
}

/// Build the router, nested under `route_base`
pub fn router(state: AppState, route_base: &str) -> Router {
    let api = Router::new()
        .route("/status", get(status))
        .route("/filters", get(filters))
        .route("/search", get(search))
        .route("/progress/{version_id}", get(progress))
        .route("/token", post(save_token))
        .route("/token/clear", post(clear_token))
        .route("/install", post(install))
        .route("/uninstall", post(uninstall))
        .with_state(state);

    let base = route_base.trim().trim_matches('/');
    let app = if base.is_empty() {
        api
    } else {
        Router::new().nest(&format!("/{base}"), api)
    };

    app.layer(TraceLayer::new_for_http())
}

async fn status(State(state): State<AppState>) -> ApiResult<Json<StatusReport>> {
    Ok(Json(blocking(&state, Library::status).await?))
}

#[derive(Debug, Default, Deserialize)]
struct FiltersParams {
    force: Option<String>,
}

async fn filters(
    State(state): State<AppState>,
    Query(params): Query<FiltersParams>,
) -> ApiResult<(StatusCode, Json<FiltersPayload>)> {
    let force = params.force.as_deref().map(str::trim) == Some("1");
    let payload = blocking(&state, move |library| library.filters(force)).await?;

    let code = if payload.ok {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    Ok((code, Json(payload)))
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    ok: bool,
    items: Vec<SearchHit>,
}

async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchRequest>, QueryRejection>,
) -> ApiResult<Json<SearchResponse>> {
    let Query(request) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let items = blocking(&state, move |library| library.search(&request)).await??;
    Ok(Json(SearchResponse { ok: true, items }))
}

async fn progress(
    State(state): State<AppState>,
    Path(version_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let Ok(id) = version_id.trim().parse::<u64>() else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "progress": 0 })));
    };
    let percent = state.library.progress(&id.to_string());
    (StatusCode::OK, Json(json!({ "progress": percent })))
}

/// Lenient JSON body: anything that isn't an object reads as `{}`
fn json_object(body: &[u8]) -> Value {
    serde_json::from_slice::<Value>(body)
        .ok()
        .filter(Value::is_object)
        .unwrap_or_else(|| json!({}))
}

fn string_field(body: &Value, key: &str) -> Option<String> {
    let value = match body.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    (!value.is_empty()).then_some(value)
}

fn version_id(body: &Value) -> ApiResult<u64> {
    let value = match body.get("versionId") {
        None | Some(Value::Null) => return Err(ApiError::bad_request("Missing versionId.")),
        Some(v) => v,
    };

    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| ApiError::bad_request("Invalid versionId."))
}

fn outcome_response(outcome: Outcome) -> (StatusCode, Json<Outcome>) {
    let code = if outcome.ok {
        StatusCode::OK
    } else if outcome.invalid_input {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (code, Json(outcome))
}

async fn save_token(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let token = string_field(&json_object(&body), "token").unwrap_or_default();
    blocking(&state, move |library| library.save_token(&token))
        .await?
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({ "ok": true })))
}

async fn clear_token(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    blocking(&state, Library::clear_token)
        .await?
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(json!({ "ok": true })))
}

async fn install(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Outcome>)> {
    let body = json_object(&body);
    let request = InstallRequest {
        version_id: version_id(&body)?,
        base_model: string_field(&body, "baseModel"),
        file_format: string_field(&body, "fileFormat"),
        category: string_field(&body, "category"),
    };

    let outcome = blocking(&state, move |library| library.install(&request)).await?;
    Ok(outcome_response(outcome))
}

async fn uninstall(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Outcome>)> {
    let version_id = version_id(&json_object(&body))?;
    let outcome = blocking(&state, move |library| library.uninstall(version_id)).await?;
    Ok(outcome_response(outcome))
}
