//! Depot REST API
//!
//! Thin HTTP adapter over [`depot_engine`]: deserialize the request, call the
//! engine, serialize the result. Every storage route is a POST taking JSON.
//!
//! ## Transport behaviour
//!
//! - API-key gate: when a key is configured, every request (including
//!   `/ping` and unknown routes) must carry a matching `apikey` header,
//!   else `403` with an empty body
//! - Permissive CORS, so preflight requests never reach the gate
//! - Configurable JSON body limit
//! - `/ping` answers `200` for any method; unknown routes answer `404`
//! - Engine failures map to the client error class: `404` for a missing
//!   path, `400` otherwise, with a JSON `{"error": …}` body

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{any, post},
    Router,
};
use depot_engine::{
    EngineError, Item, Listing, StorageEngine, UploadByPayloadRequest, UploadByUrlRequest,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Header checked by the API-key gate.
const API_KEY_HEADER: &str = "apikey";

/// Application state shared by all request handlers.
///
/// Contains the storage engine every handler delegates to, plus the gate
/// key resolved at startup. `None` disables the gate.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<StorageEngine>,
    api_key: Option<String>,
}

impl AppState {
    pub fn new(engine: Arc<StorageEngine>, api_key: Option<String>) -> Self {
        Self { engine, api_key }
    }
}

/// Client-facing error: a status code plus a JSON `{"error": …}` body.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        let status = match e {
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct MkdirBody {
    path: String,
    folder: String,
}

#[derive(Debug, Deserialize)]
struct PathBody {
    path: String,
}

/// Build the application router.
///
/// `body_limit_bytes` bounds every JSON request body; base64 payload uploads
/// are the reason this is configurable rather than axum's default.
pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route("/upload/url", post(upload_url))
        .route("/upload/base64", post(upload_base64))
        .route("/fs/mkdir", post(fs_mkdir))
        .route("/fs/ls", post(fs_ls))
        .route("/fs/info", post(fs_info))
        .route("/fs/rm", post(fs_rm))
        .route("/ping", any(ping))
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
        .layer(DefaultBodyLimit::max(body_limit_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Reject any request without the configured `apikey` header.
///
/// Runs before routing decisions matter: unknown routes and `/ping` are
/// gated too. A missing configuration key disables the gate entirely.
async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(expected) = &state.api_key {
        let presented = request
            .headers()
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            return StatusCode::FORBIDDEN.into_response();
        }
    }
    next.run(request).await
}

#[axum::debug_handler]
async fn upload_url(
    State(state): State<AppState>,
    Json(requests): Json<Vec<UploadByUrlRequest>>,
) -> Result<Json<Vec<Item>>, ApiError> {
    match state.engine.upload_by_url(requests).await {
        Ok(items) => Ok(Json(items)),
        Err(e) => {
            tracing::error!("Upload by URL error: {:?}", e);
            Err(e.into())
        }
    }
}

#[axum::debug_handler]
async fn upload_base64(
    State(state): State<AppState>,
    Json(requests): Json<Vec<UploadByPayloadRequest>>,
) -> Result<Json<Vec<Item>>, ApiError> {
    match state.engine.upload_by_payload(requests).await {
        Ok(items) => Ok(Json(items)),
        Err(e) => {
            tracing::error!("Upload by payload error: {:?}", e);
            Err(e.into())
        }
    }
}

#[axum::debug_handler]
async fn fs_mkdir(
    State(state): State<AppState>,
    Json(body): Json<MkdirBody>,
) -> Result<Json<Item>, ApiError> {
    let path = format!("{}/{}", body.path, body.folder);
    match state.engine.mkdir(&path).await {
        Ok(item) => Ok(Json(item)),
        Err(e) => {
            tracing::error!("Mkdir error: {:?}", e);
            Err(e.into())
        }
    }
}

#[axum::debug_handler]
async fn fs_ls(
    State(state): State<AppState>,
    Json(body): Json<PathBody>,
) -> Result<Json<Listing>, ApiError> {
    match state.engine.list(&body.path) {
        Ok(listing) => Ok(Json(listing)),
        Err(e) => {
            tracing::error!("List error: {:?}", e);
            Err(e.into())
        }
    }
}

#[axum::debug_handler]
async fn fs_info(
    State(state): State<AppState>,
    Json(paths): Json<Vec<String>>,
) -> Result<Json<Vec<Item>>, ApiError> {
    match state.engine.info_many(&paths) {
        Ok(items) => Ok(Json(items)),
        Err(e) => {
            tracing::error!("Info error: {:?}", e);
            Err(e.into())
        }
    }
}

#[axum::debug_handler]
async fn fs_rm(
    State(state): State<AppState>,
    Json(body): Json<PathBody>,
) -> Result<StatusCode, ApiError> {
    match state.engine.remove(&body.path).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(e) => {
            tracing::error!("Remove error: {:?}", e);
            Err(e.into())
        }
    }
}

#[axum::debug_handler]
async fn ping() -> StatusCode {
    StatusCode::OK
}

#[axum::debug_handler]
async fn fallback() -> StatusCode {
    StatusCode::NOT_FOUND
}
