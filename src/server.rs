//! HTTP API for the chunk admin UI.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/api/health` | Liveness plus which collaborators are configured |
//! | `POST`   | `/api/chunks/query` | Query chunks (id, semantic, or filter) with pagination |
//! | `GET`    | `/api/chunks/{id}` | Fetch one chunk |
//! | `PUT`    | `/api/chunks/{id}` | Update content and/or metadata |
//! | `DELETE` | `/api/chunks/{id}` | Delete one chunk (idempotent) |
//! | `GET`    | `/api/stats` | Index statistics, proxied verbatim |
//! | `POST`   | `/api/query/process` | Rewrite each line of a query with a prompt |
//!
//! # Error Contract
//!
//! ```json
//! { "success": false, "error": { "code": "bad_request", "message": "..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `upstream_error` (500).
//! A missing credential surfaces as `upstream_error` naming the variable.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser UI can be
//! served from a different port.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::ChunkError;
use crate::models::{Chunk, ProcessQueryRequest, QueryChunksRequest, UpdateChunkRequest};
use crate::providers::Providers;
use crate::store::VectorStore;
use crate::{mutation, processor, query, stats};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    providers: Arc<Providers>,
}

/// Starts the HTTP server with collaborators resolved from config and environment.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let providers = Providers::new(Arc::new(config.clone()));
    run_server_with_providers(&config.server.bind, Arc::new(providers)).await
}

/// Starts the HTTP server backed by an in-process vector store.
///
/// Embedding and language-model calls still go to the configured providers.
pub async fn run_server_in_memory(
    config: &Config,
    store: Arc<dyn VectorStore>,
) -> anyhow::Result<()> {
    let providers = Providers::new(Arc::new(config.clone())).with_vector_store(store);
    run_server_with_providers(&config.server.bind, Arc::new(providers)).await
}

/// Binds `bind_addr` and serves until the process is terminated.
pub async fn run_server_with_providers(
    bind_addr: &str,
    providers: Arc<Providers>,
) -> anyhow::Result<()> {
    let status = providers.status();
    if !status.vector_store || !status.index {
        warn!("vector store is not configured; chunk endpoints will fail until PINECONE_API_KEY and PINECONE_INDEX are set");
    }

    let app = build_router(providers);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %listener.local_addr()?, "chunk admin API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the router; exposed so tests can drive it without a socket.
pub fn build_router(providers: Arc<Providers>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handle_health))
        .route("/api/chunks/query", post(handle_query))
        .route(
            "/api/chunks/{id}",
            get(handle_get).put(handle_update).delete(handle_delete),
        )
        .route("/api/stats", get(handle_stats))
        .route("/api/query/process", post(handle_process))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { providers })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }
}

impl From<ChunkError> for AppError {
    fn from(err: ChunkError) -> Self {
        let (status, code) = match &err {
            ChunkError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ChunkError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ChunkError::Upstream { .. } | ChunkError::ConfigurationMissing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "upstream_error")
            }
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(code = self.code, message = %self.message, "request failed");
        } else {
            warn!(code = self.code, message = %self.message, "request rejected");
        }
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
    config: HealthConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthConfig {
    vector_store: &'static str,
    index: &'static str,
    embedding: &'static str,
    llm: &'static str,
}

fn configured(ready: bool) -> &'static str {
    if ready {
        "Configured"
    } else {
        "Not configured"
    }
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.providers.status();
    Json(HealthResponse {
        status: "OK",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        config: HealthConfig {
            vector_store: configured(status.vector_store),
            index: configured(status.index),
            embedding: configured(status.embedding),
            llm: configured(status.llm),
        },
    })
}

// ============ POST /api/chunks/query ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    success: bool,
    chunks: Vec<Chunk>,
    total: usize,
    page: usize,
    page_size: usize,
}

async fn handle_query(
    State(state): State<AppState>,
    body: Result<Json<QueryChunksRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, AppError> {
    let Json(request) = body?;
    request.validate()?;

    let page = query::query_page(&state.providers, &request).await?;
    Ok(Json(QueryResponse {
        success: true,
        chunks: page.chunks,
        total: page.total,
        page: page.page,
        page_size: page.page_size,
    }))
}

// ============ /api/chunks/{id} ============

#[derive(Serialize)]
struct ChunkResponse {
    success: bool,
    chunk: Chunk,
}

#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChunkResponse>, AppError> {
    let chunk = mutation::fetch_chunk(&state.providers, &id)
        .await?
        .ok_or_else(|| ChunkError::not_found(&id))?;
    Ok(Json(ChunkResponse {
        success: true,
        chunk,
    }))
}

async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateChunkRequest>, JsonRejection>,
) -> Result<Json<ChunkResponse>, AppError> {
    let Json(request) = body?;
    let chunk = mutation::apply_update(&state.providers, &id, &request).await?;
    Ok(Json(ChunkResponse {
        success: true,
        chunk,
    }))
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    mutation::delete_chunk(&state.providers, &id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Chunk with id {} deleted successfully", id),
    }))
}

// ============ GET /api/stats ============

#[derive(Serialize)]
struct StatsResponse {
    success: bool,
    stats: Value,
}

async fn handle_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let stats = stats::index_stats(&state.providers).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

// ============ POST /api/query/process ============

#[derive(Serialize)]
struct ProcessResponse {
    success: bool,
    results: Vec<String>,
}

async fn handle_process(
    State(state): State<AppState>,
    body: Result<Json<ProcessQueryRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, AppError> {
    let Json(request) = body?;
    request.validate()?;
    let results = processor::process_query(&state.providers, &request.query, &request.prompt).await?;
    Ok(Json(ProcessResponse {
        success: true,
        results,
    }))
}
