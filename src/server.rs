//! Read-only HTTP query layer.
//!
//! Serves the harvested catalog as JSON. Nothing here writes; crawls go
//! through the CLI.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/api/tools` | Filtered, paginated tool listing |
//! | `GET`  | `/api/tools/{id}` | One tool with its category name |
//! | `GET`  | `/api/categories` | Category names, ascending |
//! | `GET`  | `/api/categories/stats` | Tool count per category |
//! | `GET`  | `/api/stats` | Totals by category and pricing |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "limit must be between 1 and 100" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use tool_harvest_core::models::ToolStats;
use tool_harvest_core::store::{ToolPage, ToolStore, ToolView, DEFAULT_PAGE_LIMIT};

use crate::config::Config;
use crate::list::build_query;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn ToolStore>,
}

/// Starts the HTTP server on `[server].bind`.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let bind_addr = config.server.bind.clone();

    let app = router(Arc::new(store));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP server listening on http://{}", bind_addr);
    println!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router over any [`ToolStore`].
pub fn router(store: Arc<dyn ToolStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/tools", get(handle_list_tools))
        .route("/api/tools/{id}", get(handle_get_tool))
        .route("/api/categories", get(handle_categories))
        .route("/api/categories/stats", get(handle_category_stats))
        .route("/api/stats", get(handle_stats))
        .layer(cors)
        .with_state(AppState { store })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

/// Storage failures are logged in full and reported without detail.
fn internal(err: anyhow::Error) -> AppError {
    error!("Request failed: {:#}", err);
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: "internal error".to_string(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/tools ============

/// Query string for `GET /api/tools`. `tags` is comma-separated.
#[derive(Debug, Deserialize)]
struct ListParams {
    search: Option<String>,
    category: Option<String>,
    pricing: Option<String>,
    tags: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

async fn handle_list_tools(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ToolPage>, AppError> {
    let tags = params
        .tags
        .map(|t| t.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    let query = build_query(
        params.search,
        params.category,
        params.pricing.as_deref(),
        tags,
        params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        params.offset.unwrap_or(0),
    )
    .map_err(|e| bad_request(e.to_string()))?;

    let page = state.store.list_tools(&query).await.map_err(internal)?;
    Ok(Json(page))
}

// ============ GET /api/tools/{id} ============

async fn handle_get_tool(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ToolView>, AppError> {
    state
        .store
        .get_tool(&id)
        .await
        .map_err(internal)?
        .map(Json)
        .ok_or_else(|| not_found(format!("tool not found: {}", id)))
}

// ============ /api/categories ============

async fn handle_categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let names = state.store.list_categories().await.map_err(internal)?;
    Ok(Json(names))
}

async fn handle_category_stats(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, i64>>, AppError> {
    let stats = state.store.stats().await.map_err(internal)?;
    Ok(Json(stats.by_category))
}

// ============ GET /api/stats ============

async fn handle_stats(State(state): State<AppState>) -> Result<Json<ToolStats>, AppError> {
    let stats = state.store.stats().await.map_err(internal)?;
    Ok(Json(stats))
}
