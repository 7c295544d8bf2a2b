//! Search HTTP service.
//!
//! Exposes the ranked search over a small JSON API. The service only reads
//! the store; it can run alongside an ingest run.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/search?q=&since=&limit=` | Ranked article search |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `timeout` (408), `internal` (500).

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, RetrievalConfig};
use crate::db;
use crate::models::SearchHit;
use crate::search::{search, SearchError, SearchRequest};
use crate::store::ArticleStore;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    store: Arc<ArticleStore>,
    retrieval: Arc<RetrievalConfig>,
}

impl AppState {
    pub fn new(store: ArticleStore, retrieval: RetrievalConfig) -> Self {
        Self {
            store: Arc::new(store),
            retrieval: Arc::new(retrieval),
        }
    }
}

/// Starts the search server on `[server].bind` and runs until terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = ArticleStore::new(db::connect_reader(config)?);
    let app = router(AppState::new(store, config.retrieval.clone()));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, db = %config.db.path.display(), "search service listening");
    println!("Search service listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", get(handle_search))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
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

/// Internal error type that converts into an Axum HTTP response.
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

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        let message = err.to_string();
        match err {
            e if e.is_client_error() => AppError {
                status: StatusCode::BAD_REQUEST,
                code: "bad_request",
                message,
            },
            SearchError::Timeout(_) => AppError {
                status: StatusCode::REQUEST_TIMEOUT,
                code: "timeout",
                message,
            },
            _ => {
                tracing::error!(error = %message, "search failed");
                AppError {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code: "internal",
                    message,
                }
            }
        }
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

// ============ GET /search ============

/// Raw query string. Everything is optional here so that validation errors
/// use the JSON error contract instead of the extractor's plain-text rejection.
#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    since: Option<String>,
    limit: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    query: String,
    count: usize,
    results: Vec<SearchHit>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let req = SearchRequest {
        query: params.q.unwrap_or_default(),
        since: params.since,
        limit: params.limit,
    };

    let results = search(&state.store, &state.retrieval, &req, Utc::now()).await?;

    Ok(Json(SearchResponse {
        query: req.query,
        count: results.len(),
        results,
    }))
}
