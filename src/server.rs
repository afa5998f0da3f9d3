//! HTTP API over the discovery pipeline and the architecture store.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Status, version, and store reachability |
//! | `GET`  | `/architectures` | Filter, sort, and page stored documents |
//! | `POST` | `/scrape` | Run the pipeline, optionally persisting the batch |
//!
//! # `GET /architectures`
//!
//! Query parameters: `skip` (default 0), `limit` (1..=200, default 25),
//! `q` (case-insensitive substring of `name`), `min_resources`, `sort_by`
//! (`name` or `resource_count`; anything else sorts by name), and
//! `sort_dir` (`asc`, the default, or anything else for descending).
//!
//! # `POST /scrape`
//!
//! ```json
//! { "limit": 25, "save": true, "sources": ["Azure/azure-quickstart-templates:quickstarts"] }
//! ```
//!
//! Missing or empty `sources` fall back to the configured list. With
//! `save`, the batch is upserted and then read back from the store by its
//! shared `created_at`, so the response reflects what was stored. Either
//! way the documents come back in discovery order.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "limit must be in [1, 200]" } }
//! ```
//!
//! Error codes: `bad_request` (400), `storage_unavailable` (400),
//! `upstream_unauthorized` (502), `upstream_error` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use archscan_core::models::ArchitectureDocument;
use archscan_core::store::{ArchitectureQuery, ArchitectureStore, SortDirection, SortKey};

use crate::config::Config;
use crate::error::HarvestError;
use crate::persist::save_many;
use crate::pipeline::Harvester;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    harvester: Arc<Harvester>,
    /// `None` when no `[db]` is configured.
    store: Option<Arc<dyn ArchitectureStore>>,
}

impl AppState {
    pub fn new(harvester: Arc<Harvester>, store: Option<Arc<dyn ArchitectureStore>>) -> Self {
        Self { harvester, store }
    }
}

/// Build the router with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/architectures", get(handle_list))
        .route("/scrape", post(handle_scrape))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind`.
///
/// Opens (and migrates) the SQLite store when `[db]` is configured;
/// otherwise the server runs without persistence and `/architectures`
/// answers 400.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    let store: Option<Arc<dyn ArchitectureStore>> = match &config.db {
        Some(db) => {
            let store = SqliteStore::open(db).await?;
            info!(path = %db.path.display(), "using SQLite store");
            Some(Arc::new(store))
        }
        None => {
            info!("no [db] configured; running without persistence");
            None
        }
    };
    let harvester = Arc::new(Harvester::from_config(config)?);
    info!(strategy = harvester.strategy(), "template location strategy");

    let app = router(AppState::new(harvester, store));

    println!("archscan listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
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
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn storage_unavailable(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "storage_unavailable".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<HarvestError> for AppError {
    fn from(err: HarvestError) -> Self {
        let message = err.to_string();
        match err {
            HarvestError::InvalidSource(_) | HarvestError::InvalidLimit(_) => bad_request(message),
            HarvestError::StorageUnavailable(_) => storage_unavailable(message),
            HarvestError::Unauthorized { .. } => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "upstream_unauthorized".to_string(),
                message,
            },
            HarvestError::RemoteApi { .. }
            | HarvestError::Transport { .. }
            | HarvestError::Decode { .. } => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "upstream_error".to_string(),
                message,
            },
            HarvestError::Storage(_) => {
                error!(error = %message, "storage failure");
                internal(message)
            }
        }
    }
}

fn require_store(state: &AppState) -> Result<&Arc<dyn ArchitectureStore>, AppError> {
    state
        .store
        .as_ref()
        .ok_or_else(|| {
            storage_unavailable("No database configured. Add a [db] section or set ARCHSCAN_DB_PATH.")
        })
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// `"ok"`, or `"degraded"` when a configured store does not answer.
    status: String,
    version: String,
    /// `null` without a store.
    store: Option<bool>,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = match &state.store {
        Some(store) => Some(store.ping().await.is_ok()),
        None => None,
    };
    let status = if store == Some(false) { "degraded" } else { "ok" };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store,
    })
}

// ============ GET /architectures ============

#[derive(Deserialize)]
struct ListParams {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_list_limit")]
    limit: usize,
    q: Option<String>,
    min_resources: Option<usize>,
    sort_by: Option<String>,
    sort_dir: Option<String>,
}

fn default_list_limit() -> usize {
    25
}

impl ListParams {
    fn into_query(self) -> Result<ArchitectureQuery, AppError> {
        if !(1..=200).contains(&self.limit) {
            return Err(bad_request("limit must be in [1, 200]"));
        }
        Ok(ArchitectureQuery {
            name_contains: self.q.filter(|q| !q.is_empty()),
            min_resources: self.min_resources,
            created_at: None,
            sort_by: self
                .sort_by
                .as_deref()
                .map(SortKey::parse_lenient)
                .unwrap_or_default(),
            direction: self
                .sort_dir
                .as_deref()
                .map(SortDirection::parse_lenient)
                .unwrap_or_default(),
            skip: self.skip,
            limit: self.limit,
        })
    }
}

async fn handle_list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<ArchitectureDocument>>, AppError> {
    let store = require_store(&state)?;
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    let query = params.into_query()?;
    let docs = store
        .find(&query)
        .await
        .map_err(|e| AppError::from(HarvestError::Storage(e)))?;
    Ok(Json(docs))
}

// ============ POST /scrape ============

#[derive(Deserialize)]
struct ScrapeRequest {
    #[serde(default = "default_list_limit")]
    limit: usize,
    #[serde(default = "default_save")]
    save: bool,
    #[serde(default)]
    sources: Option<Vec<String>>,
}

fn default_save() -> bool {
    true
}

async fn handle_scrape(
    State(state): State<AppState>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<Vec<ArchitectureDocument>>, AppError> {
    let Json(req) = body.map_err(|e| bad_request(e.body_text()))?;

    let store = if req.save {
        Some(state.store.as_ref().ok_or_else(|| {
            AppError::from(HarvestError::StorageUnavailable(
                "save=true but no database is configured".to_string(),
            ))
        })?)
    } else {
        None
    };

    let docs = state
        .harvester
        .fetch_architectures(req.limit, req.sources.as_deref())
        .await?;

    let Some(store) = store else {
        return Ok(Json(docs));
    };

    save_many(Some(&**store), &docs).await?;
    let Some(stamp) = docs.first().and_then(|d| d.created_at.clone()) else {
        return Ok(Json(Vec::new()));
    };
    let mut saved = store
        .find(&ArchitectureQuery::batch(stamp, req.limit))
        .await
        .map_err(|e| AppError::from(HarvestError::Storage(e)))?;
    let position: HashMap<_, usize> = docs
        .iter()
        .enumerate()
        .map(|(i, d)| (d.natural_key(), i))
        .collect();
    saved.sort_by_key(|d| position.get(&d.natural_key()).copied().unwrap_or(usize::MAX));
    Ok(Json(saved))
}
