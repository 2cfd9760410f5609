use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use newsdex_core::index::IndexStats;
use newsdex_core::persist::{open_index, IndexPaths};
use newsdex_core::present::{Hit, PresentOptions, Presenter, SHOW_MAX};
use newsdex_core::{query, JsonLoader, NewsId, NewsItem, Searcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default)]
    pub snippet: bool,
    #[serde(default)]
    pub all: bool,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<Hit>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

/// Error surfaced to HTTP clients: a status plus a JSON body.
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, kind: &'static str, error: impl Into<String>) -> Self {
        Self { status, body: ErrorResponse { error: error.into(), kind } }
    }
}

impl From<newsdex_core::Error> for ApiError {
    fn from(err: newsdex_core::Error) -> Self {
        let status = match &err {
            newsdex_core::Error::UnknownNews(_) => StatusCode::NOT_FOUND,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        }
        Self::new(status, err.kind(), err.to_string())
    }
}

impl From<newsdex_core::error::QuerySyntaxError> for ApiError {
    fn from(err: newsdex_core::error::QuerySyntaxError) -> Self { newsdex_core::Error::from(err).into() }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response { (self.status, Json(self.body)).into_response() }
}

/// The searcher currently served. Readers clone the inner `Arc`; a reload builds a new
/// searcher and swaps the pointer, so in-flight requests keep the snapshot they started with.
#[derive(Clone)]
pub struct AppState {
    pub index_dir: PathBuf,
    pub searcher: Arc<RwLock<Arc<Searcher>>>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn snapshot(&self) -> Arc<Searcher> { self.searcher.read().clone() }
}

fn open_searcher(index_dir: &std::path::Path) -> Result<Searcher> {
    let index = open_index(&IndexPaths::new(index_dir))
        .with_context(|| format!("opening index in {}", index_dir.display()))?;
    Ok(Searcher::new(index))
}

pub fn build_app(index_dir: impl Into<PathBuf>) -> Result<Router> {
    let index_dir = index_dir.into();
    let searcher = open_searcher(&index_dir)?;
    let admin_token = std::env::var("ADMIN_TOKEN").ok();
    let app_state = AppState { index_dir, searcher: Arc::new(RwLock::new(Arc::new(searcher))), admin_token };
    Ok(router(app_state))
}

pub fn router(app_state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/stats", get(stats_handler))
        .route("/search", get(search_handler))
        .route("/news/:news_id", get(news_handler))
        .route("/index/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let searcher = state.snapshot();
    let response = blocking(move || search(&searcher, params)).await??;
    Ok(Json(response))
}

/// Evaluation and presentation merge postings and re-read source files, so they run on the
/// blocking pool.
fn search(searcher: &Searcher, params: SearchParams) -> Result<SearchResponse, ApiError> {
    let start = std::time::Instant::now();
    let Some(parsed) = query::parse(&params.q)? else {
        return Ok(SearchResponse { query: params.q, took_s: start.elapsed().as_secs_f64(), total_hits: 0, results: vec![] });
    };
    let results = searcher.rank(searcher.evaluate(&parsed)?, &parsed);

    let limit = if params.all { None } else { Some(params.limit.unwrap_or(SHOW_MAX)) };
    let options = PresentOptions { limit, snippets: params.snippet };
    let mut presenter = Presenter::new(searcher.index(), &JsonLoader);
    let hits = presenter.present(&results, Some(&parsed), options)?;

    let elapsed = start.elapsed();
    tracing::debug!(query = %parsed, hits = results.len(), "search");
    Ok(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits: results.len(), results: hits })
}

pub async fn news_handler(State(state): State<AppState>, Path(news_id): Path<NewsId>) -> Result<Json<NewsItem>, ApiError> {
    let searcher = state.snapshot();
    let item = blocking(move || {
        let mut presenter = Presenter::new(searcher.index(), &JsonLoader);
        let item = presenter.item(news_id)?.clone();
        Ok::<_, ApiError>(item)
    })
    .await??;
    Ok(Json(item))
}

async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "blocking task failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", e.to_string())
    })
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<IndexStats> {
    Json(state.snapshot().index().stats())
}

async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let index_dir = state.index_dir.clone();
    let searcher = blocking(move || open_searcher(&index_dir))
        .await?
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "reload_failed", format!("{e:#}")))?;
    let news = searcher.index().news_count();
    *state.searcher.write() = Arc::new(searcher);
    tracing::info!(news, "reloaded index");
    Ok(Json(serde_json::json!({ "reloaded": true, "news": news })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", "ADMIN_TOKEN not set")),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", "invalid admin token"))
    }
}
