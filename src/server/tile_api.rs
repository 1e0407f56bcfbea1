//! Tile HTTP API.
//!
//! - GET /{zoom}/{x}/{y}.png
//! - GET /stats
//! - GET /health
//! - GET /metrics
//!
//! Tiles are served by a fixed policy: cache, then origin, then the
//! placeholder. Apart from a malformed coordinate (400) the tile endpoint
//! always answers 200 with some PNG.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::header::{self, HeaderName};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::cache::stats::scan_in_background;
use crate::cache::TileStore;
use crate::metrics::TileMetrics;
use crate::origin::TileFetcher;
use crate::placeholder::placeholder;
use crate::tile::{Provenance, TileCoord, TileError};

/// Response header naming the path that produced the tile.
pub const PROVENANCE_HEADER: &str = "x-tile-source";

const TILE_CACHE_CONTROL: &str = "public, max-age=86400";

/// Application state shared across handlers.
pub struct AppState {
    pub store: Arc<TileStore>,
    pub fetcher: Arc<dyn TileFetcher>,
    pub metrics: TileMetrics,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<TileStore>, fetcher: Arc<dyn TileFetcher>, metrics: TileMetrics) -> Self {
        Self {
            store,
            fetcher,
            metrics,
            start_time: Instant::now(),
        }
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/{zoom}/{x}/{y}", get(get_tile))
        .route("/stats", get(cache_stats))
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

// ─── Tile Serving ──────────────────────────────────────────────────────────

/// Tile bytes plus where they came from.
#[derive(Debug, Clone)]
pub struct TileResponse {
    pub data: Bytes,
    pub provenance: Provenance,
}

impl IntoResponse for TileResponse {
    fn into_response(self) -> Response {
        // placeholders must not stick in browser caches
        let cache_control = match self.provenance {
            Provenance::Placeholder => "no-store",
            _ => TILE_CACHE_CONTROL,
        };
        (
            [
                (header::CONTENT_TYPE, "image/png"),
                (header::CACHE_CONTROL, cache_control),
                (
                    HeaderName::from_static(PROVENANCE_HEADER),
                    self.provenance.as_str(),
                ),
            ],
            self.data,
        )
            .into_response()
    }
}

impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// Resolve one tile through cache → origin → placeholder.
///
/// The origin fetch and the cache write run in their own task, so a client
/// that disconnects mid-fetch still leaves the tile cached for next time.
pub async fn serve_tile(state: Arc<AppState>, coord: TileCoord) -> TileResponse {
    match state.store.get(coord).await {
        Ok(Some(data)) => return respond(&state, data, Provenance::Cache),
        Ok(None) => {}
        Err(e) => warn!(tile = %coord, error = %e, "Cache read failed, treating as miss"),
    }

    let task_state = state.clone();
    let fetched = tokio::spawn(async move { fetch_and_store(&task_state, coord).await }).await;

    match fetched {
        Ok(Some(data)) => respond(&state, data, Provenance::Origin),
        Ok(None) => respond(&state, placeholder(), Provenance::Placeholder),
        Err(e) => {
            warn!(tile = %coord, error = %e, "Origin task aborted, serving placeholder");
            respond(&state, placeholder(), Provenance::Placeholder)
        }
    }
}

/// Fetch from the origin and persist. `None` means the origin failed.
async fn fetch_and_store(state: &AppState, coord: TileCoord) -> Option<Bytes> {
    let data = match state.fetcher.fetch(coord).await {
        Ok(data) => data,
        Err(e) => {
            warn!(tile = %coord, error = %e, "Origin fetch failed, serving placeholder");
            state.metrics.record_origin_failure();
            return None;
        }
    };

    if let Err(e) = state.store.put(coord, &data).await {
        warn!(tile = %coord, error = %e, "Failed to cache tile");
        state.metrics.record_cache_write_failure();
    }

    Some(data)
}

fn respond(state: &AppState, data: Bytes, provenance: Provenance) -> TileResponse {
    state.metrics.record_served(provenance);
    TileResponse { data, provenance }
}

async fn get_tile(
    State(state): State<Arc<AppState>>,
    Path((zoom, x, y)): Path<(String, String, String)>,
) -> Result<TileResponse, TileError> {
    let coord = TileCoord::from_path_segments(&zoom, &x, &y).inspect_err(|e| {
        debug!(%zoom, %x, %y, error = %e, "Rejected tile request");
    })?;
    Ok(serve_tile(state, coord).await)
}

// ─── Statistics ────────────────────────────────────────────────────────────

/// Cache statistics response.
#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    pub cached_tiles: u64,
    pub cache_size_mb: f64,
    pub cache_dir: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStatsResponse> {
    let root = state.store.root().to_path_buf();
    let snapshot = scan_in_background(root.clone()).await;

    Json(CacheStatsResponse {
        cached_tiles: snapshot.tile_count,
        cache_size_mb: snapshot.size_mb(),
        cache_dir: root.display().to_string(),
    })
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, StatusCode> {
    let body = state.metrics.render().map_err(|e| {
        warn!(error = %e, "Failed to render metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}
