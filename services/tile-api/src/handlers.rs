//! HTTP handlers and router.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use radar_common::TileCoord;
use renderer::{empty_tile, render_tile_at, RenderError};

use crate::state::AppState;

/// Build the service router.
pub fn router(state: Arc<AppState>, prometheus_handle: PrometheusHandle) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/tiles/:z/:x/:y", get(tile_handler))
        .route("/api/metadata", get(metadata_handler))
        .route("/api/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
        .layer(Extension(prometheus_handle))
}

/// GET / - service info and endpoint index.
async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "name": "Radar Mosaic Tile Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "tiles": "/tiles/{z}/{x}/{y}.png",
            "metadata": "/api/metadata",
            "health": "/api/health",
            "metrics": "/metrics",
        },
    }))
}

/// GET /tiles/:z/:x/:y(.png) - XYZ tile endpoint.
///
/// Coordinates are validated here; the renderer only ever sees valid
/// tiles. Every data-availability failure resolves to the cached empty
/// tile, never an error status.
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((z, x, y)): Path<(u32, u32, String)>,
) -> Response {
    // The row segment may carry a ".png" suffix.
    let (y_str, _) = y.rsplit_once('.').unwrap_or((y.as_str(), "png"));
    let y: u32 = match y_str.parse() {
        Ok(v) => v,
        Err(_) => return bad_request("Invalid tile coordinates"),
    };

    let coord = TileCoord::new(z, x, y);
    if !coord.is_valid() {
        return bad_request("Invalid tile coordinates");
    }

    counter!("radar_tile_requests_total").increment(1);

    let raster_path = state.config.latest_raster_path();
    let body = if raster_path.exists() {
        match tokio::task::spawn_blocking(move || render_tile_at(&raster_path, &coord)).await {
            Ok(Ok(png)) => png,
            Ok(Err(RenderError::OutsideBounds)) => empty_tile().to_vec(),
            Ok(Err(e)) => {
                warn!(error = %e, z = coord.z, x = coord.x, y = coord.y, "Tile render failed");
                counter!("radar_tile_errors_total").increment(1);
                empty_tile().to_vec()
            }
            Err(e) => {
                warn!(error = %e, "Tile render task panicked");
                counter!("radar_tile_errors_total").increment(1);
                empty_tile().to_vec()
            }
        }
    } else {
        // Nothing published yet.
        empty_tile().to_vec()
    };

    (
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "public, max-age=60"),
        ],
        body,
    )
        .into_response()
}

/// GET /api/metadata - current published capture timestamp and the
/// static data bounds. Map clients poll this to detect new data.
pub async fn metadata_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    let bounds = state.config.bounds;

    match state.published().await {
        Some(published) => Json(json!({
            "timestamp": published.captured_at.to_rfc3339(),
            "timestamp_unix": published.captured_at.timestamp(),
            "status": "ok",
            "bounds": bounds,
        })),
        None => Json(json!({
            "timestamp": null,
            "timestamp_unix": null,
            "status": "no_data",
            "message": "No radar data available yet. Data is being fetched...",
            "bounds": bounds,
        })),
    }
}

/// GET /api/health - liveness signal.
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// GET /metrics - Prometheus exposition.
async fn metrics_handler(Extension(handle): Extension<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

fn bad_request(detail: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
}
