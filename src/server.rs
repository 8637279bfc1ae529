use crate::classify::Classifier;
use crate::config::ServerConfig;
use crate::nearest::NearestZone;
use crate::processing::{legend, LegendEntry};
use crate::render::{colorbar_png, ColorScale};
use crate::store::{RefreshStatus, SnapshotStore};
use crate::types::{MapDataset, TableDataset};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const COLORBAR_WIDTH: u32 = 256;
const COLORBAR_HEIGHT: u32 = 12;

pub struct AppState {
    pub store: Arc<SnapshotStore>,
    pub classifier: Classifier,
    pub scale: ColorScale,
    pub period: Duration,
}

pub enum ApiError {
    NotReady,
    Render(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::NotReady => (
                StatusCode::SERVICE_UNAVAILABLE,
                "no snapshot has been published yet".to_string(),
            ),
            ApiError::Render(e) => (StatusCode::INTERNAL_SERVER_ERROR, e),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

#[derive(Deserialize)]
pub struct NearestParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    status: RefreshStatus,
    stale: bool,
    period_secs: u64,
}

pub fn build_router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/map", get(map_handler))
        .route("/api/map.geojson", get(geojson_handler))
        .route("/api/table", get(table_handler))
        .route("/api/status", get(status_handler))
        .route("/api/legend", get(legend_handler))
        .route("/api/colorbar.png", get(colorbar_handler))
        .route("/api/nearest", get(nearest_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, config.port))?;
    let app = build_router(state, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Serving dashboard on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn map_handler(State(state): State<Arc<AppState>>) -> Result<Json<MapDataset>, ApiError> {
    let published = state.store.current().ok_or(ApiError::NotReady)?;
    Ok(Json(published.snapshot.map.clone()))
}

async fn table_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TableDataset>, ApiError> {
    let published = state.store.current().ok_or(ApiError::NotReady)?;
    Ok(Json(published.snapshot.table.clone()))
}

async fn geojson_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let published = state.store.current().ok_or(ApiError::NotReady)?;
    Ok(Json(to_feature_collection(&published.snapshot.map)))
}

fn to_feature_collection(map: &MapDataset) -> FeatureCollection {
    let features = map
        .points
        .iter()
        .map(|p| {
            let mut props = JsonObject::new();
            props.insert("capacity".to_string(), p.capacity.into());
            props.insert("label".to_string(), p.label.clone().into());
            props.insert("color".to_string(), p.color.clone().into());
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![p.lon, p.lat]))),
                id: None,
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let status = state.store.status();
    let stale = status.is_stale(Utc::now(), state.period);
    Json(StatusResponse {
        status,
        stale,
        period_secs: state.period.as_secs(),
    })
}

async fn legend_handler(State(state): State<Arc<AppState>>) -> Json<Vec<LegendEntry>> {
    Json(legend(&state.classifier))
}

async fn colorbar_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let png = colorbar_png(&state.scale, COLORBAR_WIDTH, COLORBAR_HEIGHT).map_err(|e| {
        error!("Failed to render colorbar: {e}");
        ApiError::Render(e.to_string())
    })?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

async fn nearest_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearestParams>,
) -> Json<Option<NearestZone>> {
    let nearest = state
        .store
        .current()
        .and_then(|p| p.zones.nearest(&p.snapshot, params.lat, params.lon));
    Json(nearest)
}
