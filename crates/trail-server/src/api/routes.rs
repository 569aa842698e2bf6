//! REST API routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::error::ApiError;
use crate::api::request_id::{self, RequestId};
use crate::state::AppState;
use trail_core::naturalize::{MAX_BEZIER_SAMPLES, MAX_CHAIKIN_ITERATIONS, MAX_OUTPUT_POINTS};
use trail_core::{
    naturalize, FeatureCollection, GraphStats, Marker, NaturalizeOptions, RouteResult,
    RouteStatus, RouterState, Smoothing, TerrainCostModel,
};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        // Inputs
        .route("/v1/markers", get(list_markers).put(replace_markers).post(upsert_marker))
        .route("/v1/markers/:id", delete(delete_marker))
        .route("/v1/waypoints", post(add_waypoint).delete(clear_waypoints))
        .route("/v1/terrain", get(get_terrain).put(replace_terrain))
        // Graph cache
        .route("/v1/graph/invalidate", post(invalidate_graph))
        .route("/v1/graph/stats", get(graph_stats))
        // Routes
        .route("/v1/routes/compute", post(compute_route))
        .route("/v1/routes/cancel", post(cancel_route))
        .route("/v1/routes/status", get(route_status))
        .route("/v1/naturalize", post(naturalize_points))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::ensure_request_id))
}

// === Request/Response types ===

#[derive(Debug, Deserialize)]
pub struct WaypointRequest {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Serialize)]
pub struct ClearWaypointsResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct GraphStatsResponse {
    pub cached: bool,
    pub node_count: usize,
    pub edge_count: usize,
    #[serde(flatten)]
    pub stats: GraphStats,
}

#[derive(Debug, Default, Deserialize)]
pub struct ComputeRouteRequest {
    /// Marker ids in travel order. Falls back to the preloaded scenario route.
    #[serde(default)]
    pub stops: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct RouteStatusResponse {
    pub status: RouteStatus,
    pub state: RouterState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RouteResult>,
}

#[derive(Debug, Deserialize)]
pub struct NaturalizeRequest {
    pub points: Vec<[f64; 2]>,
    #[serde(default)]
    pub options: Option<NaturalizeOptions>,
}

#[derive(Debug, Serialize)]
pub struct NaturalizeResponse {
    pub points: Vec<[f64; 2]>,
}

// === Handlers ===

async fn list_markers(State(state): State<Arc<AppState>>) -> Json<Vec<Marker>> {
    Json(state.router().markers())
}

fn validate_marker(marker: &Marker) -> Result<(), ApiError> {
    if marker.id.trim().is_empty() {
        return Err(ApiError::BadRequest("marker id must not be empty".to_string()));
    }
    if !marker.x.is_finite() || !marker.y.is_finite() {
        return Err(ApiError::BadRequest(format!(
            "marker {} has non-finite coordinates",
            marker.id
        )));
    }
    Ok(())
}

async fn replace_markers(
    State(state): State<Arc<AppState>>,
    Json(markers): Json<Vec<Marker>>,
) -> Result<StatusCode, ApiError> {
    markers.iter().try_for_each(validate_marker)?;
    tracing::info!(count = markers.len(), "markers replaced");
    state.router().set_markers(markers);
    Ok(StatusCode::NO_CONTENT)
}

async fn upsert_marker(
    State(state): State<Arc<AppState>>,
    Json(marker): Json<Marker>,
) -> Result<(StatusCode, Json<Marker>), ApiError> {
    validate_marker(&marker)?;
    let replaced = state.router().upsert_marker(marker.clone());
    let status = if replaced {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(marker)))
}

async fn delete_marker(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    match state.router().remove_marker(&id) {
        Some(_) => {
            tracing::info!(marker_id = %id, "marker removed");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::NotFound(format!("marker {}", id))),
    }
}

async fn add_waypoint(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WaypointRequest>,
) -> Result<(StatusCode, Json<Marker>), ApiError> {
    if !req.x.is_finite() || !req.y.is_finite() {
        return Err(ApiError::BadRequest("waypoint coordinates must be finite".to_string()));
    }
    let waypoint = state.router().add_waypoint(req.x, req.y);
    Ok((StatusCode::CREATED, Json(waypoint)))
}

async fn clear_waypoints(State(state): State<Arc<AppState>>) -> Json<ClearWaypointsResponse> {
    Json(ClearWaypointsResponse {
        removed: state.router().clear_waypoints(),
    })
}

async fn get_terrain(State(state): State<Arc<AppState>>) -> Json<FeatureCollection> {
    Json(state.terrain())
}

async fn replace_terrain(
    State(state): State<Arc<AppState>>,
    Json(terrain): Json<FeatureCollection>,
) -> StatusCode {
    tracing::info!(features = terrain.features.len(), "terrain replaced");
    state.router().set_terrain(terrain);
    StatusCode::NO_CONTENT
}

async fn invalidate_graph(State(state): State<Arc<AppState>>) -> StatusCode {
    state.router().invalidate_graph();
    StatusCode::NO_CONTENT
}

async fn graph_stats(State(state): State<Arc<AppState>>) -> Json<GraphStatsResponse> {
    let cached = state.router().has_cached_graph();
    let graph = state.router().graph();
    Json(GraphStatsResponse {
        cached,
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        stats: graph.stats(),
    })
}

async fn compute_route(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    body: Option<Json<ComputeRouteRequest>>,
) -> Result<Json<RouteResult>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let stops = req
        .stops
        .unwrap_or_else(|| state.default_route().to_vec());
    tracing::info!(%request_id, stops = stops.len(), "route computation requested");
    let result = state.router().compute_route(&stops).await?;
    Ok(Json(result))
}

async fn cancel_route(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.router().cancel();
    StatusCode::ACCEPTED
}

async fn route_status(State(state): State<Arc<AppState>>) -> Json<RouteStatusResponse> {
    let router = state.router();
    Json(RouteStatusResponse {
        status: router.status(),
        state: router.state(),
        result: router.last_result(),
    })
}

fn validate_smoothing(smoothing: &Smoothing) -> Result<(), ApiError> {
    match *smoothing {
        Smoothing::Chaikin { iterations, .. } if iterations > MAX_CHAIKIN_ITERATIONS => {
            Err(ApiError::BadRequest(format!(
                "chaikin iterations must be at most {}",
                MAX_CHAIKIN_ITERATIONS
            )))
        }
        Smoothing::Bezier { samples, .. } if samples > MAX_BEZIER_SAMPLES => {
            Err(ApiError::BadRequest(format!(
                "bezier samples must be at most {}",
                MAX_BEZIER_SAMPLES
            )))
        }
        _ => Ok(()),
    }
}

async fn naturalize_points(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NaturalizeRequest>,
) -> Result<Json<NaturalizeResponse>, ApiError> {
    if req.points.iter().flatten().any(|c| !c.is_finite()) {
        return Err(ApiError::BadRequest("points must be finite".to_string()));
    }
    if req.points.len() > MAX_OUTPUT_POINTS {
        return Err(ApiError::BadRequest(format!(
            "at most {} points may be naturalized",
            MAX_OUTPUT_POINTS
        )));
    }
    let config = state.routing_config();
    let options = req.options.unwrap_or(config.naturalize_options);
    validate_smoothing(&options.smoothing)?;
    let sampler = TerrainCostModel::new(&state.terrain(), &config.terrain_costs);
    Ok(Json(NaturalizeResponse {
        points: naturalize(&req.points, &sampler, &options),
    }))
}
