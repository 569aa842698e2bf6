use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::{api, state::AppState};
use trail_core::{
    FeatureCollection, Marker, Router as RouteSession, RoutingConfig, TerrainFeature, TerrainKind,
};

fn road_state() -> Arc<AppState> {
    let terrain = FeatureCollection::new(vec![TerrainFeature::line(
        TerrainKind::Road,
        &[[400.0, 400.0], [500.0, 400.0]],
    )]);
    let markers = vec![
        Marker::new("inn", 400.0, 400.0),
        Marker::new("smithy", 500.0, 400.0),
    ];
    Arc::new(AppState::new(RouteSession::with_data(
        RoutingConfig::default(),
        markers,
        terrain,
    )))
}

fn setup_app() -> (axum::Router, Arc<AppState>) {
    let state = road_state();
    (api::routes().with_state(state.clone()), state)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn health_echoes_or_generates_request_id() {
    let (app, _state) = setup_app();

    let res = app.clone().oneshot(empty_request("GET", "/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let generated = res.headers().get("x-request-id").expect("request id");
    assert!(!generated.to_str().unwrap().is_empty());

    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "abc-123")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.headers().get("x-request-id").unwrap(), "abc-123");
}

#[tokio::test]
async fn compute_route_over_road() {
    let (app, _state) = setup_app();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/routes/compute",
            json!({ "stops": ["inn", "smithy"] }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert!((body["total_distance_km"].as_f64().unwrap() - 50.0).abs() < 1e-9);
    assert_eq!(body["legs"][0]["unreachable"], false);
    assert_eq!(body["travel_times"].as_array().unwrap().len(), 3);

    let res = app.oneshot(empty_request("GET", "/v1/routes/status")).await.unwrap();
    let status = read_json(res).await;
    assert_eq!(status["status"], "done");
    assert_eq!(status["state"]["state"], "done");
    assert_eq!(status["result"]["legs"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_stop_is_an_unreachable_leg() {
    let (app, _state) = setup_app();
    let res = app
        .oneshot(json_request(
            "POST",
            "/v1/routes/compute",
            json!({ "stops": ["inn", "nowhere"] }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["unreachable_legs"], 1);
    assert_eq!(body["legs"][0]["unreachable"], true);
    assert!(body["legs"][0]["diagnostic"]
        .as_str()
        .unwrap()
        .contains("marker_nowhere"));
}

#[tokio::test]
async fn blank_stop_is_rejected() {
    let (app, _state) = setup_app();
    let res = app
        .oneshot(json_request(
            "POST",
            "/v1/routes/compute",
            json!({ "stops": ["inn", ""] }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = read_json(res).await;
    assert_eq!(body["error"]["code"], "invalid_route");
}

#[tokio::test]
async fn marker_crud_invalidates_graph() {
    let (app, state) = setup_app();
    state.router().graph();
    assert!(state.router().has_cached_graph());

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/markers",
            json!({ "id": "well", "x": 450.0, "y": 450.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    assert!(!state.router().has_cached_graph());

    let res = app
        .clone()
        .oneshot(empty_request("DELETE", "/v1/markers/well"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app
        .clone()
        .oneshot(empty_request("DELETE", "/v1/markers/well"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(res).await["error"]["code"], "not_found");

    let res = app
        .oneshot(json_request("POST", "/v1/markers", json!({ "id": " ", "x": 1.0, "y": 1.0 })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn waypoints_are_created_and_cleared() {
    let (app, state) = setup_app();

    let res = app
        .clone()
        .oneshot(json_request("POST", "/v1/waypoints", json!({ "x": 10.0, "y": 20.0 })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let waypoint = read_json(res).await;
    assert_eq!(waypoint["id"], "waypoint_1");
    assert_eq!(waypoint["is_waypoint"], true);
    assert_eq!(state.router().markers().len(), 3);

    let res = app.oneshot(empty_request("DELETE", "/v1/waypoints")).await.unwrap();
    assert_eq!(read_json(res).await["removed"], 1);
    assert_eq!(state.router().markers().len(), 2);
}

#[tokio::test]
async fn graph_stats_report_layers() {
    let (app, _state) = setup_app();

    let res = app
        .clone()
        .oneshot(empty_request("POST", "/v1/graph/invalidate"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = app.oneshot(empty_request("GET", "/v1/graph/stats")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let stats = read_json(res).await;
    assert_eq!(stats["cached"], false);
    assert_eq!(stats["road_nodes"], 2);
    assert_eq!(stats["marker_nodes"], 2);
    // 2048 / 50 rounds up to 41 cells per side.
    assert_eq!(stats["terrain_nodes"], 41 * 41);
    assert_eq!(stats["edges"]["road"], 2);
    assert!(stats["disconnected_markers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn terrain_replacement_round_trips() {
    let (app, state) = setup_app();
    let terrain = json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0], [0.0, 0.0]]]
            },
            "properties": { "kind": "forest" }
        }]
    });
    let res = app
        .clone()
        .oneshot(json_request("PUT", "/v1/terrain", terrain))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(state.terrain().features.len(), 1);

    let res = app.oneshot(empty_request("GET", "/v1/terrain")).await.unwrap();
    let body = read_json(res).await;
    assert_eq!(body["features"][0]["properties"]["kind"], "forest");
}

#[tokio::test]
async fn naturalize_keeps_endpoints() {
    let (app, _state) = setup_app();
    let points: Vec<[f64; 2]> = (0..12)
        .map(|i| [i as f64 * 50.0, if i % 2 == 0 { 0.0 } else { 50.0 }])
        .collect();

    let res = app
        .oneshot(json_request("POST", "/v1/naturalize", json!({ "points": points })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    let out = body["points"].as_array().unwrap();
    assert_eq!(out.first().unwrap(), &json!([0.0, 0.0]));
    assert_eq!(out.last().unwrap(), &json!([550.0, 50.0]));
}

#[tokio::test]
async fn naturalize_rejects_unbounded_smoothing() {
    let (app, _state) = setup_app();
    let points = json!([[0.0, 0.0], [100.0, 0.0], [100.0, 100.0]]);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/naturalize",
            json!({
                "points": points,
                "options": { "smoothing": { "method": "chaikin", "iterations": 22, "ratio": 0.25 } }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(res).await["error"]["code"], "bad_request");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/naturalize",
            json!({
                "points": points,
                "options": { "smoothing": { "method": "bezier", "samples": 100000 } }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(json_request(
            "POST",
            "/v1/naturalize",
            json!({
                "points": points,
                "options": { "smoothing": { "method": "chaikin", "iterations": 8 } }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn cancel_without_computation_clears_route() {
    let (app, state) = setup_app();
    state
        .router()
        .compute_route(&["inn".to_string(), "smithy".to_string()])
        .await
        .unwrap();

    let res = app
        .clone()
        .oneshot(empty_request("POST", "/v1/routes/cancel"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);

    let res = app.oneshot(empty_request("GET", "/v1/routes/status")).await.unwrap();
    let status = read_json(res).await;
    assert_eq!(status["status"], "empty");
    assert_eq!(status["state"]["state"], "cancelled");
    assert!(status.get("result").is_none());
}
