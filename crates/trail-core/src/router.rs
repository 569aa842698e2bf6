//! Route orchestration over a cached routing graph.
//!
//! A [`Router`] owns the marker list, the terrain, the routing config and the
//! lazily built graph. Mutators drop the cached graph; the next computation
//! rebuilds it. Only one route computation runs at a time.

use crate::config::RoutingConfig;
use crate::error::{Result, RoutingError};
use crate::graph::{build_graph, NodeId, RoutingGraph, SegmentKind};
use crate::models::{FeatureCollection, Marker};
use crate::naturalize::naturalize;
use crate::pathfinding::{compute_path_cost, find_path};
use crate::terrain::TerrainCostModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Where the router is in a route computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RouterState {
    Idle,
    BuildingGraph,
    ComputingLeg { index: usize, total: usize },
    Done,
    Cancelled,
}

/// Coarse status for UI binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Empty,
    Calculating,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    /// `[lat, lng]` pairs, i.e. `[y, x]` in map units.
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub from: String,
    pub to: String,
    pub distance_km: f64,
    pub segments: Vec<RouteSegment>,
    pub path: Vec<NodeId>,
    pub unreachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl RouteLeg {
    fn unreachable(from: &str, to: &str, diagnostic: String) -> Self {
        tracing::warn!(from, to, %diagnostic, "route leg unreachable");
        Self {
            from: from.to_string(),
            to: to.to_string(),
            distance_km: 0.0,
            segments: Vec::new(),
            path: Vec::new(),
            unreachable: true,
            diagnostic: Some(diagnostic),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelEstimate {
    pub profile: String,
    pub days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub legs: Vec<RouteLeg>,
    pub total_distance_km: f64,
    pub reachable_legs: usize,
    pub unreachable_legs: usize,
    pub travel_times: Vec<TravelEstimate>,
    pub computed_at: DateTime<Utc>,
}

impl RouteResult {
    fn from_legs(legs: Vec<RouteLeg>, config: &RoutingConfig) -> Self {
        let total_distance_km: f64 = legs
            .iter()
            .filter(|leg| !leg.unreachable)
            .map(|leg| leg.distance_km)
            .sum();
        let unreachable_legs = legs.iter().filter(|leg| leg.unreachable).count();
        let travel_times = config
            .travel_profiles
            .iter()
            .filter_map(|profile| {
                profile.days_for(total_distance_km).map(|days| TravelEstimate {
                    profile: profile.name.clone(),
                    days,
                })
            })
            .collect();

        Self {
            reachable_legs: legs.len() - unreachable_legs,
            unreachable_legs,
            total_distance_km,
            travel_times,
            legs,
            computed_at: Utc::now(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T: Clone>(lock: &RwLock<T>) -> T {
    lock.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Clears the in-flight flag when a computation ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Routing session: inputs, graph cache and computation lifecycle.
#[derive(Debug)]
pub struct Router {
    config: RwLock<RoutingConfig>,
    markers: RwLock<Vec<Marker>>,
    terrain: RwLock<FeatureCollection>,
    graph: Mutex<Option<Arc<RoutingGraph>>>,
    state: Mutex<RouterState>,
    last_result: Mutex<Option<RouteResult>>,
    in_flight: AtomicBool,
    cancel_requested: AtomicBool,
    waypoint_counter: AtomicU64,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RoutingConfig::default())
    }
}

impl Router {
    pub fn new(config: RoutingConfig) -> Self {
        Self::with_data(config, Vec::new(), FeatureCollection::default())
    }

    pub fn with_data(config: RoutingConfig, markers: Vec<Marker>, terrain: FeatureCollection) -> Self {
        Self {
            config: RwLock::new(config),
            markers: RwLock::new(markers),
            terrain: RwLock::new(terrain),
            graph: Mutex::new(None),
            state: Mutex::new(RouterState::Idle),
            last_result: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            waypoint_counter: AtomicU64::new(0),
        }
    }

    // ========== INPUTS ==========

    pub fn config(&self) -> RoutingConfig {
        read(&self.config)
    }

    pub fn set_config(&self, config: RoutingConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        self.invalidate_graph();
    }

    pub fn markers(&self) -> Vec<Marker> {
        read(&self.markers)
    }

    pub fn set_markers(&self, markers: Vec<Marker>) {
        *self.markers.write().unwrap_or_else(PoisonError::into_inner) = markers;
        self.invalidate_graph();
    }

    /// Insert or replace a marker by id. Returns true when it replaced one.
    pub fn upsert_marker(&self, marker: Marker) -> bool {
        let replaced = {
            let mut markers = self.markers.write().unwrap_or_else(PoisonError::into_inner);
            match markers.iter_mut().find(|m| m.id == marker.id) {
                Some(existing) => {
                    *existing = marker;
                    true
                }
                None => {
                    markers.push(marker);
                    false
                }
            }
        };
        self.invalidate_graph();
        replaced
    }

    pub fn remove_marker(&self, id: &str) -> Option<Marker> {
        let removed = {
            let mut markers = self.markers.write().unwrap_or_else(PoisonError::into_inner);
            let pos = markers.iter().position(|m| m.id == id)?;
            markers.remove(pos)
        };
        self.invalidate_graph();
        Some(removed)
    }

    /// Create a transient waypoint marker with a fresh `waypoint_<n>` id.
    pub fn add_waypoint(&self, x: f64, y: f64) -> Marker {
        let n = self.waypoint_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let marker = Marker::waypoint(format!("waypoint_{}", n), x, y);
        self.upsert_marker(marker.clone());
        marker
    }

    /// Remove every waypoint marker. Returns how many were removed.
    pub fn clear_waypoints(&self) -> usize {
        let removed = {
            let mut markers = self.markers.write().unwrap_or_else(PoisonError::into_inner);
            let before = markers.len();
            markers.retain(|m| !m.is_waypoint);
            before - markers.len()
        };
        if removed > 0 {
            self.invalidate_graph();
        }
        removed
    }

    pub fn terrain(&self) -> FeatureCollection {
        read(&self.terrain)
    }

    pub fn set_terrain(&self, terrain: FeatureCollection) {
        *self.terrain.write().unwrap_or_else(PoisonError::into_inner) = terrain;
        self.invalidate_graph();
    }

    // ========== GRAPH CACHE ==========

    /// Drop the cached graph. The next route computation rebuilds it.
    pub fn invalidate_graph(&self) {
        if lock(&self.graph).take().is_some() {
            tracing::debug!("routing graph invalidated");
        }
    }

    pub fn has_cached_graph(&self) -> bool {
        lock(&self.graph).is_some()
    }

    /// Cached graph, built on first use after an invalidation.
    pub fn graph(&self) -> Arc<RoutingGraph> {
        let mut cache = lock(&self.graph);
        if let Some(graph) = cache.as_ref() {
            return Arc::clone(graph);
        }
        let config = self.config();
        let markers = self.markers();
        let terrain = self.terrain();
        let graph = Arc::new(build_graph(&markers, &terrain, &config));
        *cache = Some(Arc::clone(&graph));
        graph
    }

    // ========== COMPUTATION ==========

    pub fn state(&self) -> RouterState {
        *lock(&self.state)
    }

    pub fn status(&self) -> RouteStatus {
        match self.state() {
            RouterState::BuildingGraph | RouterState::ComputingLeg { .. } => {
                RouteStatus::Calculating
            }
            RouterState::Done if lock(&self.last_result).as_ref().is_some_and(|r| !r.legs.is_empty()) => {
                RouteStatus::Done
            }
            _ => RouteStatus::Empty,
        }
    }

    pub fn last_result(&self) -> Option<RouteResult> {
        lock(&self.last_result).clone()
    }

    pub fn is_computing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stop the running computation before its next leg and clear the route.
    pub fn cancel(&self) {
        if self.is_computing() {
            self.cancel_requested.store(true, Ordering::SeqCst);
        } else {
            self.set_state(RouterState::Cancelled);
        }
        *lock(&self.last_result) = None;
    }

    fn set_state(&self, state: RouterState) {
        *lock(&self.state) = state;
    }

    /// Compute every leg of an itinerary of marker ids, in order.
    ///
    /// A stop list of `n` ids yields `n - 1` legs. Broken legs are reported
    /// as unreachable and do not abort the route. Fails with
    /// `ComputationInFlight` if another computation is running and with
    /// `Cancelled` if [`Router::cancel`] was called before the last leg.
    pub async fn compute_route(&self, stops: &[String]) -> Result<RouteResult> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("route computation already in flight; request rejected");
            return Err(RoutingError::ComputationInFlight);
        }
        let _in_flight = InFlight(&self.in_flight);
        self.cancel_requested.store(false, Ordering::SeqCst);

        if let Some(blank) = stops.iter().position(|id| id.trim().is_empty()) {
            self.set_state(RouterState::Idle);
            return Err(RoutingError::InvalidRoute(format!("stop {} has an empty marker id", blank)));
        }

        let config = self.config();
        if !self.has_cached_graph() {
            self.set_state(RouterState::BuildingGraph);
        }
        let graph = self.graph();
        let terrain = TerrainCostModel::new(&self.terrain(), &config.terrain_costs);
        tokio::task::yield_now().await;

        let total = stops.len().saturating_sub(1);
        let mut legs = Vec::with_capacity(total);
        for (index, pair) in stops.windows(2).enumerate() {
            if self.cancel_requested.swap(false, Ordering::SeqCst) {
                tracing::info!(completed = index, total, "route computation cancelled");
                self.set_state(RouterState::Cancelled);
                *lock(&self.last_result) = None;
                return Err(RoutingError::Cancelled);
            }
            self.set_state(RouterState::ComputingLeg { index, total });

            let leg = compute_leg(&graph, &terrain, &config, &pair[0], &pair[1]);
            tracing::debug!(
                index,
                from = %leg.from,
                to = %leg.to,
                distance_km = leg.distance_km,
                unreachable = leg.unreachable,
                "leg computed"
            );
            legs.push(leg);
            tokio::task::yield_now().await;
        }

        // A cancel that lands during the last leg still wins. The check runs
        // under the result lock so `cancel` either sees the published result
        // and clears it, or is seen here.
        let mut published = lock(&self.last_result);
        if self.cancel_requested.swap(false, Ordering::SeqCst) {
            tracing::info!(completed = total, total, "route computation cancelled before publishing");
            *published = None;
            drop(published);
            self.set_state(RouterState::Cancelled);
            return Err(RoutingError::Cancelled);
        }

        let result = RouteResult::from_legs(legs, &config);
        tracing::info!(
            legs = result.legs.len(),
            unreachable = result.unreachable_legs,
            total_distance_km = result.total_distance_km,
            "route computed"
        );
        *published = Some(result.clone());
        drop(published);
        self.set_state(RouterState::Done);
        Ok(result)
    }
}

/// Path, distance and segments for a single leg between two marker ids.
pub fn compute_leg(
    graph: &RoutingGraph,
    terrain: &TerrainCostModel,
    config: &RoutingConfig,
    from: &str,
    to: &str,
) -> RouteLeg {
    let start = NodeId::marker(from);
    let end = NodeId::marker(to);

    let path = match find_path(graph, &start, &end, config.algorithm, config.heuristic) {
        Ok(Some(path)) => path,
        Ok(None) => {
            return RouteLeg::unreachable(from, to, format!("no path between {} and {}", from, to));
        }
        Err(err) => return RouteLeg::unreachable(from, to, err.to_string()),
    };

    let distance_km = match compute_path_cost(graph, &path, config.km_per_pixel) {
        Ok(km) => km,
        Err(err) => return RouteLeg::unreachable(from, to, err.to_string()),
    };

    RouteLeg {
        from: from.to_string(),
        to: to.to_string(),
        distance_km,
        segments: classify_segments(graph, terrain, config, &path),
        path,
        unreachable: false,
        diagnostic: None,
    }
}

/// Split a path into runs of the same segment kind, as `[lat, lng]` points.
fn classify_segments(
    graph: &RoutingGraph,
    terrain: &TerrainCostModel,
    config: &RoutingConfig,
    path: &[NodeId],
) -> Vec<RouteSegment> {
    let mut runs: Vec<(SegmentKind, Vec<[f64; 2]>)> = Vec::new();
    for pair in path.windows(2) {
        let (Some(edge), Some(a), Some(b)) = (
            graph.edge(&pair[0], &pair[1]),
            graph.node(&pair[0]),
            graph.node(&pair[1]),
        ) else {
            continue;
        };
        let kind = edge.kind.segment_kind();
        match runs.last_mut() {
            Some((last_kind, points)) if *last_kind == kind => points.push(b.position()),
            _ => runs.push((kind, vec![a.position(), b.position()])),
        }
    }

    runs.into_iter()
        .map(|(kind, points)| {
            let points = if config.naturalize && kind != SegmentKind::Road {
                naturalize(&points, terrain, &config.naturalize_options)
            } else {
                points
            };
            RouteSegment {
                kind,
                points: points.into_iter().map(|[x, y]| [y, x]).collect(),
            }
        })
        .collect()
}
