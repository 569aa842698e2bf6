//! Multilayer routing graph: roads, a uniform terrain grid, and markers.
//!
//! The graph is a derived cache. It is rebuilt from scratch from the current
//! markers and terrain whenever either changes; there is no incremental update.
//! Node ids are composite keys (`road_<feature>_<vertex>`, `terrain_<gx>_<gy>`,
//! `marker_<id>`) so the same physical feature maps to the same id across builds.

use crate::config::RoutingConfig;
use crate::models::{Geometry, MarkerSource, TerrainFeature, TerrainKind, TerrainSource};
use crate::spatial::distance;
use crate::terrain::TerrainCostModel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Radius, in cells, at which neighbouring grid cells still receive a marker bridge.
const NEIGHBOR_BRIDGE_CELLS: f64 = 1.5;
/// Largest radius, in cells, of the emergency terrain search.
const EMERGENCY_MAX_CELLS: f64 = 3.0;
const EMERGENCY_STEP_CELLS: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn road(feature_index: usize, vertex_index: usize) -> Self {
        Self(format!("road_{}_{}", feature_index, vertex_index))
    }

    pub fn terrain(grid_x: usize, grid_y: usize) -> Self {
        Self(format!("terrain_{}_{}", grid_x, grid_y))
    }

    pub fn marker(marker_id: &str) -> Self {
        Self(format!("marker_{}", marker_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    RoadNode,
    TerrainNode,
    Marker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub x: f64,
    pub y: f64,
    pub kind: NodeKind,
    /// Terrain cost sampled at the node, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_hint: Option<f64>,
}

impl GraphNode {
    pub fn position(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Road,
    RoadIntersection,
    Terrain,
    Bridge,
    BridgeBackup,
    BridgeEmergency,
}

/// Visual class of a stretch of route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Road,
    Terrain,
    Bridge,
}

impl EdgeKind {
    pub fn segment_kind(self) -> SegmentKind {
        match self {
            EdgeKind::Road | EdgeKind::RoadIntersection => SegmentKind::Road,
            EdgeKind::Terrain => SegmentKind::Terrain,
            EdgeKind::Bridge | EdgeKind::BridgeBackup | EdgeKind::BridgeEmergency => {
                SegmentKind::Bridge
            }
        }
    }
}

/// Directed edge. `cost` is the terrain multiplier and is always finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub cost: f64,
    pub distance: f64,
    pub kind: EdgeKind,
}

impl GraphEdge {
    /// Traversal weight used by pathfinding: distance times terrain multiplier.
    pub fn weight(&self) -> f64 {
        self.distance * self.cost
    }
}

/// Node and edge counts per layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub road_nodes: usize,
    pub terrain_nodes: usize,
    pub marker_nodes: usize,
    pub edges: BTreeMap<EdgeKind, usize>,
    /// Markers with no edges at all.
    pub disconnected_markers: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct RoutingGraph {
    nodes: Vec<GraphNode>,
    index: HashMap<NodeId, usize>,
    edges: Vec<GraphEdge>,
    /// `(from, to)` node indices to edge index.
    edge_map: HashMap<(usize, usize), usize>,
    /// Outgoing `(to, edge)` indices per node.
    adjacency: Vec<Vec<(usize, usize)>>,
    min_positive_cost: Option<f64>,
}

impl RoutingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index. An id that already exists keeps its
    /// original node and index.
    pub fn add_node(&mut self, node: GraphNode) -> usize {
        if let Some(&existing) = self.index.get(&node.id) {
            return existing;
        }
        let idx = self.nodes.len();
        self.index.insert(node.id.clone(), idx);
        self.nodes.push(node);
        self.adjacency.push(Vec::new());
        idx
    }

    /// Insert a directed edge between two node indices.
    ///
    /// Infinite, NaN or negative costs are never inserted. When the pair
    /// already has an edge the cheaper one is kept. Returns whether the
    /// edge is present afterwards with the given parameters.
    pub fn add_edge(
        &mut self,
        from: usize,
        to: usize,
        cost: f64,
        distance: f64,
        kind: EdgeKind,
    ) -> bool {
        if from >= self.nodes.len() || to >= self.nodes.len() || from == to {
            return false;
        }
        if !cost.is_finite() || cost < 0.0 || !distance.is_finite() {
            return false;
        }

        let edge = GraphEdge {
            from: self.nodes[from].id.clone(),
            to: self.nodes[to].id.clone(),
            cost,
            distance,
            kind,
        };

        if let Some(&existing) = self.edge_map.get(&(from, to)) {
            if edge.weight() >= self.edges[existing].weight() {
                return false;
            }
            self.edges[existing] = edge;
        } else {
            let edge_idx = self.edges.len();
            self.edges.push(edge);
            self.edge_map.insert((from, to), edge_idx);
            self.adjacency[from].push((to, edge_idx));
        }

        if cost > 0.0 && self.min_positive_cost.map_or(true, |min| cost < min) {
            self.min_positive_cost = Some(cost);
        }
        true
    }

    /// Insert the edge in both directions.
    pub fn add_bidirectional(
        &mut self,
        a: usize,
        b: usize,
        cost: f64,
        distance: f64,
        kind: EdgeKind,
    ) -> bool {
        let forward = self.add_edge(a, b, cost, distance, kind);
        let backward = self.add_edge(b, a, cost, distance, kind);
        forward || backward
    }

    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn node_at(&self, idx: usize) -> Option<&GraphNode> {
        self.nodes.get(idx)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edge map lookup by node ids.
    pub fn edge(&self, from: &NodeId, to: &NodeId) -> Option<&GraphEdge> {
        let from = self.node_index(from)?;
        let to = self.node_index(to)?;
        self.edge_between(from, to)
    }

    pub fn edge_between(&self, from: usize, to: usize) -> Option<&GraphEdge> {
        self.edge_map.get(&(from, to)).map(|&idx| &self.edges[idx])
    }

    /// Outgoing edges of a node as `(neighbor index, edge)`.
    pub fn outgoing(&self, idx: usize) -> impl Iterator<Item = (usize, &GraphEdge)> + '_ {
        self.adjacency
            .get(idx)
            .into_iter()
            .flatten()
            .map(move |&(to, edge_idx)| (to, &self.edges[edge_idx]))
    }

    pub fn degree(&self, idx: usize) -> usize {
        self.adjacency.get(idx).map_or(0, Vec::len)
    }

    /// Smallest non-zero cost multiplier on any edge.
    pub fn min_positive_cost(&self) -> Option<f64> {
        self.min_positive_cost
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats::default();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node.kind {
                NodeKind::RoadNode => stats.road_nodes += 1,
                NodeKind::TerrainNode => stats.terrain_nodes += 1,
                NodeKind::Marker => {
                    stats.marker_nodes += 1;
                    if self.degree(idx) == 0 {
                        stats.disconnected_markers.push(node.id.clone());
                    }
                }
            }
        }
        for edge in &self.edges {
            *stats.edges.entry(edge.kind).or_default() += 1;
        }
        stats
    }
}

/// Shape of the terrain grid laid over the map bounds.
#[derive(Debug, Clone, Copy)]
struct GridLayout {
    min_x: f64,
    min_y: f64,
    cell: f64,
    cols: usize,
    rows: usize,
    /// Node index of cell (0, 0); cells are stored row-major after it.
    base: usize,
}

impl GridLayout {
    fn center(&self, gx: usize, gy: usize) -> [f64; 2] {
        [
            self.min_x + (gx as f64 + 0.5) * self.cell,
            self.min_y + (gy as f64 + 0.5) * self.cell,
        ]
    }

    fn node_index(&self, gx: usize, gy: usize) -> usize {
        self.base + gy * self.cols + gx
    }

    /// Cell containing the point, which is the cell with the nearest centre.
    fn cell_of(&self, x: f64, y: f64) -> (i64, i64) {
        (
            ((x - self.min_x) / self.cell).floor() as i64,
            ((y - self.min_y) / self.cell).floor() as i64,
        )
    }

    fn in_range(&self, gx: i64, gy: i64) -> Option<(usize, usize)> {
        if gx < 0 || gy < 0 || gx as usize >= self.cols || gy as usize >= self.rows {
            return None;
        }
        Some((gx as usize, gy as usize))
    }

    fn len(&self) -> usize {
        self.cols * self.rows
    }
}

/// Builds a fresh [`RoutingGraph`] snapshot from markers and terrain.
pub struct GraphBuilder<'a> {
    config: &'a RoutingConfig,
    features: &'a [TerrainFeature],
    terrain: TerrainCostModel,
    graph: RoutingGraph,
    road_nodes: Vec<usize>,
    grid: Option<GridLayout>,
}

impl<'a> GraphBuilder<'a> {
    /// The cost model and the road layer both come from `terrain`.
    pub fn new<T>(terrain: &'a T, config: &'a RoutingConfig) -> Self
    where
        T: TerrainSource + ?Sized,
    {
        Self {
            config,
            features: terrain.terrain_features(),
            terrain: TerrainCostModel::new(terrain, &config.terrain_costs),
            graph: RoutingGraph::new(),
            road_nodes: Vec::new(),
            grid: None,
        }
    }

    pub fn build<M>(mut self, markers: &M) -> RoutingGraph
    where
        M: MarkerSource + ?Sized,
    {
        self.add_road_layer();
        self.add_terrain_layer();
        self.add_marker_layer(markers);

        let stats = self.graph.stats();
        tracing::debug!(
            road_nodes = stats.road_nodes,
            terrain_nodes = stats.terrain_nodes,
            marker_nodes = stats.marker_nodes,
            edges = self.graph.edge_count(),
            disconnected = stats.disconnected_markers.len(),
            "routing graph built"
        );
        self.graph
    }

    fn add_road_layer(&mut self) {
        let road_cost = self.config.terrain_costs.road;
        let features = self.features;
        let mut junctions: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();

        for (feature_idx, feature) in features.iter().enumerate() {
            if feature.kind() != TerrainKind::Road {
                continue;
            }
            let Geometry::LineString(points) = &feature.geometry else {
                tracing::debug!(feature_idx, "road feature is not a LineString; skipped");
                continue;
            };
            if points.iter().any(|p| !p[0].is_finite() || !p[1].is_finite()) {
                tracing::warn!(feature_idx, "road feature has non-finite coordinates; skipped");
                continue;
            }

            let mut previous: Option<usize> = None;
            for (vertex_idx, point) in points.iter().enumerate() {
                let idx = self.graph.add_node(GraphNode {
                    id: NodeId::road(feature_idx, vertex_idx),
                    x: point[0],
                    y: point[1],
                    kind: NodeKind::RoadNode,
                    cost_hint: Some(road_cost),
                });
                self.road_nodes.push(idx);
                junctions
                    .entry((point[0].round() as i64, point[1].round() as i64))
                    .or_default()
                    .push(idx);

                if let Some(prev) = previous {
                    let dist = distance(self.position(prev), *point);
                    self.graph
                        .add_bidirectional(prev, idx, road_cost, dist, EdgeKind::Road);
                }
                previous = Some(idx);
            }
        }

        for members in junctions.values().filter(|members| members.len() > 1) {
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    let dist = distance(self.position(a), self.position(b));
                    self.graph
                        .add_bidirectional(a, b, 0.0, dist, EdgeKind::RoadIntersection);
                }
            }
        }
    }

    fn add_terrain_layer(&mut self) {
        let bounds = self.config.map_bounds;
        let cell = self.config.cell_size();
        let cols = (bounds.width() / cell).ceil() as usize;
        let rows = (bounds.height() / cell).ceil() as usize;
        if cols == 0 || rows == 0 {
            tracing::warn!(?bounds, "map bounds are empty; terrain grid not built");
            return;
        }

        let layout = GridLayout {
            min_x: bounds.min_x,
            min_y: bounds.min_y,
            cell,
            cols,
            rows,
            base: self.graph.node_count(),
        };

        let mut costs = Vec::with_capacity(layout.len());
        for gy in 0..rows {
            for gx in 0..cols {
                let [x, y] = layout.center(gx, gy);
                let cost = self.terrain.cost_at_point(x, y);
                costs.push(cost);
                self.graph.add_node(GraphNode {
                    id: NodeId::terrain(gx, gy),
                    x,
                    y,
                    kind: NodeKind::TerrainNode,
                    cost_hint: Some(cost),
                });
            }
        }

        for gy in 0..rows {
            for gx in 0..cols {
                let from = layout.node_index(gx, gy);
                let from_cost = costs[gy * cols + gx];
                for dy in -1i64..=1 {
                    for dx in -1i64..=1 {
                        if dx == 0 && dy == 0 {
                            continue;
                        }
                        let Some((nx, ny)) = layout.in_range(gx as i64 + dx, gy as i64 + dy)
                        else {
                            continue;
                        };
                        let to = layout.node_index(nx, ny);
                        let cost = (from_cost + costs[ny * cols + nx]) / 2.0;
                        let dist = distance(layout.center(gx, gy), layout.center(nx, ny));
                        self.graph.add_edge(from, to, cost, dist, EdgeKind::Terrain);
                    }
                }
            }
        }

        self.grid = Some(layout);
    }

    fn add_marker_layer<M>(&mut self, markers: &M)
    where
        M: MarkerSource + ?Sized,
    {
        for marker in markers.markers() {
            if !marker.x.is_finite() || !marker.y.is_finite() {
                tracing::warn!(marker_id = %marker.id, "marker has non-finite coordinates; not routable");
                continue;
            }
            let id = NodeId::marker(&marker.id);
            if self.graph.contains(&id) {
                tracing::warn!(marker_id = %marker.id, "duplicate marker id; keeping the first");
                continue;
            }
            let idx = self.graph.add_node(GraphNode {
                id,
                x: marker.x,
                y: marker.y,
                kind: NodeKind::Marker,
                cost_hint: Some(self.terrain.cost_at_point(marker.x, marker.y)),
            });

            let road = self.bridge_to_road(idx);
            let terrain = self.bridge_to_terrain(idx);
            if !road && terrain == 0 {
                tracing::warn!(
                    marker_id = %marker.id,
                    x = marker.x,
                    y = marker.y,
                    "marker has no road or terrain connection"
                );
            }
        }
    }

    /// Connect a marker to its nearest road node within the configured distance.
    fn bridge_to_road(&mut self, marker_idx: usize) -> bool {
        let marker = self.position(marker_idx);
        let mut nearest: Option<(usize, f64)> = None;
        for &road_idx in &self.road_nodes {
            let dist = distance(marker, self.position(road_idx));
            if nearest.map_or(true, |(_, best)| dist < best) {
                nearest = Some((road_idx, dist));
            }
        }

        let Some((road_idx, dist)) = nearest else {
            return false;
        };
        if dist > self.config.road_connect_distance {
            return false;
        }
        let cost = self
            .terrain
            .cost_between_points(marker, self.position(road_idx));
        self.graph
            .add_bidirectional(marker_idx, road_idx, cost, dist, EdgeKind::Bridge)
    }

    /// Connect a marker to the terrain grid. Returns the number of cells attached.
    fn bridge_to_terrain(&mut self, marker_idx: usize) -> usize {
        let Some(layout) = self.grid else {
            return 0;
        };
        let marker = self.position(marker_idx);
        let (cx, cy) = layout.cell_of(marker[0], marker[1]);
        let reach = layout.cell * NEIGHBOR_BRIDGE_CELLS;

        let mut connected = 0;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                let Some((gx, gy)) = layout.in_range(cx + dx, cy + dy) else {
                    continue;
                };
                let center = layout.center(gx, gy);
                let dist = distance(marker, center);
                let nearest = dx == 0 && dy == 0;
                if !nearest && dist > reach {
                    continue;
                }
                let kind = if nearest {
                    EdgeKind::Bridge
                } else {
                    EdgeKind::BridgeBackup
                };
                let cost = self.terrain.cost_between_points(marker, center);
                if self.graph.add_bidirectional(
                    marker_idx,
                    layout.node_index(gx, gy),
                    cost,
                    dist,
                    kind,
                ) {
                    connected += 1;
                }
            }
        }

        if connected == 0 && self.bridge_emergency(marker_idx, layout) {
            connected = 1;
        }
        connected
    }

    /// Expanding-radius fallback over every terrain node.
    fn bridge_emergency(&mut self, marker_idx: usize, layout: GridLayout) -> bool {
        let marker = self.position(marker_idx);
        let mut radius = layout.cell * NEIGHBOR_BRIDGE_CELLS;
        while radius <= layout.cell * EMERGENCY_MAX_CELLS + f64::EPSILON {
            for offset in 0..layout.len() {
                let node_idx = layout.base + offset;
                let center = self.position(node_idx);
                let dist = distance(marker, center);
                if dist > radius {
                    continue;
                }
                let cost = self.terrain.cost_between_points(marker, center);
                if self.graph.add_bidirectional(
                    marker_idx,
                    node_idx,
                    cost,
                    dist,
                    EdgeKind::BridgeEmergency,
                ) {
                    tracing::debug!(
                        marker = %self.graph.nodes[marker_idx].id,
                        terrain = %self.graph.nodes[node_idx].id,
                        radius,
                        "emergency terrain connection"
                    );
                    return true;
                }
            }
            radius += layout.cell * EMERGENCY_STEP_CELLS;
        }
        false
    }

    fn position(&self, idx: usize) -> [f64; 2] {
        self.graph.nodes[idx].position()
    }
}

/// Build the routing graph for the given markers and terrain.
pub fn build_graph<M, T>(markers: &M, terrain: &T, config: &RoutingConfig) -> RoutingGraph
where
    M: MarkerSource + ?Sized,
    T: TerrainSource + ?Sized,
{
    GraphBuilder::new(terrain, config).build(markers)
}
