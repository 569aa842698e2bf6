pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod naturalize;
pub mod pathfinding;
pub mod router;
pub mod scenario;
pub mod spatial;
pub mod terrain;

pub use config::{
    HeuristicMode, MapBounds, PathAlgorithm, RoutingConfig, TerrainCosts, TravelProfile,
};
pub use error::{Result, RoutingError};
pub use graph::{
    build_graph, EdgeKind, GraphBuilder, GraphEdge, GraphNode, GraphStats, NodeId, NodeKind,
    RoutingGraph, SegmentKind,
};
pub use models::{
    FeatureCollection, FeatureProperties, Geometry, Marker, MarkerSource, TerrainFeature,
    TerrainKind, TerrainSource,
};
pub use naturalize::{naturalize, NaturalizeOptions, Smoothing};
pub use pathfinding::{compute_path_cost, find_path};
pub use router::{
    compute_leg, RouteLeg, RouteResult, RouteSegment, RouteStatus, Router, RouterState,
    TravelEstimate,
};
pub use scenario::Scenario;
pub use terrain::{TerrainCostModel, TerrainSampler};
