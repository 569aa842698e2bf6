//! Routing configuration: map scale, terrain costs, grid layout and travel profiles.

use crate::models::TerrainKind;
use crate::naturalize::NaturalizeOptions;
use serde::{Deserialize, Serialize};

/// Cost multipliers per terrain class. Impassable kinds are always infinite
/// and have no entry here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainCosts {
    pub road: f64,
    pub normal: f64,
    pub difficult: f64,
    pub forest: f64,
}

impl Default for TerrainCosts {
    fn default() -> Self {
        Self {
            road: 0.5,
            normal: 1.0,
            difficult: 3.0,
            forest: 3.0,
        }
    }
}

impl TerrainCosts {
    /// Multiplier for an area of the given kind.
    pub fn for_kind(&self, kind: TerrainKind) -> f64 {
        match kind {
            TerrainKind::Road => self.road,
            TerrainKind::Difficult => self.difficult,
            TerrainKind::Forest => self.forest,
            TerrainKind::Unpassable | TerrainKind::Blocked => f64::INFINITY,
            TerrainKind::Other => self.normal,
        }
    }
}

/// Rectangle covered by the terrain grid, in map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for MapBounds {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 2048.0,
            max_y: 2048.0,
        }
    }
}

impl MapBounds {
    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathAlgorithm {
    #[default]
    Astar,
    Dijkstra,
}

/// How the A* heuristic treats terrain multipliers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicMode {
    /// Euclidean distance scaled by the cheapest positive edge multiplier in the graph.
    #[default]
    Scaled,
    /// Plain Euclidean distance. Overestimates whenever roads are cheaper than 1.0.
    Euclidean,
}

/// A way of travelling, used only to turn distance into travel time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TravelProfile {
    pub name: String,
    pub speed_km_per_day: f64,
    /// Extra multiplier the presentation layer may apply on rough terrain.
    #[serde(default = "default_terrain_penalty")]
    pub terrain_penalty: f64,
}

fn default_terrain_penalty() -> f64 {
    1.0
}

impl TravelProfile {
    pub fn new(name: impl Into<String>, speed_km_per_day: f64, terrain_penalty: f64) -> Self {
        Self {
            name: name.into(),
            speed_km_per_day,
            terrain_penalty,
        }
    }

    /// Days needed to cover `distance_km`. `None` for a non-positive speed.
    pub fn days_for(&self, distance_km: f64) -> Option<f64> {
        if self.speed_km_per_day > 0.0 && self.speed_km_per_day.is_finite() {
            Some(distance_km / self.speed_km_per_day)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Kilometres represented by one map unit.
    pub km_per_pixel: f64,
    pub terrain_costs: TerrainCosts,
    pub grid_cell_size: f64,
    pub map_bounds: MapBounds,
    /// Maximum distance between a marker and the road node it bridges to.
    pub road_connect_distance: f64,
    pub algorithm: PathAlgorithm,
    pub heuristic: HeuristicMode,
    /// Naturalize non-road segments of computed legs.
    pub naturalize: bool,
    pub naturalize_options: NaturalizeOptions,
    pub travel_profiles: Vec<TravelProfile>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            km_per_pixel: 1.0,
            terrain_costs: TerrainCosts::default(),
            grid_cell_size: 50.0,
            map_bounds: MapBounds::default(),
            road_connect_distance: 150.0,
            algorithm: PathAlgorithm::default(),
            heuristic: HeuristicMode::default(),
            naturalize: true,
            naturalize_options: NaturalizeOptions::default(),
            travel_profiles: vec![
                TravelProfile::new("walk", 30.0, 1.0),
                TravelProfile::new("wagon", 25.0, 1.5),
                TravelProfile::new("horse", 50.0, 1.2),
            ],
        }
    }
}

impl RoutingConfig {
    /// Grid cell size, never below one map unit.
    pub fn cell_size(&self) -> f64 {
        if self.grid_cell_size.is_finite() {
            self.grid_cell_size.max(1.0)
        } else {
            50.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn terrain_costs_by_kind() {
        let costs = TerrainCosts::default();
        assert_eq!(costs.for_kind(TerrainKind::Road), 0.5);
        assert_eq!(costs.for_kind(TerrainKind::Other), 1.0);
        assert_eq!(costs.for_kind(TerrainKind::Forest), 3.0);
        assert!(costs.for_kind(TerrainKind::Blocked).is_infinite());
    }

    #[test]
    fn deserializes_with_defaults_when_missing_fields() {
        let config: RoutingConfig =
            serde_json::from_value(json!({ "km_per_pixel": 0.25, "algorithm": "dijkstra" })).unwrap();
        assert_eq!(config.km_per_pixel, 0.25);
        assert_eq!(config.algorithm, PathAlgorithm::Dijkstra);
        assert_eq!(config.grid_cell_size, 50.0);
        assert_eq!(config.road_connect_distance, 150.0);
        assert_eq!(config.travel_profiles.len(), 3);
    }

    #[test]
    fn travel_profile_days() {
        let walk = TravelProfile::new("walk", 30.0, 1.0);
        assert_eq!(walk.days_for(60.0), Some(2.0));
        let broken = TravelProfile::new("cart", 0.0, 1.0);
        assert_eq!(broken.days_for(60.0), None);
    }

    #[test]
    fn cell_size_has_floor() {
        let config = RoutingConfig {
            grid_cell_size: 0.0,
            ..RoutingConfig::default()
        };
        assert_eq!(config.cell_size(), 1.0);
    }
}
