//! Core data models shared by the routing components.

use serde::{Deserialize, Serialize};

/// A point of interest on the map, or a transient waypoint.
///
/// Coordinates are map units (pixels of the base map image).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default, alias = "isWaypoint")]
    pub is_waypoint: bool,
}

impl Marker {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            is_waypoint: false,
        }
    }

    pub fn waypoint(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            is_waypoint: true,
            ..Self::new(id, x, y)
        }
    }

    pub fn position(&self) -> [f64; 2] {
        [self.x, self.y]
    }
}

// ========== TERRAIN MODELS ==========

/// Terrain classification carried in a feature's properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerrainKind {
    Road,
    Difficult,
    Forest,
    Unpassable,
    Blocked,
    #[default]
    #[serde(other)]
    Other,
}

impl TerrainKind {
    /// Unpassable and blocked areas can never be crossed.
    pub fn is_impassable(self) -> bool {
        matches!(self, TerrainKind::Unpassable | TerrainKind::Blocked)
    }

    /// Area kinds that slow travel down without forbidding it.
    pub fn is_slow(self) -> bool {
        matches!(self, TerrainKind::Difficult | TerrainKind::Forest)
    }
}

/// GeoJSON geometry. Positions are `[x, y]` map coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
    /// Rings; the first ring is the outer boundary.
    Polygon(Vec<Vec<[f64; 2]>>),
    MultiPolygon(Vec<Vec<Vec<[f64; 2]>>>),
}

impl Geometry {
    /// Outer rings of every polygon in this geometry. Holes are ignored.
    pub fn outer_rings(&self) -> Vec<&[[f64; 2]]> {
        match self {
            Geometry::Polygon(rings) => rings.first().map(|r| r.as_slice()).into_iter().collect(),
            Geometry::MultiPolygon(polygons) => polygons
                .iter()
                .filter_map(|rings| rings.first().map(|r| r.as_slice()))
                .collect(),
            Geometry::Point(_) | Geometry::LineString(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    #[serde(default, alias = "terrainType", alias = "terrain_type")]
    pub kind: TerrainKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainFeature {
    pub geometry: Geometry,
    #[serde(default)]
    pub properties: FeatureProperties,
}

impl TerrainFeature {
    pub fn new(kind: TerrainKind, geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: FeatureProperties { kind, name: None },
        }
    }

    pub fn kind(&self) -> TerrainKind {
        self.properties.kind
    }

    /// Closed polygon from a list of corners.
    pub fn polygon(kind: TerrainKind, corners: &[[f64; 2]]) -> Self {
        let mut ring = corners.to_vec();
        if let (Some(first), Some(last)) = (corners.first(), corners.last()) {
            if first != last {
                ring.push(*first);
            }
        }
        Self::new(kind, Geometry::Polygon(vec![ring]))
    }

    pub fn line(kind: TerrainKind, points: &[[f64; 2]]) -> Self {
        Self::new(kind, Geometry::LineString(points.to_vec()))
    }
}

/// Terrain as edited in the map editor: a GeoJSON feature collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<TerrainFeature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<TerrainFeature>) -> Self {
        Self { features }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

// ========== SOURCES ==========

/// Anything that can hand the graph builder the current marker list.
pub trait MarkerSource {
    fn markers(&self) -> &[Marker];
}

/// Anything that can hand the routing core the current terrain features.
pub trait TerrainSource {
    fn terrain_features(&self) -> &[TerrainFeature];
}

impl MarkerSource for [Marker] {
    fn markers(&self) -> &[Marker] {
        self
    }
}

impl MarkerSource for Vec<Marker> {
    fn markers(&self) -> &[Marker] {
        self
    }
}

impl TerrainSource for [TerrainFeature] {
    fn terrain_features(&self) -> &[TerrainFeature] {
        self
    }
}

impl TerrainSource for Vec<TerrainFeature> {
    fn terrain_features(&self) -> &[TerrainFeature] {
        self
    }
}

impl TerrainSource for FeatureCollection {
    fn terrain_features(&self) -> &[TerrainFeature] {
        &self.features
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn feature_collection_parses_geojson() {
        let value = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [10.0, 0.0]] },
                    "properties": { "kind": "road", "name": "King's Way" }
                },
                {
                    "type": "Feature",
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [5.0, 0.0], [5.0, 5.0], [0.0, 0.0]]]
                    },
                    "properties": { "terrainType": "forest" }
                },
                {
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [1.0, 1.0] },
                    "properties": { "kind": "swamp" }
                }
            ]
        });

        let terrain: FeatureCollection = serde_json::from_value(value).unwrap();
        assert_eq!(terrain.features.len(), 3);
        assert_eq!(terrain.features[0].kind(), TerrainKind::Road);
        assert_eq!(terrain.features[0].properties.name.as_deref(), Some("King's Way"));
        assert_eq!(terrain.features[1].kind(), TerrainKind::Forest);
        assert_eq!(terrain.features[2].kind(), TerrainKind::Other);
    }

    #[test]
    fn missing_properties_default_to_other() {
        let value = json!({
            "geometry": { "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] }
        });
        let feature: TerrainFeature = serde_json::from_value(value).unwrap();
        assert_eq!(feature.kind(), TerrainKind::Other);
    }

    #[test]
    fn marker_accepts_camel_case_waypoint_flag() {
        let marker: Marker =
            serde_json::from_value(json!({ "id": "w1", "x": 3.0, "y": 4.0, "isWaypoint": true }))
                .unwrap();
        assert!(marker.is_waypoint);

        let plain: Marker = serde_json::from_value(json!({ "id": "m", "x": 0.0, "y": 0.0 })).unwrap();
        assert!(!plain.is_waypoint);
    }

    #[test]
    fn polygon_helper_closes_ring() {
        let feature = TerrainFeature::polygon(
            TerrainKind::Unpassable,
            &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
        );
        let rings = feature.geometry.outer_rings();
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].first(), rings[0].last());
        assert!(feature.kind().is_impassable());
    }
}
