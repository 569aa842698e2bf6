//! Terrain cost lookup from tagged polygons.
//!
//! Impassable areas short-circuit to an infinite cost. Among slow areas the
//! first matching feature in collection order wins; costs are never blended.

use crate::config::TerrainCosts;
use crate::models::{TerrainKind, TerrainSource};
use crate::spatial::{point_in_polygon, segment_crosses_ring};

/// Samples a terrain cost multiplier at a map position.
pub trait TerrainSampler {
    fn cost_at(&self, x: f64, y: f64) -> f64;
}

impl<F> TerrainSampler for F
where
    F: Fn(f64, f64) -> f64,
{
    fn cost_at(&self, x: f64, y: f64) -> f64 {
        self(x, y)
    }
}

#[derive(Debug, Clone)]
struct CostArea {
    ring: Vec<[f64; 2]>,
    cost: f64,
}

/// Point and segment cost queries over a snapshot of the terrain features.
#[derive(Debug, Clone)]
pub struct TerrainCostModel {
    impassable: Vec<CostArea>,
    slow: Vec<CostArea>,
    normal_cost: f64,
}

impl TerrainCostModel {
    pub fn new<T>(terrain: &T, costs: &TerrainCosts) -> Self
    where
        T: TerrainSource + ?Sized,
    {
        let mut impassable = Vec::new();
        let mut slow = Vec::new();

        for feature in terrain.terrain_features() {
            let kind = feature.kind();
            if !(kind.is_impassable() || kind.is_slow()) {
                continue;
            }
            let cost = costs.for_kind(kind);
            for ring in feature.geometry.outer_rings() {
                if ring.len() < 3 {
                    tracing::debug!(?kind, vertices = ring.len(), "skipping degenerate terrain ring");
                    continue;
                }
                let area = CostArea {
                    ring: ring.to_vec(),
                    cost,
                };
                if kind.is_impassable() {
                    impassable.push(area);
                } else {
                    slow.push(area);
                }
            }
        }

        Self {
            impassable,
            slow,
            normal_cost: costs.for_kind(TerrainKind::Other),
        }
    }

    /// Cost multiplier at a single point.
    pub fn cost_at_point(&self, x: f64, y: f64) -> f64 {
        if self
            .impassable
            .iter()
            .any(|area| point_in_polygon(x, y, &area.ring))
        {
            return f64::INFINITY;
        }
        self.slow
            .iter()
            .find(|area| point_in_polygon(x, y, &area.ring))
            .map(|area| area.cost)
            .unwrap_or(self.normal_cost)
    }

    /// Cost multiplier for travelling in a straight line from `a` to `b`.
    ///
    /// A segment touching an area (crossing its boundary or starting/ending
    /// inside it) takes that area's cost.
    pub fn cost_between_points(&self, a: [f64; 2], b: [f64; 2]) -> f64 {
        if self
            .impassable
            .iter()
            .any(|area| Self::touches(area, a, b))
        {
            return f64::INFINITY;
        }
        self.slow
            .iter()
            .find(|area| Self::touches(area, a, b))
            .map(|area| area.cost)
            .unwrap_or(self.normal_cost)
    }

    fn touches(area: &CostArea, a: [f64; 2], b: [f64; 2]) -> bool {
        segment_crosses_ring(a, b, &area.ring)
            || point_in_polygon(a[0], a[1], &area.ring)
            || point_in_polygon(b[0], b[1], &area.ring)
    }
}

impl TerrainSampler for TerrainCostModel {
    fn cost_at(&self, x: f64, y: f64) -> f64 {
        self.cost_at_point(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureCollection, TerrainFeature};

    fn square(kind: TerrainKind, x0: f64, y0: f64, size: f64) -> TerrainFeature {
        TerrainFeature::polygon(
            kind,
            &[[x0, y0], [x0 + size, y0], [x0 + size, y0 + size], [x0, y0 + size]],
        )
    }

    fn model(features: Vec<TerrainFeature>) -> TerrainCostModel {
        TerrainCostModel::new(&FeatureCollection::new(features), &TerrainCosts::default())
    }

    #[test]
    fn point_costs_follow_area_kind() {
        let terrain = model(vec![
            square(TerrainKind::Forest, 0.0, 0.0, 100.0),
            square(TerrainKind::Unpassable, 200.0, 0.0, 100.0),
            square(TerrainKind::Difficult, 400.0, 0.0, 100.0),
        ]);

        assert_eq!(terrain.cost_at_point(50.0, 50.0), 3.0);
        assert!(terrain.cost_at_point(250.0, 50.0).is_infinite());
        assert_eq!(terrain.cost_at_point(450.0, 50.0), 3.0);
        assert_eq!(terrain.cost_at_point(150.0, 50.0), 1.0);
    }

    #[test]
    fn unpassable_wins_over_overlapping_forest() {
        let terrain = model(vec![
            square(TerrainKind::Forest, 0.0, 0.0, 100.0),
            square(TerrainKind::Blocked, 25.0, 25.0, 50.0),
        ]);
        assert!(terrain.cost_at_point(50.0, 50.0).is_infinite());
        assert_eq!(terrain.cost_at_point(10.0, 10.0), 3.0);
    }

    #[test]
    fn first_slow_area_wins_without_blending() {
        let mut costs = TerrainCosts::default();
        costs.forest = 2.0;
        let collection = FeatureCollection::new(vec![
            square(TerrainKind::Difficult, 0.0, 0.0, 100.0),
            square(TerrainKind::Forest, 0.0, 0.0, 100.0),
        ]);
        let terrain = TerrainCostModel::new(&collection, &costs);
        assert_eq!(terrain.cost_at_point(50.0, 50.0), 3.0);
    }

    #[test]
    fn segment_costs() {
        let terrain = model(vec![
            square(TerrainKind::Unpassable, 100.0, 0.0, 50.0),
            square(TerrainKind::Forest, 0.0, 200.0, 50.0),
        ]);

        // Crosses the wall.
        assert!(terrain.cost_between_points([50.0, 25.0], [200.0, 25.0]).is_infinite());
        // Passes below it.
        assert_eq!(terrain.cost_between_points([50.0, 100.0], [200.0, 100.0]), 1.0);
        // Crosses the forest boundary.
        assert_eq!(terrain.cost_between_points([25.0, 150.0], [25.0, 300.0]), 3.0);
        // Entirely inside the forest.
        assert_eq!(terrain.cost_between_points([10.0, 210.0], [40.0, 240.0]), 3.0);
        // Starts inside the wall.
        assert!(terrain.cost_between_points([125.0, 25.0], [130.0, 30.0]).is_infinite());
    }

    #[test]
    fn roads_and_other_kinds_do_not_shape_area_costs() {
        let terrain = model(vec![
            TerrainFeature::line(TerrainKind::Road, &[[0.0, 0.0], [100.0, 0.0]]),
            square(TerrainKind::Other, 0.0, 0.0, 100.0),
        ]);
        assert_eq!(terrain.cost_at_point(50.0, 50.0), 1.0);
    }

    #[test]
    fn closures_are_samplers() {
        let sampler = |x: f64, _y: f64| if x > 0.0 { 2.0 } else { 1.0 };
        assert_eq!(sampler.cost_at(1.0, 0.0), 2.0);
        let empty = TerrainCostModel::new(&FeatureCollection::default(), &TerrainCosts::default());
        assert_eq!(empty.cost_at(5.0, 5.0), 1.0);
        assert_eq!(empty.cost_between_points([0.0, 0.0], [500.0, 500.0]), 1.0);
    }
}
