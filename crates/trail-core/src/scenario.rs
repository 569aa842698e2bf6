//! Scenario files: a marker list, terrain and an itinerary in one JSON document.

use crate::config::RoutingConfig;
use crate::models::{FeatureCollection, Marker};
use crate::router::Router;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub terrain: FeatureCollection,
    /// Marker ids in travel order.
    #[serde(default)]
    pub route: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RoutingConfig>,
}

impl Scenario {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// The scenario's own config, or `fallback` when it carries none.
    pub fn resolved_config(&self, fallback: &RoutingConfig) -> RoutingConfig {
        self.config.clone().unwrap_or_else(|| fallback.clone())
    }

    /// Router seeded with this scenario's markers and terrain.
    pub fn router(&self, fallback: &RoutingConfig) -> Router {
        Router::with_data(
            self.resolved_config(fallback),
            self.markers.clone(),
            self.terrain.clone(),
        )
    }
}
