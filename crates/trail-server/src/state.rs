//! Shared server state.

use crate::config::Config;
use anyhow::Result;
use std::sync::Arc;
use trail_core::{FeatureCollection, Router as RouteSession, RoutingConfig};

pub struct AppState {
    router: Arc<RouteSession>,
    /// Itinerary used when a compute request names no stops.
    default_route: Vec<String>,
}

impl AppState {
    pub fn new(router: RouteSession) -> Self {
        Self {
            router: Arc::new(router),
            default_route: Vec::new(),
        }
    }

    /// Build the state from the environment config, preloading a scenario if one is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let scenario = config.load_scenario()?;
        let routing = config.routing_config(scenario.as_ref())?;

        let Some(scenario) = scenario else {
            return Ok(Self::new(RouteSession::new(routing)));
        };
        tracing::info!(
            markers = scenario.markers.len(),
            features = scenario.terrain.features.len(),
            stops = scenario.route.len(),
            "scenario preloaded"
        );
        Ok(Self {
            router: Arc::new(RouteSession::with_data(
                routing,
                scenario.markers,
                scenario.terrain,
            )),
            default_route: scenario.route,
        })
    }

    pub fn router(&self) -> &RouteSession {
        &self.router
    }

    pub fn default_route(&self) -> &[String] {
        &self.default_route
    }

    pub fn routing_config(&self) -> RoutingConfig {
        self.router.config()
    }

    pub fn terrain(&self) -> FeatureCollection {
        self.router.terrain()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(RouteSession::default())
    }
}
