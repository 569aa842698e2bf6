//! Server configuration from environment.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use trail_core::{RoutingConfig, Scenario};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// JSON `RoutingConfig` loaded at start.
    pub routing_config_path: Option<PathBuf>,
    /// Scenario preloaded into the router at start.
    pub scenario_path: Option<PathBuf>,
    /// Overrides `km_per_pixel` from every other source.
    pub km_per_pixel: Option<f64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            routing_config_path: None,
            scenario_path: None,
            km_per_pixel: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: env::var("TRAIL_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            routing_config_path: env::var_os("TRAIL_ROUTING_CONFIG").map(PathBuf::from),
            scenario_path: env::var_os("TRAIL_SCENARIO").map(PathBuf::from),
            km_per_pixel: env::var("TRAIL_KM_PER_PIXEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|km: &f64| km.is_finite() && *km > 0.0),
        }
    }

    pub fn load_scenario(&self) -> Result<Option<Scenario>> {
        let Some(path) = &self.scenario_path else {
            return Ok(None);
        };
        let json = read(path)?;
        let scenario = Scenario::from_json(&json)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        Ok(Some(scenario))
    }

    /// Routing config from the scenario, else the config file, else defaults,
    /// with the scale override applied last.
    pub fn routing_config(&self, scenario: Option<&Scenario>) -> Result<RoutingConfig> {
        let mut config = match (scenario.and_then(|s| s.config.clone()), &self.routing_config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => serde_json::from_str(&read(path)?)
                .with_context(|| format!("parsing routing config {}", path.display()))?,
            (None, None) => RoutingConfig::default(),
        };
        if let Some(km) = self.km_per_pixel {
            config.km_per_pixel = km;
        }
        Ok(config)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}
