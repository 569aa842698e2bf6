//! Trail CLI - offline tools for routing scenarios.
//!
//! Binaries:
//! - plan_route: compute a scenario's itinerary and print the legs
//! - graph_stats: build a scenario's routing graph and print layer counts

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::fmt::Write as _;
use std::path::Path;
use trail_core::{GraphStats, RouteResult, RoutingConfig, Scenario};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

/// Log to stderr so stdout stays machine-readable.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    Scenario::from_json(&json).with_context(|| format!("parsing scenario {}", path.display()))
}

/// Routing config for a run: an explicit file wins over the scenario's own config.
pub fn resolve_config(scenario: &Scenario, config_path: Option<&Path>) -> Result<RoutingConfig> {
    match config_path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading routing config {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("parsing routing config {}", path.display()))
        }
        None => Ok(scenario.resolved_config(&RoutingConfig::default())),
    }
}

/// Itinerary from a comma-separated `--stops` value, else the scenario route.
pub fn resolve_stops(scenario: &Scenario, stops: Option<&str>) -> Result<Vec<String>> {
    let stops: Vec<String> = match stops {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect(),
        None => scenario.route.clone(),
    };
    if stops.len() < 2 {
        bail!("a route needs at least two stops, got {}", stops.len());
    }
    Ok(stops)
}

pub fn render_route_text(result: &RouteResult) -> String {
    let mut out = String::new();
    for (i, leg) in result.legs.iter().enumerate() {
        if leg.unreachable {
            let _ = writeln!(
                out,
                "{:>2}. {} -> {}  UNREACHABLE ({})",
                i + 1,
                leg.from,
                leg.to,
                leg.diagnostic.as_deref().unwrap_or("no path")
            );
        } else {
            let _ = writeln!(
                out,
                "{:>2}. {} -> {}  {:.1} km  ({} segments, {} nodes)",
                i + 1,
                leg.from,
                leg.to,
                leg.distance_km,
                leg.segments.len(),
                leg.path.len()
            );
        }
    }
    let _ = writeln!(
        out,
        "Total: {:.1} km over {} of {} legs",
        result.total_distance_km,
        result.reachable_legs,
        result.legs.len()
    );
    for estimate in &result.travel_times {
        let _ = writeln!(out, "  {:<8} {:.1} days", estimate.profile, estimate.days);
    }
    out
}

pub fn render_stats_text(stats: &GraphStats, node_count: usize, edge_count: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Nodes: {}", node_count);
    let _ = writeln!(out, "  road     {}", stats.road_nodes);
    let _ = writeln!(out, "  terrain  {}", stats.terrain_nodes);
    let _ = writeln!(out, "  marker   {}", stats.marker_nodes);
    let _ = writeln!(out, "Edges: {}", edge_count);
    for (kind, count) in &stats.edges {
        let _ = writeln!(out, "  {:<18} {}", format!("{:?}", kind), count);
    }
    if !stats.disconnected_markers.is_empty() {
        let ids: Vec<&str> = stats.disconnected_markers.iter().map(|id| id.as_str()).collect();
        let _ = writeln!(out, "Disconnected markers: {}", ids.join(", "));
    }
    out
}
