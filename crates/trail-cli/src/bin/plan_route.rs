//! Compute the route of a scenario file and print its legs.
//!
//! Usage:
//!   cargo run -p trail-cli --bin plan_route -- --scenario valley.json --format text

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use trail_cli::{
    init_tracing, load_scenario, render_route_text, resolve_config, resolve_stops, OutputFormat,
};
use trail_core::Router;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan a multi-stop route over a scenario map")]
struct Args {
    /// Scenario JSON with markers, terrain and a route
    #[arg(long)]
    scenario: PathBuf,

    /// Routing config JSON; overrides the scenario's own config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated marker ids; overrides the scenario route
    #[arg(long)]
    stops: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Log graph building and per-leg results to stderr
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let scenario = load_scenario(&args.scenario)?;
    let config = resolve_config(&scenario, args.config.as_deref())?;
    let stops = resolve_stops(&scenario, args.stops.as_deref())?;

    tracing::debug!(stops = stops.len(), features = scenario.terrain.features.len(), "planning route");
    let router = Router::with_data(config, scenario.markers, scenario.terrain);
    let result = router.compute_route(&stops).await?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print!("{}", render_route_text(&result)),
    }
    Ok(())
}
