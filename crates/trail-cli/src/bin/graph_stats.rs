//! Build the routing graph of a scenario file and print its layer counts.
//!
//! Usage:
//!   cargo run -p trail-cli --bin graph_stats -- --scenario valley.json

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use trail_cli::{init_tracing, load_scenario, render_stats_text, resolve_config, OutputFormat};
use trail_core::build_graph;

#[derive(Parser, Debug)]
#[command(author, version, about = "Print routing graph statistics for a scenario")]
struct Args {
    #[arg(long)]
    scenario: PathBuf,

    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let scenario = load_scenario(&args.scenario)?;
    let config = resolve_config(&scenario, args.config.as_deref())?;
    let graph = build_graph(&scenario.markers, &scenario.terrain, &config);
    let stats = graph.stats();

    match args.format {
        OutputFormat::Json => {
            let report = json!({
                "node_count": graph.node_count(),
                "edge_count": graph.edge_count(),
                "stats": stats,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            print!("{}", render_stats_text(&stats, graph.node_count(), graph.edge_count()))
        }
    }
    Ok(())
}
