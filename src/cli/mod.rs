//! CLI module for stargraph.
//!
//! Commands:
//! - Analysis: flow, stats
//! - Lookup: systems, route, entries
//! - Resources: search
//!
//! Every command reads a JSON dataset and answers with a JSON document.

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::config::StarGraphConfig;
use crate::error::Result;
use crate::flow::FlowAnalyzer;
use crate::graph::{GraphBuilder, SecurityBounds, StarGraph};
use crate::search::{find_resources_near, BoundedSearchCache, ResourceRanker};
use crate::store::MemoryStore;

#[derive(Parser, Debug)]
#[command(name = "stargraph")]
#[command(about = "Stargate graph analysis: entry flow, routes and resource search")]
pub struct Cli {
    /// Dataset file (JSON with `systems` and `resources`)
    #[arg(short, long)]
    pub dataset: PathBuf,

    /// Config file (TOML). Missing or invalid files fall back to defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    // ─── Analysis ─────────────────────────────────────────────────
    /// Distance and flow toward the nearest entry for every system
    Flow {
        /// Include the per-gate route table
        #[arg(long)]
        edges: bool,

        /// Only list systems that reach an entry
        #[arg(long)]
        reachable_only: bool,

        /// Analyse connected components in parallel
        #[arg(long)]
        parallel: bool,

        /// Also treat systems bordering nullsec as entries
        #[arg(long)]
        border_entries: bool,
    },

    /// Show graph statistics
    Stats,

    // ─── Lookup ───────────────────────────────────────────────────
    /// Find systems by name
    Systems {
        query: String,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Shortest route between two systems
    Route {
        from: String,
        to: String,

        /// Systems on the route must have security above this
        #[arg(long, allow_hyphen_values = true)]
        min_security: Option<f64>,

        /// Systems on the route must have security at most this
        #[arg(long, allow_hyphen_values = true)]
        max_security: Option<f64>,
    },

    /// Closest positive-security systems reachable through nullsec
    Entries {
        origin: String,

        /// Max jumps (default from config)
        #[arg(short, long)]
        max_distance: Option<u32>,
    },

    // ─── Resources ────────────────────────────────────────────────
    /// Best planets for a resource around a system
    Search {
        origin: String,

        /// Max jumps from the origin
        #[arg(short, long, default_value = "0")]
        distance: u32,

        /// Resource type (any when omitted)
        #[arg(short, long)]
        resource: Option<String>,

        /// Max results (default from config)
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

/// Execute a parsed command line and return its JSON answer.
pub fn run(cli: &Cli) -> Result<Value> {
    let config = cli
        .config
        .as_deref()
        .map(StarGraphConfig::load)
        .unwrap_or_default();
    let store = MemoryStore::load(&cli.dataset)?;

    match &cli.command {
        Commands::Flow {
            edges,
            reachable_only,
            parallel,
            border_entries,
        } => {
            let graph = build(&store, config.flow.border_entries || *border_entries)?;
            let analysis = FlowAnalyzer::from_config(&config.flow)
                .parallel(config.flow.parallel || *parallel)
                .analyze(&graph);

            let mut rows = analysis.rows(&graph);
            if *reachable_only {
                rows.retain(|r| r.distance_to_entry.is_some());
            }
            let mut out = json!({
                "reachable": analysis.reachable_count(),
                "systems": rows,
            });
            if *edges {
                out["gates"] = serde_json::to_value(analysis.edge_rows(&graph))?;
            }
            Ok(out)
        }

        Commands::Stats => {
            let graph = build(&store, config.flow.border_entries)?;
            Ok(serde_json::to_value(graph.stats())?)
        }

        Commands::Systems { query, limit } => {
            let graph = build(&store, config.flow.border_entries)?;
            Ok(serde_json::to_value(graph.search(query, *limit))?)
        }

        Commands::Route {
            from,
            to,
            min_security,
            max_security,
        } => {
            let graph = build(&store, config.flow.border_entries)?;
            let bounds = SecurityBounds {
                min: *min_security,
                max: *max_security,
            };
            let route: Vec<String> = graph
                .find_route(from, to, bounds)?
                .into_iter()
                .filter_map(|id| graph.get(id).map(|n| n.name.clone()))
                .collect();
            Ok(json!({
                "jumps": route.len().saturating_sub(1),
                "route": route,
            }))
        }

        Commands::Entries {
            origin,
            max_distance,
        } => {
            let graph = build(&store, config.flow.border_entries)?;
            let max_distance = max_distance.unwrap_or(config.search.max_distance);
            Ok(serde_json::to_value(graph.nearest_entries(origin, max_distance)?)?)
        }

        Commands::Search {
            origin,
            distance,
            resource,
            limit,
        } => {
            let mut cache = BoundedSearchCache::new(&store);
            let ranker = ResourceRanker::from_config(&store, &config);
            let hits = find_resources_near(
                &mut cache,
                &ranker,
                origin,
                *distance,
                resource.as_deref(),
                *limit,
            )?;
            Ok(serde_json::to_value(hits)?)
        }
    }
}

fn build(store: &MemoryStore, border_entries: bool) -> Result<StarGraph> {
    GraphBuilder::new()
        .with_border_entries(border_entries)
        .build_from_store(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DATASET: &str = r#"{
        "systems": [
            {"id": 1, "name": "Amamake", "security": 0.4, "constellation": 1, "region": 1, "is_entry": true, "gates": [2]},
            {"id": 2, "name": "Auner", "security": -0.1, "constellation": 1, "region": 1, "gates": [3]},
            {"id": 3, "name": "Ennur", "security": -0.3, "constellation": 2, "region": 1, "gates": []}
        ],
        "resources": [
            {"planet_id": 31, "planet_name": "Ennur I", "system_id": 3, "resource_name": "Heavy Water", "output": 7.5, "richness": "rich"},
            {"planet_id": 21, "planet_name": "Auner II", "system_id": 2, "resource_name": "Heavy Water", "output": 3.0}
        ]
    }"#;

    fn dataset() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", DATASET).unwrap();
        file
    }

    fn run_args(file: &tempfile::NamedTempFile, args: &[&str]) -> Value {
        let path = file.path().to_str().unwrap();
        let mut argv = vec!["stargraph", "--dataset", path];
        argv.extend_from_slice(args);
        run(&Cli::try_parse_from(argv).unwrap()).unwrap()
    }

    #[test]
    fn test_flow_command() {
        let file = dataset();
        let out = run_args(&file, &["flow", "--edges"]);
        assert_eq!(out["reachable"], 3);
        let systems = out["systems"].as_array().unwrap();
        let amamake = systems.iter().find(|s| s["name"] == "Amamake").unwrap();
        assert_eq!(amamake["flow_count"], 2);
        assert_eq!(out["gates"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_route_and_entries_commands() {
        let file = dataset();
        let out = run_args(&file, &["route", "Amamake", "Ennur", "--max-security", "0.5"]);
        assert_eq!(out["jumps"], 2);
        assert_eq!(out["route"][1], "Auner");

        let out = run_args(&file, &["entries", "Ennur"]);
        assert_eq!(out[0]["name"], "Amamake");
        assert_eq!(out[0]["distance"], 2);
    }

    #[test]
    fn test_search_command() {
        let file = dataset();
        let out = run_args(&file, &["search", "Auner", "-d", "1", "-r", "heavy water"]);
        let hits = out.as_array().unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0]["planet_name"], "Ennur I");
        assert_eq!(hits[0]["distance"], 1);
        assert_eq!(hits[0]["richness"], "rich");
    }

    #[test]
    fn test_unknown_system_is_an_error() {
        let file = dataset();
        let path = file.path().to_str().unwrap();
        let cli = Cli::try_parse_from(["stargraph", "--dataset", path, "entries", "Jita"]).unwrap();
        assert!(run(&cli).is_err());
    }
}
