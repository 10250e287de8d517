//! # stargraph
//!
//! Structural queries over a static graph of star systems joined by
//! stargates.
//!
//! ## Key Features
//!
//! - **Entry flow**: distance from every nullsec system to the nearest
//!   entry system, and how many systems route through each system and gate
//! - **Bounded search**: radius-limited neighborhoods loaded lazily, one
//!   store call per BFS layer
//! - **Resource ranking**: best planets for a resource around an origin
//! - **Routing**: security-bounded shortest routes and nearest entries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stargraph::{build_graph, FlowAnalyzer, MemoryStore};
//! use std::path::Path;
//!
//! let store = MemoryStore::load(Path::new("universe.json"))?;
//! let graph = build_graph(&store)?;
//!
//! let analysis = FlowAnalyzer::new().analyze(&graph);
//! for row in analysis.rows(&graph) {
//!     println!("{} {:?} {}", row.name, row.distance_to_entry, row.flow_count);
//! }
//! # Ok::<(), stargraph::StarGraphError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod graph;
pub mod search;
pub mod store;

// Re-exports for convenience
pub use config::StarGraphConfig;
pub use error::{GraphBuildError, LookupKind, Result, StarGraphError};

// Graph re-exports
pub use graph::{
    build_graph, EntryDistance, GraphBuilder, GraphStats, RouteLoad, SecurityBounds,
    SecurityClass, StarGraph, SystemId, SystemNode,
};

// Analysis and search
pub use flow::{DistanceRecord, EdgeFlow, FlowAnalysis, FlowAnalyzer};
pub use search::{find_resources_near, BoundedSearchCache, ResourceHit, ResourceRanker};
pub use store::{MemoryStore, NodeStore};
