//! Stargate graph module.
//!
//! Provides the system/gate data model, the petgraph-backed engine with
//! lookup and route search, and the builder that assembles it from store
//! records.

pub mod builder;
pub mod engine;
pub mod types;

pub use builder::{build_graph, GraphBuilder};
pub use engine::{EntryDistance, GraphStats, StarGraph};
pub use types::{
    security_band, ConstellationId, PlanetId, Position, RegionId, Richness, RouteLoad,
    SecurityBounds, SecurityClass, Stargate, SystemId, SystemNode,
};
