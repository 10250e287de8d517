//! Record-store interface consumed by the graph engine.
//!
//! Persistence lives outside this crate. Everything the engine needs from
//! a store goes through [`NodeStore`]; [`MemoryStore`] is the in-memory
//! implementation used by the CLI and the tests.

pub mod memory;

pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::Result;
use crate::graph::{ConstellationId, PlanetId, Position, RegionId, Richness, SystemId};

/// A system as stored, including its raw gate list.
///
/// Gate lists may be one-sided; consumers symmetrize them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: SystemId,
    pub name: String,
    pub security: f64,
    #[serde(default)]
    pub position: Position,
    pub constellation: ConstellationId,
    pub region: RegionId,
    #[serde(default)]
    pub is_entry: bool,
    #[serde(default)]
    pub gates: Vec<SystemId>,
}

/// A gate target together with the cluster it lives in, so a search can
/// schedule the target's cluster without another lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NeighborRef {
    pub id: SystemId,
    pub constellation: ConstellationId,
}

/// Adjacency of one system as returned by a batched cluster fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjacencyRecord {
    pub id: SystemId,
    pub constellation: ConstellationId,
    pub neighbors: Vec<NeighborRef>,
}

/// One resource output on one planet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub planet_id: PlanetId,
    pub planet_name: String,
    pub system_id: SystemId,
    pub resource_name: String,
    pub output: f64,
    #[serde(default)]
    pub richness: Option<Richness>,
}

/// Read interface over the system/gate/resource record store.
///
/// Implementations own their retry policy; the engine never retries.
pub trait NodeStore {
    /// Every system with its gate list, for whole-graph analysis.
    fn fetch_all_nodes_with_adjacency(&self) -> Result<Vec<NodeRecord>>;

    /// Look up a system by exact name.
    fn fetch_node(&self, name: &str) -> Result<Option<NodeRecord>>;

    fn fetch_node_by_id(&self, id: SystemId) -> Result<Option<NodeRecord>>;

    /// Direct gate neighbors of one system.
    fn fetch_neighbors(&self, id: SystemId) -> Result<BTreeSet<SystemId>>;

    /// Adjacency of every system in the given constellations, in one call.
    fn fetch_clusters(&self, clusters: &[ConstellationId]) -> Result<Vec<AdjacencyRecord>>;

    /// Resources on planets of the given systems, optionally restricted to
    /// one resource type (canonical name).
    fn fetch_resources(
        &self,
        systems: &[SystemId],
        resource_type: Option<&str>,
    ) -> Result<Vec<ResourceRecord>>;

    /// Canonical name of a resource type, matched case-insensitively.
    fn resolve_resource_type(&self, name: &str) -> Result<Option<String>>;
}
