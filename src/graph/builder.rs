//! Graph builder: turns raw system records into a [`StarGraph`].
//!
//! Records are validated up front: a gate that points at an unknown system
//! fails the whole build, so a half-built graph never escapes. Input order
//! does not matter; systems are inserted by ascending id and gates are
//! normalized to unordered pairs before insertion.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, warn};

use super::engine::StarGraph;
use super::types::{SystemId, SystemNode};
use crate::error::{GraphBuildError, Result};
use crate::store::{NodeRecord, NodeStore};

/// Load every system from the store and build the full graph.
pub fn build_graph<S: NodeStore + ?Sized>(store: &S) -> Result<StarGraph> {
    GraphBuilder::new().build_from_store(store)
}

#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    border_entries: bool,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also flag every positive-security system that has a gate into
    /// negative security as an entry, on top of the stored flags.
    pub fn with_border_entries(mut self, enabled: bool) -> Self {
        self.border_entries = enabled;
        self
    }

    pub fn build_from_store<S: NodeStore + ?Sized>(&self, store: &S) -> Result<StarGraph> {
        let records = store.fetch_all_nodes_with_adjacency()?;
        Ok(self.build(records)?)
    }

    pub fn build(&self, mut records: Vec<NodeRecord>) -> std::result::Result<StarGraph, GraphBuildError> {
        debug!(systems = records.len(), "building stargate graph");
        records.sort_by_key(|r| r.id);

        // Phase 1: validate identities
        let mut names: HashSet<&str> = HashSet::with_capacity(records.len());
        for pair in records.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(GraphBuildError::DuplicateSystem(pair[0].id));
            }
        }
        for record in &records {
            if !names.insert(record.name.as_str()) {
                return Err(GraphBuildError::DuplicateName(record.name.clone()));
            }
        }

        // Phase 2: normalize gates into unordered pairs
        let known: HashSet<SystemId> = records.iter().map(|r| r.id).collect();
        let mut gates: BTreeSet<(SystemId, SystemId)> = BTreeSet::new();
        for record in &records {
            for &target in &record.gates {
                if !known.contains(&target) {
                    warn!(from = %record.id, to = %target, "dangling stargate");
                    return Err(GraphBuildError::DanglingGate {
                        from: record.id,
                        to: target,
                    });
                }
                if target == record.id {
                    continue;
                }
                gates.insert((record.id.min(target), record.id.max(target)));
            }
        }

        // Phase 3: border entries need both endpoints' security
        let mut border: HashSet<SystemId> = HashSet::new();
        if self.border_entries {
            let security = |id: SystemId| {
                records
                    .binary_search_by_key(&id, |r| r.id)
                    .map(|pos| records[pos].security)
                    .unwrap_or(0.0)
            };
            for &(a, b) in &gates {
                let (sa, sb) = (security(a), security(b));
                if sa > 0.0 && sb < 0.0 {
                    border.insert(a);
                } else if sb > 0.0 && sa < 0.0 {
                    border.insert(b);
                }
            }
            debug!(border = border.len(), "derived border entries");
        }

        // Phase 4: materialize
        let mut graph = StarGraph::new();
        for record in records {
            let is_entry = record.is_entry || border.contains(&record.id);
            graph.add_system(SystemNode {
                id: record.id,
                name: record.name,
                security: record.security,
                position: record.position,
                constellation: record.constellation,
                region: record.region,
                is_entry,
            });
        }
        for (a, b) in gates {
            if let (Some(ia), Some(ib)) = (graph.index_of(a), graph.index_of(b)) {
                graph.add_gate(ia, ib);
            }
        }

        graph.log_summary();
        Ok(graph)
    }
}
