//! The core graph engine for stargraph.
//!
//! Uses petgraph to store the stargate network and provides lookup,
//! route search, and traversal helpers on top of it. The graph is
//! read-only once the builder hands it out.

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info};

use super::types::*;
use crate::error::{Result, StarGraphError};

/// The stargate graph: systems as nodes, gates as undirected edges, plus
/// indexes for lookup by id and name.
///
/// Node indexes are dense and stable for the lifetime of the graph, so
/// per-run analysis state can live in plain vectors indexed by them.
#[derive(Debug, Clone)]
pub struct StarGraph {
    graph: UnGraph<SystemNode, Stargate>,
    /// Index: system id -> node index.
    id_index: HashMap<SystemId, NodeIndex>,
    /// Index: exact system name -> node index.
    name_index: HashMap<String, NodeIndex>,
}

impl StarGraph {
    pub(crate) fn new() -> Self {
        Self {
            graph: UnGraph::default(),
            id_index: HashMap::new(),
            name_index: HashMap::new(),
        }
    }

    /// Access the underlying petgraph.
    pub fn inner_graph(&self) -> &UnGraph<SystemNode, Stargate> {
        &self.graph
    }

    // ─── Construction (builder only) ────────────────────────────

    pub(crate) fn add_system(&mut self, node: SystemNode) -> NodeIndex {
        let id = node.id;
        let name = node.name.clone();
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        self.name_index.insert(name, idx);
        idx
    }

    /// Connect two systems. A second gate between the same pair is a no-op.
    pub(crate) fn add_gate(&mut self, a: NodeIndex, b: NodeIndex) -> EdgeIndex {
        self.graph.update_edge(a, b, Stargate)
    }

    // ─── Lookup ─────────────────────────────────────────────────

    pub fn system_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn gate_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn system(&self, idx: NodeIndex) -> &SystemNode {
        &self.graph[idx]
    }

    pub fn index_of(&self, id: SystemId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn get(&self, id: SystemId) -> Option<&SystemNode> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    /// Find a system by name: exact match first, then case-insensitive.
    pub fn find_by_name(&self, name: &str) -> Option<NodeIndex> {
        if let Some(&idx) = self.name_index.get(name) {
            return Some(idx);
        }
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].name.eq_ignore_ascii_case(name))
    }

    /// Like [`find_by_name`](Self::find_by_name) but unknown names are an error.
    pub fn resolve(&self, name: &str) -> Result<NodeIndex> {
        self.find_by_name(name)
            .ok_or_else(|| StarGraphError::system_not_found(name))
    }

    /// All systems in ascending id order.
    pub fn systems(&self) -> impl Iterator<Item = (NodeIndex, &SystemNode)> {
        self.graph.node_indices().map(move |idx| (idx, &self.graph[idx]))
    }

    /// Gate neighbors of a system, in ascending system id order.
    pub fn neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors(idx).collect();
        out.sort_by_key(|&n| self.graph[n].id);
        out.dedup();
        out
    }

    /// Entry systems in ascending id order.
    pub fn entries(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph[idx].is_entry)
            .collect()
    }

    pub fn gate_between(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex> {
        self.graph.find_edge(a, b)
    }

    /// Search systems by name. Exact > prefix > substring, then by name.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&SystemNode> {
        let query_lower = query.to_lowercase();
        if query_lower.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(u8, &SystemNode)> = self
            .graph
            .node_weights()
            .filter_map(|node| {
                let name_lower = node.name.to_lowercase();
                let score = if name_lower == query_lower {
                    0
                } else if name_lower.starts_with(&query_lower) {
                    1
                } else if name_lower.contains(&query_lower) {
                    2
                } else {
                    return None;
                };
                Some((score, node))
            })
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| sa.cmp(sb).then_with(|| a.name.cmp(&b.name)));
        scored.into_iter().take(limit).map(|(_, node)| node).collect()
    }

    // ─── Traversal ──────────────────────────────────────────────

    /// Shortest gate route from `start` to `end` (both names) where every
    /// system entered after `start` lies inside `bounds`.
    ///
    /// Returns the system ids along the route, endpoints included.
    pub fn find_route(&self, start: &str, end: &str, bounds: SecurityBounds) -> Result<Vec<SystemId>> {
        let start_idx = self.resolve(start)?;
        let end_idx = self.resolve(end)?;

        let mut came_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut visited: HashSet<NodeIndex> = HashSet::from([start_idx]);
        let mut queue: VecDeque<NodeIndex> = VecDeque::from([start_idx]);

        while let Some(idx) = queue.pop_front() {
            if idx == end_idx {
                break;
            }
            for next in self.neighbors(idx) {
                if visited.contains(&next) || !bounds.allows(self.graph[next].security) {
                    continue;
                }
                visited.insert(next);
                came_from.insert(next, idx);
                queue.push_back(next);
            }
        }

        if !visited.contains(&end_idx) {
            return Err(StarGraphError::NoRoute {
                from: start.to_string(),
                to: end.to_string(),
            });
        }

        let mut route = vec![self.graph[end_idx].id];
        let mut cursor = end_idx;
        while let Some(&prev) = came_from.get(&cursor) {
            route.push(self.graph[prev].id);
            cursor = prev;
        }
        route.reverse();

        debug!(from = start, to = end, jumps = route.len() - 1, "route found");
        Ok(route)
    }

    /// Positive-security systems reachable from `start` by travelling only
    /// through systems with security <= 0, with their hop distance.
    ///
    /// The walk stops after `max_distance` jumps, so nothing further than
    /// `max_distance` is reported. This is one layer tighter than the map
    /// bot's lowsec-entry walk, which expanded a final extra layer.
    /// Sorted by distance, then id.
    pub fn nearest_entries(&self, start: &str, max_distance: u32) -> Result<Vec<EntryDistance>> {
        let start_idx = self.resolve(start)?;

        let mut visited: HashSet<NodeIndex> = HashSet::from([start_idx]);
        let mut frontier = vec![start_idx];
        let mut found = Vec::new();
        let mut distance = 0;

        while !frontier.is_empty() && distance < max_distance {
            distance += 1;
            let mut next_frontier = Vec::new();
            for &idx in &frontier {
                for next in self.neighbors(idx) {
                    if !visited.insert(next) {
                        continue;
                    }
                    let node = &self.graph[next];
                    if node.security <= 0.0 {
                        next_frontier.push(next);
                    } else {
                        found.push(EntryDistance {
                            system: node.id,
                            name: node.name.clone(),
                            distance,
                        });
                    }
                }
            }
            frontier = next_frontier;
        }

        found.sort_by(|a, b| a.distance.cmp(&b.distance).then(a.system.cmp(&b.system)));
        Ok(found)
    }

    // ─── Stats ──────────────────────────────────────────────────

    pub fn stats(&self) -> GraphStats {
        let mut entry_count = 0;
        let mut nullsec_count = 0;
        let mut constellations = HashSet::new();

        for node in self.graph.node_weights() {
            if node.is_entry {
                entry_count += 1;
            }
            if node.security_class() == SecurityClass::Null {
                nullsec_count += 1;
            }
            constellations.insert(node.constellation);
        }

        GraphStats {
            system_count: self.graph.node_count(),
            gate_count: self.graph.edge_count(),
            entry_count,
            nullsec_count,
            constellation_count: constellations.len(),
        }
    }

    pub(crate) fn log_summary(&self) {
        let stats = self.stats();
        info!(
            systems = stats.system_count,
            gates = stats.gate_count,
            entries = stats.entry_count,
            "graph ready"
        );
    }
}

// ─── Query Result Types ─────────────────────────────────────────

/// A positive-security system found by [`StarGraph::nearest_entries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDistance {
    pub system: SystemId,
    pub name: String,
    pub distance: u32,
}

/// Statistics about the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub system_count: usize,
    pub gate_count: usize,
    pub entry_count: usize,
    pub nullsec_count: usize,
    pub constellation_count: usize,
}
