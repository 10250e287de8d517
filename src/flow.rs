//! Entry-flow analysis: distance to the nearest entry system and how much
//! traffic funnels through every system and gate.
//!
//! Two passes over the analysis universe (nullsec systems plus entries):
//!
//! 1. a multi-source BFS seeded with every entry, recording for each system
//!    its hop distance and the neighbor it was first reached from;
//! 2. a reverse walk from the leaves of that predecessor forest, where each
//!    system reports to its predecessor once all of its own children have
//!    reported.
//!
//! When several equally short predecessors exist only the first discovered
//! one is kept, so counts reflect one retained path per system rather than
//! the full path multiplicity.

use petgraph::graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, info};

use crate::config::FlowConfig;
use crate::graph::{security_band, Position, RouteLoad, StarGraph, SystemId};

/// Per-system result of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceRecord {
    pub system: SystemId,
    /// Hops to the nearest entry; `None` when unreachable or outside the
    /// analysis universe.
    pub distance_to_entry: Option<u32>,
    /// The neighbor one hop closer to an entry.
    pub predecessor: Option<SystemId>,
    /// Systems downstream of this one in the predecessor forest.
    pub flow_count: u32,
}

/// Per-gate result of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeFlow {
    /// Lower system id of the gate.
    pub a: SystemId,
    /// Higher system id of the gate.
    pub b: SystemId,
    /// Path claims on this gate: one per system whose retained route
    /// leaves through it.
    pub route_count: u32,
    /// Systems whose retained route crosses this gate at any point.
    pub traffic: u32,
}

impl EdgeFlow {
    pub fn load(&self) -> RouteLoad {
        RouteLoad::from_traffic(self.traffic)
    }
}

/// Flattened per-system row for renderers and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRow {
    pub system: SystemId,
    pub name: String,
    pub security: f64,
    pub security_band: u8,
    pub position: Position,
    pub is_entry: bool,
    pub distance_to_entry: Option<u32>,
    pub predecessor: Option<String>,
    pub flow_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeFlowRow {
    pub from: String,
    pub to: String,
    pub route_count: u32,
    pub traffic: u32,
    pub load: RouteLoad,
}

/// Result of [`FlowAnalyzer::analyze`]. Records are indexed like the graph
/// they were computed from.
#[derive(Debug, Clone)]
pub struct FlowAnalysis {
    records: Vec<DistanceRecord>,
    edges: Vec<EdgeFlow>,
    by_system: HashMap<SystemId, usize>,
    by_gate: HashMap<(SystemId, SystemId), usize>,
}

impl FlowAnalysis {
    fn empty(graph: &StarGraph) -> Self {
        let records: Vec<DistanceRecord> = graph
            .systems()
            .map(|(_, node)| DistanceRecord {
                system: node.id,
                distance_to_entry: None,
                predecessor: None,
                flow_count: 0,
            })
            .collect();
        let by_system = records
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.system, pos))
            .collect();

        let inner = graph.inner_graph();
        let mut edges = Vec::with_capacity(inner.edge_count());
        let mut by_gate = HashMap::with_capacity(inner.edge_count());
        for edge in inner.edge_indices() {
            let (u, v) = inner
                .edge_endpoints(edge)
                .map(|(u, v)| (inner[u].id, inner[v].id))
                .unwrap_or((SystemId(0), SystemId(0)));
            let (a, b) = (u.min(v), u.max(v));
            by_gate.insert((a, b), edge.index());
            edges.push(EdgeFlow {
                a,
                b,
                route_count: 0,
                traffic: 0,
            });
        }

        Self {
            records,
            edges,
            by_system,
            by_gate,
        }
    }

    pub fn records(&self) -> &[DistanceRecord] {
        &self.records
    }

    pub fn edges(&self) -> &[EdgeFlow] {
        &self.edges
    }

    pub fn record(&self, system: SystemId) -> Option<&DistanceRecord> {
        self.by_system.get(&system).map(|&pos| &self.records[pos])
    }

    /// The gate between two systems, in either order.
    pub fn edge(&self, x: SystemId, y: SystemId) -> Option<&EdgeFlow> {
        self.by_gate
            .get(&(x.min(y), x.max(y)))
            .map(|&pos| &self.edges[pos])
    }

    /// Systems with a distance, entries included.
    pub fn reachable_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.distance_to_entry.is_some())
            .count()
    }

    pub fn total_route_count(&self) -> u64 {
        self.edges.iter().map(|e| u64::from(e.route_count)).sum()
    }

    /// Per-system table joined with the graph's node data.
    pub fn rows(&self, graph: &StarGraph) -> Vec<FlowRow> {
        graph
            .systems()
            .map(|(idx, node)| {
                let record = &self.records[idx.index()];
                FlowRow {
                    system: node.id,
                    name: node.name.clone(),
                    security: node.security,
                    security_band: security_band(node.security),
                    position: node.position,
                    is_entry: node.is_entry,
                    distance_to_entry: record.distance_to_entry,
                    predecessor: record
                        .predecessor
                        .and_then(|p| graph.get(p))
                        .map(|p| p.name.clone()),
                    flow_count: record.flow_count,
                }
            })
            .collect()
    }

    /// Gates that carry at least one retained route.
    pub fn edge_rows(&self, graph: &StarGraph) -> Vec<EdgeFlowRow> {
        let name = |id: SystemId| graph.get(id).map(|n| n.name.clone()).unwrap_or_default();
        self.edges
            .iter()
            .filter(|e| e.route_count > 0)
            .map(|e| EdgeFlowRow {
                from: name(e.a),
                to: name(e.b),
                route_count: e.route_count,
                traffic: e.traffic,
                load: e.load(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlowAnalyzer {
    parallel: bool,
}

impl FlowAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &FlowConfig) -> Self {
        Self::new().parallel(config.parallel)
    }

    /// Run each connected component of the analysis universe on its own
    /// rayon task. Results are identical to the sequential run.
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn analyze(&self, graph: &StarGraph) -> FlowAnalysis {
        let entries = graph.entries();
        info!(
            entries = entries.len(),
            systems = graph.system_count(),
            parallel = self.parallel,
            "analysing shortest routes to entry systems"
        );

        let outcomes: Vec<PassOutcome> = if self.parallel {
            universe_components(graph)
                .into_par_iter()
                .filter_map(|members| {
                    let seeds: Vec<NodeIndex> = members
                        .iter()
                        .copied()
                        .filter(|&idx| graph.system(idx).is_entry)
                        .collect();
                    if seeds.is_empty() {
                        None
                    } else {
                        Some(FlowPass::new(graph, members).run(&seeds))
                    }
                })
                .collect()
        } else {
            let members: Vec<NodeIndex> = graph
                .systems()
                .filter(|(_, node)| node.in_flow_universe())
                .map(|(idx, _)| idx)
                .collect();
            vec![FlowPass::new(graph, members).run(&entries)]
        };

        let mut analysis = FlowAnalysis::empty(graph);
        for outcome in outcomes {
            outcome.merge_into(graph, &mut analysis);
        }

        info!(
            reachable = analysis.reachable_count(),
            routes = analysis.total_route_count(),
            "entry flow analysis complete"
        );
        analysis
    }
}

/// Connected components of the analysis universe, each in ascending index
/// order.
fn universe_components(graph: &StarGraph) -> Vec<Vec<NodeIndex>> {
    let inner = graph.inner_graph();
    let mut sets = UnionFind::<usize>::new(inner.node_count());
    for edge in inner.edge_indices() {
        if let Some((u, v)) = inner.edge_endpoints(edge) {
            if inner[u].in_flow_universe() && inner[v].in_flow_universe() {
                sets.union(u.index(), v.index());
            }
        }
    }

    let mut components: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
    for (idx, node) in graph.systems() {
        if node.in_flow_universe() {
            components.entry(sets.find(idx.index())).or_default().push(idx);
        }
    }
    debug!(components = components.len(), "split analysis universe");
    components.into_values().collect()
}

/// Dense state for one run over a set of member systems. Members are
/// addressed by local position; neighbors outside the member set are
/// invisible to the pass.
struct FlowPass<'g> {
    graph: &'g StarGraph,
    members: Vec<NodeIndex>,
    local: HashMap<NodeIndex, usize>,
    distance: Vec<Option<u32>>,
    predecessor: Vec<Option<usize>>,
    children: Vec<u32>,
    flow: Vec<u32>,
    /// Claims on the gate from a member to its predecessor.
    claims: Vec<u32>,
}

/// Finished state of one pass, ready to be merged.
struct PassOutcome {
    members: Vec<NodeIndex>,
    distance: Vec<Option<u32>>,
    predecessor: Vec<Option<NodeIndex>>,
    flow: Vec<u32>,
    claims: Vec<u32>,
}

impl<'g> FlowPass<'g> {
    fn new(graph: &'g StarGraph, members: Vec<NodeIndex>) -> Self {
        let n = members.len();
        let local = members
            .iter()
            .enumerate()
            .map(|(pos, &idx)| (idx, pos))
            .collect();
        Self {
            graph,
            members,
            local,
            distance: vec![None; n],
            predecessor: vec![None; n],
            children: vec![0; n],
            flow: vec![0; n],
            claims: vec![0; n],
        }
    }

    fn run(mut self, seeds: &[NodeIndex]) -> PassOutcome {
        self.forward(seeds);
        self.reverse();

        let members = self.members;
        let predecessor = self
            .predecessor
            .iter()
            .map(|p| p.map(|pos| members[pos]))
            .collect();
        PassOutcome {
            distance: self.distance,
            predecessor,
            flow: self.flow,
            claims: self.claims,
            members,
        }
    }

    fn forward(&mut self, seeds: &[NodeIndex]) {
        let mut frontier: Vec<usize> = Vec::with_capacity(seeds.len());
        for seed in seeds {
            if let Some(&pos) = self.local.get(seed) {
                if self.distance[pos].is_none() {
                    self.distance[pos] = Some(0);
                    frontier.push(pos);
                }
            }
        }

        let mut depth = 0;
        while !frontier.is_empty() {
            depth += 1;
            let mut next_frontier = Vec::new();
            for &current in &frontier {
                for neighbor in self.graph.neighbors(self.members[current]) {
                    let Some(&pos) = self.local.get(&neighbor) else {
                        continue;
                    };
                    if self.distance[pos].is_some() {
                        continue;
                    }
                    self.distance[pos] = Some(depth);
                    self.predecessor[pos] = Some(current);
                    self.children[current] += 1;
                    next_frontier.push(pos);
                }
            }
            if !next_frontier.is_empty() {
                debug!(distance = depth, systems = next_frontier.len(), "forward layer");
            }
            frontier = next_frontier;
        }
    }

    fn reverse(&mut self) {
        let mut pending = self.children.clone();
        let mut queue: VecDeque<usize> = (0..self.members.len())
            .filter(|&pos| self.distance[pos].is_some() && self.children[pos] == 0)
            .collect();
        debug!(leaves = queue.len(), "analysing catchment area");

        while let Some(pos) = queue.pop_front() {
            let Some(parent) = self.predecessor[pos] else {
                continue;
            };
            self.claims[pos] += 1;
            self.flow[parent] += 1 + self.flow[pos];
            pending[parent] -= 1;
            if pending[parent] == 0 {
                queue.push_back(parent);
            }
        }
    }
}

impl PassOutcome {
    fn merge_into(self, graph: &StarGraph, analysis: &mut FlowAnalysis) {
        for (pos, &idx) in self.members.iter().enumerate() {
            let record = &mut analysis.records[idx.index()];
            record.distance_to_entry = self.distance[pos];
            record.flow_count = self.flow[pos];
            record.predecessor = self.predecessor[pos].map(|p| graph.system(p).id);

            if let Some(parent) = self.predecessor[pos] {
                if let Some(edge) = graph.gate_between(idx, parent) {
                    let flow = &mut analysis.edges[edge.index()];
                    flow.route_count += self.claims[pos];
                    flow.traffic += 1 + self.flow[pos];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConstellationId, GraphBuilder, RegionId};
    use crate::store::NodeRecord;
    use proptest::prelude::*;

    fn record(id: u64, security: f64, entry: bool, gates: &[u64]) -> NodeRecord {
        NodeRecord {
            id: SystemId(id),
            name: format!("S{}", id),
            security,
            position: Position::default(),
            constellation: ConstellationId(id % 7),
            region: RegionId(1),
            is_entry: entry,
            gates: gates.iter().map(|&g| SystemId(g)).collect(),
        }
    }

    /// Entries {A}, gates A-B, B-C, B-D, C-E.
    fn scenario() -> StarGraph {
        let records = vec![
            record(1, 0.3, true, &[2]),
            record(2, -0.1, false, &[3, 4]),
            record(3, -0.2, false, &[5]),
            record(4, -0.3, false, &[]),
            record(5, -0.4, false, &[]),
        ];
        GraphBuilder::new().build(records).unwrap()
    }

    /// Build a graph from generated `(security, entry)` pairs and gates
    /// given as index pairs into that list.
    fn random_graph(systems: &[(f64, bool)], gates: &[(usize, usize)]) -> StarGraph {
        let mut records: Vec<NodeRecord> = systems
            .iter()
            .enumerate()
            .map(|(pos, &(security, entry))| record(pos as u64 + 1, security, entry, &[]))
            .collect();
        for &(a, b) in gates {
            records[a].gates.push(SystemId(b as u64 + 1));
        }
        GraphBuilder::new().build(records).unwrap()
    }

    fn arb_graph() -> impl Strategy<Value = StarGraph> {
        (2usize..80)
            .prop_flat_map(|n| {
                let security = prop::sample::select(vec![-0.5, -0.1, 0.0, 0.3, 0.8]);
                (
                    prop::collection::vec((security, any::<bool>()), n),
                    prop::collection::vec((0..n, 0..n), 0..n * 2),
                )
            })
            .prop_map(|(systems, gates)| random_graph(&systems, &gates))
    }

    fn check_invariants(graph: &StarGraph, analysis: &FlowAnalysis) {
        let mut child_sum: HashMap<SystemId, u32> = HashMap::new();
        let mut non_entry_reachable = 0u64;

        for (_, node) in graph.systems() {
            let record = analysis.record(node.id).unwrap();
            match record.distance_to_entry {
                None => {
                    assert_eq!(record.flow_count, 0);
                    assert!(record.predecessor.is_none());
                }
                Some(distance) => {
                    // Distance equals the predecessor chain length
                    let mut hops = 0;
                    let mut cursor = record;
                    while let Some(p) = cursor.predecessor {
                        hops += 1;
                        cursor = analysis.record(p).unwrap();
                    }
                    assert_eq!(hops, distance);
                    assert!(graph.get(cursor.system).unwrap().is_entry);

                    if node.is_entry {
                        assert_eq!(distance, 0);
                    } else {
                        non_entry_reachable += 1;
                    }
                    if let Some(p) = record.predecessor {
                        *child_sum.entry(p).or_default() += 1 + record.flow_count;
                        let edge = analysis.edge(node.id, p).unwrap();
                        assert!(edge.route_count > 0);
                    }
                }
            }
        }

        for (_, node) in graph.systems() {
            let record = analysis.record(node.id).unwrap();
            let expected = child_sum.get(&node.id).copied().unwrap_or(0);
            assert_eq!(record.flow_count, expected, "conservation at {}", node.name);
        }
        assert_eq!(analysis.total_route_count(), non_entry_reachable);
    }

    #[test]
    fn test_scenario_distances_and_flow() {
        let graph = scenario();
        let analysis = FlowAnalyzer::new().analyze(&graph);

        let distance = |id| analysis.record(SystemId(id)).unwrap().distance_to_entry;
        let flow = |id| analysis.record(SystemId(id)).unwrap().flow_count;

        assert_eq!(
            (1..=5).map(distance).collect::<Vec<_>>(),
            vec![Some(0), Some(1), Some(2), Some(2), Some(3)]
        );
        assert_eq!(flow(5), 0);
        assert_eq!(flow(3), 1);
        assert_eq!(flow(4), 0);
        assert_eq!(flow(2), 3);
        assert_eq!(flow(1), 4);

        assert_eq!(
            analysis.record(SystemId(5)).unwrap().predecessor,
            Some(SystemId(3))
        );
        assert_eq!(analysis.total_route_count(), 4);
        check_invariants(&graph, &analysis);
    }

    #[test]
    fn test_edge_traffic_and_load() {
        let graph = scenario();
        let analysis = FlowAnalyzer::new().analyze(&graph);

        let ab = analysis.edge(SystemId(2), SystemId(1)).unwrap();
        assert_eq!(ab.route_count, 1);
        assert_eq!(ab.traffic, 4);
        assert_eq!(ab.load(), RouteLoad::Low);

        let ce = analysis.edge(SystemId(3), SystemId(5)).unwrap();
        assert_eq!(ce.traffic, 1);
        assert_eq!(ce.load(), RouteLoad::Idle);

        let rows = analysis.edge_rows(&graph);
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn test_highsec_excluded_from_universe() {
        // Entry - Highsec - Null: the nullsec system is only reachable
        // through highsec, which is outside the analysis.
        let records = vec![
            record(1, 0.3, true, &[2]),
            record(2, 0.9, false, &[3]),
            record(3, -0.5, false, &[]),
        ];
        let graph = GraphBuilder::new().build(records).unwrap();
        let analysis = FlowAnalyzer::new().analyze(&graph);

        assert_eq!(analysis.record(SystemId(2)).unwrap().distance_to_entry, None);
        assert_eq!(analysis.record(SystemId(3)).unwrap().distance_to_entry, None);
        assert_eq!(analysis.record(SystemId(1)).unwrap().flow_count, 0);
        assert_eq!(analysis.total_route_count(), 0);
    }

    #[test]
    fn test_disconnected_component_keeps_null_distance() {
        let records = vec![
            record(1, 0.3, true, &[2]),
            record(2, -0.1, false, &[]),
            record(3, -0.1, false, &[4]),
            record(4, -0.1, false, &[]),
        ];
        let graph = GraphBuilder::new().build(records).unwrap();
        let analysis = FlowAnalyzer::new().analyze(&graph);

        assert_eq!(analysis.reachable_count(), 2);
        assert_eq!(analysis.record(SystemId(3)).unwrap().distance_to_entry, None);
        assert_eq!(analysis.record(SystemId(4)).unwrap().flow_count, 0);
        check_invariants(&graph, &analysis);
    }

    #[test]
    fn test_no_entries_means_nothing_reachable() {
        let records = vec![record(1, -0.1, false, &[2]), record(2, -0.1, false, &[])];
        let graph = GraphBuilder::new().build(records).unwrap();
        let analysis = FlowAnalyzer::new().analyze(&graph);
        assert_eq!(analysis.reachable_count(), 0);
        assert_eq!(analysis.total_route_count(), 0);
    }

    #[test]
    fn test_equal_length_tie_keeps_first_discovered() {
        // Two entries both one hop from system 3: the lower id wins.
        let records = vec![
            record(1, 0.3, true, &[3]),
            record(2, 0.3, true, &[3]),
            record(3, -0.2, false, &[]),
        ];
        let graph = GraphBuilder::new().build(records).unwrap();
        let analysis = FlowAnalyzer::new().analyze(&graph);

        assert_eq!(
            analysis.record(SystemId(3)).unwrap().predecessor,
            Some(SystemId(1))
        );
        assert_eq!(analysis.record(SystemId(1)).unwrap().flow_count, 1);
        assert_eq!(analysis.record(SystemId(2)).unwrap().flow_count, 0);
    }

    #[test]
    fn test_adjacent_entries_do_not_claim_each_other() {
        let records = vec![
            record(1, 0.3, true, &[2, 3]),
            record(2, 0.3, true, &[]),
            record(3, -0.2, false, &[]),
        ];
        let graph = GraphBuilder::new().build(records).unwrap();
        let analysis = FlowAnalyzer::new().analyze(&graph);

        assert_eq!(analysis.record(SystemId(2)).unwrap().distance_to_entry, Some(0));
        assert!(analysis.edge(SystemId(1), SystemId(2)).unwrap().route_count == 0);
        check_invariants(&graph, &analysis);
    }

    proptest! {
        #[test]
        fn test_invariants_on_random_graphs(graph in arb_graph()) {
            let analysis = FlowAnalyzer::new().analyze(&graph);
            check_invariants(&graph, &analysis);
        }

        #[test]
        fn test_parallel_matches_sequential(graph in arb_graph()) {
            let sequential = FlowAnalyzer::new().analyze(&graph);
            let parallel = FlowAnalyzer::new().parallel(true).analyze(&graph);
            prop_assert_eq!(sequential.records(), parallel.records());
            prop_assert_eq!(sequential.edges(), parallel.edges());
        }

        #[test]
        fn test_repeated_runs_are_identical(graph in arb_graph()) {
            let first = FlowAnalyzer::new().analyze(&graph);
            let second = FlowAnalyzer::new().analyze(&graph);
            prop_assert_eq!(first.records(), second.records());
        }
    }

    #[test]
    fn test_rows_join_names() {
        let graph = scenario();
        let analysis = FlowAnalyzer::new().analyze(&graph);
        let rows = analysis.rows(&graph);
        let e = rows.iter().find(|r| r.name == "S5").unwrap();
        assert_eq!(e.predecessor.as_deref(), Some("S3"));
        assert_eq!(e.distance_to_entry, Some(3));
        assert!(rows.iter().find(|r| r.name == "S1").unwrap().is_entry);
    }
}
