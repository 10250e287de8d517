//! In-memory [`NodeStore`] backed by a JSON dataset.
//!
//! Dataset layout:
//!
//! ```json
//! {
//!   "systems": [{"id": 1, "name": "Jita", "security": 0.9,
//!                "constellation": 10, "region": 100, "gates": [2, 3]}],
//!   "resources": [{"planet_id": 11, "planet_name": "Jita I", "system_id": 1,
//!                  "resource_name": "Ice", "output": 12.5}]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, info};

use super::{AdjacencyRecord, NeighborRef, NodeRecord, NodeStore, ResourceRecord};
use crate::error::Result;
use crate::graph::{ConstellationId, SystemId};

/// On-disk shape of a dataset file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub systems: Vec<NodeRecord>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
}

pub struct MemoryStore {
    /// Records exactly as loaded, raw gate lists included.
    records: Vec<NodeRecord>,
    by_id: HashMap<SystemId, usize>,
    by_name: HashMap<String, usize>,
    /// Symmetrized adjacency restricted to known systems.
    adjacency: BTreeMap<SystemId, BTreeSet<SystemId>>,
    clusters: BTreeMap<ConstellationId, Vec<SystemId>>,
    resources: Vec<ResourceRecord>,
    cluster_fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new(dataset: Dataset) -> Self {
        let Dataset { systems, resources } = dataset;

        let mut by_id = HashMap::with_capacity(systems.len());
        let mut by_name = HashMap::with_capacity(systems.len());
        let mut clusters: BTreeMap<ConstellationId, Vec<SystemId>> = BTreeMap::new();
        for (pos, record) in systems.iter().enumerate() {
            by_id.insert(record.id, pos);
            by_name.insert(record.name.clone(), pos);
            clusters.entry(record.constellation).or_default().push(record.id);
        }
        for members in clusters.values_mut() {
            members.sort();
            members.dedup();
        }

        let mut adjacency: BTreeMap<SystemId, BTreeSet<SystemId>> = BTreeMap::new();
        for record in &systems {
            adjacency.entry(record.id).or_default();
            for &target in &record.gates {
                if target == record.id || !by_id.contains_key(&target) {
                    continue;
                }
                adjacency.entry(record.id).or_default().insert(target);
                adjacency.entry(target).or_default().insert(record.id);
            }
        }

        info!(
            systems = systems.len(),
            resources = resources.len(),
            constellations = clusters.len(),
            "memory store loaded"
        );

        Self {
            records: systems,
            by_id,
            by_name,
            adjacency,
            clusters,
            resources,
            cluster_fetches: AtomicUsize::new(0),
        }
    }

    pub fn from_records(systems: Vec<NodeRecord>, resources: Vec<ResourceRecord>) -> Self {
        Self::new(Dataset { systems, resources })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(json)?;
        Ok(Self::new(dataset))
    }

    /// Load a dataset file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "reading dataset");
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Number of `fetch_clusters` calls served so far.
    pub fn cluster_fetches(&self) -> usize {
        self.cluster_fetches.load(Ordering::Relaxed)
    }

    fn record(&self, id: SystemId) -> Option<&NodeRecord> {
        self.by_id.get(&id).map(|&pos| &self.records[pos])
    }
}

impl NodeStore for MemoryStore {
    fn fetch_all_nodes_with_adjacency(&self) -> Result<Vec<NodeRecord>> {
        Ok(self.records.clone())
    }

    fn fetch_node(&self, name: &str) -> Result<Option<NodeRecord>> {
        Ok(self.by_name.get(name).map(|&pos| self.records[pos].clone()))
    }

    fn fetch_node_by_id(&self, id: SystemId) -> Result<Option<NodeRecord>> {
        Ok(self.record(id).cloned())
    }

    fn fetch_neighbors(&self, id: SystemId) -> Result<BTreeSet<SystemId>> {
        Ok(self.adjacency.get(&id).cloned().unwrap_or_default())
    }

    fn fetch_clusters(&self, clusters: &[ConstellationId]) -> Result<Vec<AdjacencyRecord>> {
        self.cluster_fetches.fetch_add(1, Ordering::Relaxed);
        debug!(clusters = clusters.len(), "serving cluster fetch");

        let mut out = Vec::new();
        for cluster in clusters {
            let Some(members) = self.clusters.get(cluster) else {
                continue;
            };
            for &id in members {
                let neighbors = self
                    .adjacency
                    .get(&id)
                    .into_iter()
                    .flatten()
                    .filter_map(|&n| {
                        self.record(n).map(|r| NeighborRef {
                            id: n,
                            constellation: r.constellation,
                        })
                    })
                    .collect();
                out.push(AdjacencyRecord {
                    id,
                    constellation: *cluster,
                    neighbors,
                });
            }
        }
        Ok(out)
    }

    fn fetch_resources(
        &self,
        systems: &[SystemId],
        resource_type: Option<&str>,
    ) -> Result<Vec<ResourceRecord>> {
        let wanted: BTreeSet<SystemId> = systems.iter().copied().collect();
        Ok(self
            .resources
            .iter()
            .filter(|r| wanted.contains(&r.system_id))
            .filter(|r| resource_type.map_or(true, |t| r.resource_name == t))
            .cloned()
            .collect())
    }

    fn resolve_resource_type(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .resources
            .iter()
            .find(|r| r.resource_name.eq_ignore_ascii_case(name))
            .map(|r| r.resource_name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{PlanetId, Position, RegionId, Richness};
    use std::io::Write;

    fn system(id: u64, name: &str, constellation: u64, gates: &[u64]) -> NodeRecord {
        NodeRecord {
            id: SystemId(id),
            name: name.to_string(),
            security: -0.4,
            position: Position::default(),
            constellation: ConstellationId(constellation),
            region: RegionId(1),
            is_entry: false,
            gates: gates.iter().map(|&g| SystemId(g)).collect(),
        }
    }

    #[test]
    fn test_one_sided_gates_are_symmetrized() {
        let store = MemoryStore::from_records(
            vec![system(1, "A", 10, &[2]), system(2, "B", 20, &[])],
            vec![],
        );

        let from_b = store.fetch_neighbors(SystemId(2)).unwrap();
        assert!(from_b.contains(&SystemId(1)));

        // Raw records keep the one-sided list
        let all = store.fetch_all_nodes_with_adjacency().unwrap();
        assert!(all.iter().find(|r| r.id == SystemId(2)).unwrap().gates.is_empty());
    }

    #[test]
    fn test_fetch_clusters_counts_calls_and_tags_neighbors() {
        let store = MemoryStore::from_records(
            vec![
                system(1, "A", 10, &[2, 3]),
                system(2, "B", 10, &[]),
                system(3, "C", 20, &[]),
            ],
            vec![],
        );

        let batch = store.fetch_clusters(&[ConstellationId(10)]).unwrap();
        assert_eq!(batch.len(), 2);
        let a = batch.iter().find(|r| r.id == SystemId(1)).unwrap();
        assert!(a.neighbors.contains(&NeighborRef {
            id: SystemId(3),
            constellation: ConstellationId(20),
        }));

        store.fetch_clusters(&[ConstellationId(20), ConstellationId(99)]).unwrap();
        assert_eq!(store.cluster_fetches(), 2);
    }

    #[test]
    fn test_unknown_gate_target_is_not_adjacent() {
        let store = MemoryStore::from_records(vec![system(1, "A", 10, &[42])], vec![]);
        assert!(store.fetch_neighbors(SystemId(1)).unwrap().is_empty());
    }

    #[test]
    fn test_resource_lookup() {
        let resources = vec![
            ResourceRecord {
                planet_id: PlanetId(11),
                planet_name: "A I".to_string(),
                system_id: SystemId(1),
                resource_name: "Heavy Water".to_string(),
                output: 4.0,
                richness: None,
            },
            ResourceRecord {
                planet_id: PlanetId(21),
                planet_name: "B I".to_string(),
                system_id: SystemId(2),
                resource_name: "Heavy Water".to_string(),
                output: 9.0,
                richness: None,
            },
        ];
        let store = MemoryStore::from_records(
            vec![system(1, "A", 10, &[2]), system(2, "B", 10, &[])],
            resources,
        );

        assert_eq!(
            store.resolve_resource_type("heavy water").unwrap().as_deref(),
            Some("Heavy Water")
        );
        assert_eq!(store.resolve_resource_type("Plasmoids").unwrap(), None);

        let hits = store
            .fetch_resources(&[SystemId(1)], Some("Heavy Water"))
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].planet_id, PlanetId(11));
    }

    #[test]
    fn test_load_dataset_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"systems": [
                {{"id": 1, "name": "Jita", "security": 0.9, "constellation": 10, "region": 100, "gates": [2]}},
                {{"id": 2, "name": "Perimeter", "security": 0.9, "constellation": 10, "region": 100}}
            ]}}"#
        )
        .unwrap();

        let store = MemoryStore::load(file.path()).unwrap();
        let jita = store.fetch_node("Jita").unwrap().unwrap();
        assert_eq!(jita.id, SystemId(1));
        assert!(!jita.is_entry);
        assert_eq!(
            store.fetch_neighbors(SystemId(2)).unwrap(),
            BTreeSet::from([SystemId(1)])
        );
    }

    #[test]
    fn test_richness_grades_ignore_case() {
        let store = MemoryStore::from_json_str(
            r#"{"systems": [
                {"id": 1, "name": "Jita", "security": 0.9, "constellation": 10, "region": 100}
            ], "resources": [
                {"planet_id": 11, "planet_name": "Jita IV", "system_id": 1, "resource_name": "Ice", "output": 3.0, "richness": "Perfect"},
                {"planet_id": 12, "planet_name": "Jita V", "system_id": 1, "resource_name": "Ice", "output": 1.0, "richness": "poor"}
            ]}"#,
        )
        .unwrap();
        let hits = store.fetch_resources(&[SystemId(1)], None).unwrap();
        assert_eq!(hits[0].richness, Some(Richness::Perfect));
        assert_eq!(hits[1].richness, Some(Richness::Poor));

        let bad = r#"{"systems": [], "resources": [
            {"planet_id": 11, "planet_name": "X", "system_id": 1, "resource_name": "Ice", "output": 3.0, "richness": "abundant"}
        ]}"#;
        assert!(MemoryStore::from_json_str(bad).is_err());
    }

    #[test]
    fn test_malformed_dataset_is_an_error() {
        assert!(MemoryStore::from_json_str("{\"systems\": 3}").is_err());
    }
}
