//! Radius-limited neighborhood search that loads the graph lazily.
//!
//! Nothing is read up front. Each BFS layer first collects the frontier
//! systems whose gates are still unknown, takes their constellations, and
//! fetches all of those constellations from the store in one call. Loaded
//! adjacency stays cached for later queries from the same origin.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::error::{Result, StarGraphError};
use crate::graph::{ConstellationId, SystemId};
use crate::store::NodeStore;

#[derive(Debug, Clone)]
struct CacheEntry {
    constellation: ConstellationId,
    neighbors: BTreeSet<SystemId>,
    /// The store has returned this system's own adjacency. Until then
    /// `neighbors` only holds reverse links seen from loaded neighbors.
    loaded: bool,
}

impl CacheEntry {
    fn placeholder(constellation: ConstellationId) -> Self {
        Self {
            constellation,
            neighbors: BTreeSet::new(),
            loaded: false,
        }
    }
}

pub struct BoundedSearchCache<'s, S: NodeStore + ?Sized> {
    store: &'s S,
    entries: HashMap<SystemId, CacheEntry>,
    loaded_clusters: HashSet<ConstellationId>,
    origin: Option<SystemId>,
    /// Every distance handed out for the current origin.
    distances: BTreeMap<SystemId, u32>,
}

impl<'s, S: NodeStore + ?Sized> BoundedSearchCache<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            entries: HashMap::new(),
            loaded_clusters: HashSet::new(),
            origin: None,
            distances: BTreeMap::new(),
        }
    }

    pub fn origin(&self) -> Option<SystemId> {
        self.origin
    }

    /// Drop everything cached so far.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.loaded_clusters.clear();
        self.origin = None;
        self.distances.clear();
    }

    pub fn cached_systems(&self) -> usize {
        self.entries.len()
    }

    pub fn loaded_clusters(&self) -> usize {
        self.loaded_clusters.len()
    }

    pub fn is_loaded(&self, system: SystemId) -> bool {
        self.entries.get(&system).map_or(false, |e| e.loaded)
    }

    /// Resolve `name` through the store, then [`expand`](Self::expand).
    pub fn expand_by_name(&mut self, name: &str, max_distance: u32) -> Result<BTreeMap<SystemId, u32>> {
        let record = self
            .store
            .fetch_node(name)?
            .ok_or_else(|| StarGraphError::system_not_found(name))?;
        self.expand(record.id, max_distance)
    }

    /// Exact hop distances of every system within `max_distance` of
    /// `origin`, the origin itself included at 0.
    ///
    /// A different origin than the previous call resets the cache first.
    pub fn expand(&mut self, origin: SystemId, max_distance: u32) -> Result<BTreeMap<SystemId, u32>> {
        if self.origin != Some(origin) {
            if self.origin.is_some() {
                debug!(old = ?self.origin, new = %origin, "origin changed, resetting search cache");
            }
            self.reset();
        }

        if !self.entries.contains_key(&origin) {
            let record = self
                .store
                .fetch_node_by_id(origin)?
                .ok_or_else(|| StarGraphError::system_not_found(origin.to_string()))?;
            self.entries
                .insert(origin, CacheEntry::placeholder(record.constellation));
        }
        self.origin = Some(origin);

        let mut found: BTreeMap<SystemId, u32> = BTreeMap::new();
        self.record_distance(&mut found, origin, 0)?;
        let mut frontier = vec![origin];

        for depth in 1..=max_distance {
            if frontier.is_empty() {
                break;
            }
            self.load_layer(&frontier)?;

            let mut next_frontier = Vec::new();
            for current in &frontier {
                let neighbors: Vec<SystemId> = self
                    .entries
                    .get(current)
                    .map(|e| e.neighbors.iter().copied().collect())
                    .unwrap_or_default();
                for neighbor in neighbors {
                    if found.contains_key(&neighbor) {
                        continue;
                    }
                    self.record_distance(&mut found, neighbor, depth)?;
                    next_frontier.push(neighbor);
                }
            }
            debug!(distance = depth, systems = next_frontier.len(), "search layer");
            frontier = next_frontier;
        }

        Ok(found)
    }

    fn record_distance(
        &mut self,
        found: &mut BTreeMap<SystemId, u32>,
        system: SystemId,
        distance: u32,
    ) -> Result<()> {
        if let Some(&previous) = self.distances.get(&system) {
            if previous != distance {
                return Err(StarGraphError::InconsistentCache {
                    system,
                    detail: format!("distance {} already recorded as {}", distance, previous),
                });
            }
        }
        self.distances.insert(system, distance);
        found.insert(system, distance);
        Ok(())
    }

    /// Make sure every frontier system has its adjacency loaded, with at
    /// most one store call.
    fn load_layer(&mut self, frontier: &[SystemId]) -> Result<()> {
        let mut pending: BTreeSet<ConstellationId> = BTreeSet::new();
        for system in frontier {
            let entry = self.cache_entry(*system)?;
            if entry.loaded {
                continue;
            }
            if self.loaded_clusters.contains(&entry.constellation) {
                return Err(StarGraphError::InconsistentCache {
                    system: *system,
                    detail: format!(
                        "constellation {} was loaded without this system",
                        entry.constellation
                    ),
                });
            }
            pending.insert(entry.constellation);
        }
        if pending.is_empty() {
            return Ok(());
        }

        let clusters: Vec<ConstellationId> = pending.into_iter().collect();
        debug!(clusters = clusters.len(), "fetching constellations");
        let batch = self.store.fetch_clusters(&clusters)?;

        for record in batch {
            for neighbor in &record.neighbors {
                self.entries
                    .entry(neighbor.id)
                    .or_insert_with(|| CacheEntry::placeholder(neighbor.constellation))
                    .neighbors
                    .insert(record.id);
            }
            let entry = self
                .entries
                .entry(record.id)
                .or_insert_with(|| CacheEntry::placeholder(record.constellation));
            entry.constellation = record.constellation;
            entry
                .neighbors
                .extend(record.neighbors.iter().map(|n| n.id));
            entry.loaded = true;
        }
        self.loaded_clusters.extend(clusters);

        for system in frontier {
            let entry = self.cache_entry(*system)?;
            if !entry.loaded {
                return Err(StarGraphError::InconsistentCache {
                    system: *system,
                    detail: format!(
                        "store returned constellation {} without this system",
                        entry.constellation
                    ),
                });
            }
        }
        Ok(())
    }

    fn cache_entry(&self, system: SystemId) -> Result<&CacheEntry> {
        self.entries
            .get(&system)
            .ok_or_else(|| StarGraphError::InconsistentCache {
                system,
                detail: "reached a system with no cache entry".to_string(),
            })
    }
}
