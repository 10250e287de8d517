//! Joins a distance map to planetary resources and ranks the hits.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{StarGraphConfig, DEFAULT_RESULT_COUNT};
use crate::error::{Result, StarGraphError};
use crate::graph::{PlanetId, Richness, SystemId};
use crate::store::NodeStore;

/// One planet producing a resource within range of the search origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceHit {
    pub planet_id: PlanetId,
    pub planet_name: String,
    pub system_id: SystemId,
    pub resource_name: String,
    pub output: f64,
    /// Hops from the search origin.
    pub distance: u32,
    pub richness: Option<Richness>,
}

pub struct ResourceRanker<'s, S: NodeStore + ?Sized> {
    store: &'s S,
    order: HashMap<String, usize>,
    default_count: usize,
}

impl<'s, S: NodeStore + ?Sized> ResourceRanker<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            order: HashMap::new(),
            default_count: DEFAULT_RESULT_COUNT,
        }
    }

    pub fn from_config(store: &'s S, config: &StarGraphConfig) -> Self {
        Self::new(store)
            .with_order(config.resources.order.clone())
            .with_default_count(config.search.default_result_count)
    }

    /// Resource display order. Resources missing from the list sort after
    /// every listed one.
    pub fn with_order(mut self, order: Vec<String>) -> Self {
        self.order = order
            .into_iter()
            .enumerate()
            .map(|(pos, name)| (name, pos))
            .collect();
        self
    }

    /// Result count used when a query passes no explicit limit.
    pub fn with_default_count(mut self, count: usize) -> Self {
        self.default_count = count;
        self
    }

    /// Resources on planets of the systems in `distances`, best first:
    /// output descending, then distance, planet id, resource order and
    /// resource name ascending.
    pub fn rank(
        &self,
        distances: &BTreeMap<SystemId, u32>,
        resource_type: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<ResourceHit>> {
        let resource_type = match resource_type {
            Some(name) => Some(
                self.store
                    .resolve_resource_type(name)?
                    .ok_or_else(|| StarGraphError::resource_not_found(name))?,
            ),
            None => None,
        };

        let systems: Vec<SystemId> = distances.keys().copied().collect();
        let records = self
            .store
            .fetch_resources(&systems, resource_type.as_deref())?;

        let mut hits: Vec<ResourceHit> = records
            .into_iter()
            .filter_map(|r| {
                let distance = *distances.get(&r.system_id)?;
                Some(ResourceHit {
                    planet_id: r.planet_id,
                    planet_name: r.planet_name,
                    system_id: r.system_id,
                    resource_name: r.resource_name,
                    output: r.output,
                    distance,
                    richness: r.richness,
                })
            })
            .collect();

        hits.sort_by(|a, b| self.compare(a, b));
        hits.truncate(limit.unwrap_or(self.default_count));

        debug!(
            systems = systems.len(),
            hits = hits.len(),
            resource = resource_type.as_deref().unwrap_or("*"),
            "ranked resources"
        );
        Ok(hits)
    }

    fn order_of(&self, name: &str) -> usize {
        self.order.get(name).copied().unwrap_or(usize::MAX)
    }

    fn compare(&self, a: &ResourceHit, b: &ResourceHit) -> Ordering {
        b.output
            .total_cmp(&a.output)
            .then(a.distance.cmp(&b.distance))
            .then(a.planet_id.cmp(&b.planet_id))
            .then(self.order_of(&a.resource_name).cmp(&self.order_of(&b.resource_name)))
            .then_with(|| a.resource_name.cmp(&b.resource_name))
    }
}
