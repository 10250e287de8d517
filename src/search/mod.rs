//! Radius-limited resource search: lazy neighborhood expansion plus
//! resource ranking.

pub mod cache;
pub mod rank;

pub use cache::BoundedSearchCache;
pub use rank::{ResourceHit, ResourceRanker};

use crate::error::Result;
use crate::store::NodeStore;

/// Best resource producers within `max_distance` hops of the system
/// called `origin`.
pub fn find_resources_near<S: NodeStore + ?Sized>(
    cache: &mut BoundedSearchCache<'_, S>,
    ranker: &ResourceRanker<'_, S>,
    origin: &str,
    max_distance: u32,
    resource_type: Option<&str>,
    limit: Option<usize>,
) -> Result<Vec<ResourceHit>> {
    let distances = cache.expand_by_name(origin, max_distance)?;
    ranker.rank(&distances, resource_type, limit)
}
