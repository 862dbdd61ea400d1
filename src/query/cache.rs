//! The bounded LRU cache for query results.
//!
//! Entries are keyed by `(query kind, parameter fingerprint)` and stamped
//! with the graph generation they were computed against; any mutation
//! bumps the generation, which invalidates every older entry on read.

use crate::graph::node::InternalId;
use crate::query::path::Path;
use crate::query::relationship::Relationship;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Fingerprint of a cacheable query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) enum QueryKey {
    Ancestors(InternalId, Option<u32>),
    Descendants(InternalId, Option<u32>),
    ShortestPath(InternalId, InternalId),
    Relationship(InternalId, InternalId),
}

/// Cached result payloads.
#[derive(Clone, Debug)]
pub(crate) enum CachedValue {
    Depths(Vec<(InternalId, u32)>),
    Path(Option<Path>),
    Relationship(Relationship),
}

struct Entry {
    generation: u64,
    value: CachedValue,
}

pub(crate) struct QueryCache {
    entries: LruCache<QueryKey, Entry>,
}

impl QueryCache {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// A hit requires the stored generation to match the current one.
    pub(crate) fn get(&mut self, key: &QueryKey, generation: u64) -> Option<CachedValue> {
        match self.entries.get(key) {
            Some(entry) if entry.generation == generation => Some(entry.value.clone()),
            Some(_) => {
                self.entries.pop(key);
                None
            }
            None => None,
        }
    }

    pub(crate) fn put(&mut self, key: QueryKey, generation: u64, value: CachedValue) {
        self.entries.put(key, Entry { generation, value });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_mismatch_invalidates() {
        let mut cache = QueryCache::new(4);
        let key = QueryKey::Ancestors(1, None);
        cache.put(key.clone(), 0, CachedValue::Depths(vec![(2, 1)]));

        assert!(cache.get(&key, 0).is_some());
        assert!(cache.get(&key, 1).is_none());
        // The stale entry was evicted on the failed read.
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = QueryCache::new(2);
        cache.put(QueryKey::Ancestors(1, None), 0, CachedValue::Depths(vec![]));
        cache.put(QueryKey::Ancestors(2, None), 0, CachedValue::Depths(vec![]));
        cache.put(QueryKey::Ancestors(3, None), 0, CachedValue::Depths(vec![]));
        assert!(cache.get(&QueryKey::Ancestors(1, None), 0).is_none());
        assert!(cache.get(&QueryKey::Ancestors(3, None), 0).is_some());
    }
}
