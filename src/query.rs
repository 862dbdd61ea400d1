//! The query engine: relationship, filter, path, and analytics queries
//! over a [`Graph`].
//!
//! The engine is read-only and internally synchronized; clones of the
//! underlying `Arc`ed nodes are handed out directly. A bounded LRU cache
//! keyed by `(query kind, parameters)` memoizes traversal-heavy results
//! and is invalidated by graph mutations through the generation counter.

pub mod analytics;
pub(crate) mod cache;
pub mod filter;
pub mod path;
pub mod relationship;
pub mod traverse;

use crate::cancel::CancelToken;
use crate::graph::node::{IndividualNode, InternalId};
use crate::graph::Graph;
use crate::query::cache::{CachedValue, QueryCache, QueryKey};
use crate::query::filter::FilterQuery;
use crate::query::path::Path;
use crate::query::relationship::{Relationship, RelationshipKind};
use crate::query::traverse::{Direction, Generations};
use crate::GedcomError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Default capacity of the query-result cache.
const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// A query engine bound to one graph. Cheap to construct; the result
/// cache lives for the engine's lifetime.
pub struct QueryEngine<'g> {
    graph: &'g Graph,
    cache: Mutex<QueryCache>,
}

impl<'g> QueryEngine<'g> {
    /// Creates an engine with the default cache capacity.
    #[must_use]
    pub fn new(graph: &'g Graph) -> QueryEngine<'g> {
        Self::with_cache_capacity(graph, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates an engine with an explicit query-result cache capacity.
    #[must_use]
    pub fn with_cache_capacity(graph: &'g Graph, capacity: usize) -> QueryEngine<'g> {
        QueryEngine {
            graph,
            cache: Mutex::new(QueryCache::new(capacity)),
        }
    }

    pub(crate) fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Parents of the individual, from the precomputed parent cache:
    /// father before mother within a family, families in FAMC order.
    pub fn parents(&self, xref: &str) -> Result<Vec<Arc<IndividualNode>>, GedcomError> {
        let node = self.graph.require_individual(xref)?;
        self.materialize(&node.parents)
    }

    /// Children across every family the individual is a spouse in, in
    /// family order then birth (CHIL) order, deduplicated.
    pub fn children(&self, xref: &str) -> Result<Vec<Arc<IndividualNode>>, GedcomError> {
        let node = self.graph.require_individual(xref)?;
        let mut ids: Vec<InternalId> = Vec::new();
        for &family_id in &node.fams {
            if let Some(family) = self.graph.family(family_id)? {
                for &child in &family.children {
                    if !ids.contains(&child) {
                        ids.push(child);
                    }
                }
            }
        }
        self.materialize(&ids)
    }

    /// Siblings: co-children of every family the individual is a child
    /// of, excluding the individual, deduplicated, in file order.
    pub fn siblings(&self, xref: &str) -> Result<Vec<Arc<IndividualNode>>, GedcomError> {
        let node = self.graph.require_individual(xref)?;
        let mut ids: Vec<InternalId> = Vec::new();
        for &family_id in &node.famc {
            if let Some(family) = self.graph.family(family_id)? {
                for &child in &family.children {
                    if child != node.id && !ids.contains(&child) {
                        ids.push(child);
                    }
                }
            }
        }
        self.materialize(&ids)
    }

    /// Spouses across every FAMS family, deduplicated, in family order.
    pub fn spouses(&self, xref: &str) -> Result<Vec<Arc<IndividualNode>>, GedcomError> {
        let node = self.graph.require_individual(xref)?;
        let mut ids: Vec<InternalId> = Vec::new();
        for &family_id in &node.fams {
            if let Some(family) = self.graph.family(family_id)? {
                if let Some(spouse) = family.spouse_of(node.id) {
                    if !ids.contains(&spouse) {
                        ids.push(spouse);
                    }
                }
            }
        }
        self.materialize(&ids)
    }

    /// Ancestors with their minimum generation depth, breadth-first over
    /// the parent cache. Each ancestor appears once.
    pub fn ancestors(
        &self,
        xref: &str,
        max_generations: Option<u32>,
    ) -> Result<Vec<(Arc<IndividualNode>, u32)>, GedcomError> {
        let node = self.graph.require_individual(xref)?;
        let depths =
            self.depths_cached(node.id, max_generations, Direction::Ancestors, None)?;
        self.materialize_depths(&depths)
    }

    /// Descendants with their minimum generation depth, the mirror image
    /// of [`ancestors`](Self::ancestors) via FAMS → CHIL.
    pub fn descendants(
        &self,
        xref: &str,
        max_generations: Option<u32>,
    ) -> Result<Vec<(Arc<IndividualNode>, u32)>, GedcomError> {
        let node = self.graph.require_individual(xref)?;
        let depths =
            self.depths_cached(node.id, max_generations, Direction::Descendants, None)?;
        self.materialize_depths(&depths)
    }

    /// Streams ancestor generations; cancellable between generations.
    pub fn ancestors_iter(
        &self,
        xref: &str,
        max_generations: Option<u32>,
        cancel: Option<&CancelToken>,
    ) -> Result<Generations<'g>, GedcomError> {
        let node = self.graph.require_individual(xref)?;
        Ok(Generations::new(
            self.graph,
            node.id,
            Direction::Ancestors,
            max_generations,
            cancel,
        ))
    }

    /// Streams descendant generations; cancellable between generations.
    pub fn descendants_iter(
        &self,
        xref: &str,
        max_generations: Option<u32>,
        cancel: Option<&CancelToken>,
    ) -> Result<Generations<'g>, GedcomError> {
        let node = self.graph.require_individual(xref)?;
        Ok(Generations::new(
            self.graph,
            node.id,
            Direction::Descendants,
            max_generations,
            cancel,
        ))
    }

    /// Shortest path over the undirected projection, or `None` when the
    /// two individuals are unconnected.
    pub fn shortest_path(&self, from: &str, to: &str) -> Result<Option<Path>, GedcomError> {
        let from = self.graph.require_individual(from)?;
        let to = self.graph.require_individual(to)?;

        let key = QueryKey::ShortestPath(from.id, to.id);
        let generation = self.graph.generation();
        if let Some(CachedValue::Path(path)) = self.cache.lock().get(&key, generation) {
            return Ok(path);
        }

        let path = path::shortest_path(self.graph, from.id, to.id)?;
        self.cache
            .lock()
            .put(key, generation, CachedValue::Path(path.clone()));
        Ok(path)
    }

    /// All simple paths with at most `max_length` edges.
    pub fn all_paths(
        &self,
        from: &str,
        to: &str,
        max_length: usize,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<Path>, GedcomError> {
        let from = self.graph.require_individual(from)?;
        let to = self.graph.require_individual(to)?;
        path::all_paths(self.graph, from.id, to.id, max_length, cancel)
    }

    /// Classifies the relationship from `from`'s perspective: "spouse",
    /// "sibling", lineal ancestor/descendant, or collateral with degree
    /// and removal (see [`Relationship`]).
    pub fn calculate_relationship(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Relationship, GedcomError> {
        let from_node = self.graph.require_individual(from)?;
        let to_node = self.graph.require_individual(to)?;

        if from_node.id == to_node.id {
            return Ok(Relationship::trivial(RelationshipKind::SelfSame));
        }

        let key = QueryKey::Relationship(from_node.id, to_node.id);
        let generation = self.graph.generation();
        if let Some(CachedValue::Relationship(relationship)) =
            self.cache.lock().get(&key, generation)
        {
            return Ok(relationship);
        }

        let relationship = self.classify(&from_node, &to_node)?;
        self.cache.lock().put(
            key,
            generation,
            CachedValue::Relationship(relationship.clone()),
        );
        Ok(relationship)
    }

    fn classify(
        &self,
        from: &IndividualNode,
        to: &IndividualNode,
    ) -> Result<Relationship, GedcomError> {
        // Spouses first: a shared FAMS family with both in spouse slots.
        for &family_id in &from.fams {
            if let Some(family) = self.graph.family(family_id)? {
                if family.spouse_of(from.id) == Some(to.id) {
                    return Ok(Relationship::trivial(RelationshipKind::Spouse));
                }
            }
        }

        let from_depths = self.depths_cached(from.id, None, Direction::Ancestors, None)?;
        let to_depths = self.depths_cached(to.id, None, Direction::Ancestors, None)?;

        // Lineal: `to` among `from`'s ancestors, or the reverse.
        if let Some(&(_, depth)) = from_depths.iter().find(|&&(id, _)| id == to.id) {
            let kind = if depth == 1 {
                RelationshipKind::Parent
            } else {
                RelationshipKind::Ancestor
            };
            return Ok(Relationship::lineal(kind, depth));
        }
        if let Some(&(_, depth)) = to_depths.iter().find(|&&(id, _)| id == from.id) {
            let kind = if depth == 1 {
                RelationshipKind::Child
            } else {
                RelationshipKind::Descendant
            };
            return Ok(Relationship::lineal(kind, depth));
        }

        // Collateral: lowest common ancestor minimizing max(d1, d2),
        // ties on the smallest internal id.
        match self.lowest_common_ancestor_depths(&from_depths, &to_depths) {
            Some((ancestor_id, depth_from, depth_to)) => {
                let xref = self
                    .graph
                    .xref_of(ancestor_id)?
                    .ok_or_else(|| GedcomError::NotFound(format!("node id {ancestor_id}")))?;
                Ok(Relationship::collateral(depth_from, depth_to, xref))
            }
            None => Ok(Relationship::trivial(RelationshipKind::NotRelated)),
        }
    }

    /// Common ancestors of the pair, ascending by internal id.
    pub fn common_ancestors(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Vec<Arc<IndividualNode>>, GedcomError> {
        let a = self.graph.require_individual(a)?;
        let b = self.graph.require_individual(b)?;

        let a_depths = self.depths_cached(a.id, None, Direction::Ancestors, None)?;
        let b_depths = self.depths_cached(b.id, None, Direction::Ancestors, None)?;

        let mut ids: Vec<InternalId> = a_depths
            .iter()
            .filter(|(id, _)| b_depths.iter().any(|(other, _)| other == id))
            .map(|&(id, _)| id)
            .collect();
        ids.sort_unstable();
        self.materialize(&ids)
    }

    /// The common ancestor minimizing `max(depth_a, depth_b)`; ties break
    /// to the smallest internal id.
    pub fn lowest_common_ancestor(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Option<Arc<IndividualNode>>, GedcomError> {
        let a = self.graph.require_individual(a)?;
        let b = self.graph.require_individual(b)?;

        let a_depths = self.depths_cached(a.id, None, Direction::Ancestors, None)?;
        let b_depths = self.depths_cached(b.id, None, Direction::Ancestors, None)?;

        match self.lowest_common_ancestor_depths(&a_depths, &b_depths) {
            Some((id, _, _)) => self.graph.individual(id),
            None => Ok(None),
        }
    }

    /// Starts a fluent filter over individuals.
    #[must_use]
    pub fn filter(&self) -> FilterQuery<'_, 'g> {
        FilterQuery::new(self)
    }

    /// Number of entries currently held by the result cache.
    #[must_use]
    pub fn cached_results(&self) -> usize {
        self.cache.lock().len()
    }

    // ------------------------------------------------------------------
    // internals

    fn materialize(
        &self,
        ids: &[InternalId],
    ) -> Result<Vec<Arc<IndividualNode>>, GedcomError> {
        let mut nodes = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(node) = self.graph.individual(id)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn materialize_depths(
        &self,
        depths: &[(InternalId, u32)],
    ) -> Result<Vec<(Arc<IndividualNode>, u32)>, GedcomError> {
        let mut nodes = Vec::with_capacity(depths.len());
        for &(id, depth) in depths {
            if let Some(node) = self.graph.individual(id)? {
                nodes.push((node, depth));
            }
        }
        Ok(nodes)
    }

    /// Breadth-first depths in one direction, through the result cache.
    fn depths_cached(
        &self,
        start: InternalId,
        max_generations: Option<u32>,
        direction: Direction,
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<(InternalId, u32)>, GedcomError> {
        let key = match direction {
            Direction::Ancestors => QueryKey::Ancestors(start, max_generations),
            Direction::Descendants => QueryKey::Descendants(start, max_generations),
        };
        let generation = self.graph.generation();
        if let Some(CachedValue::Depths(depths)) = self.cache.lock().get(&key, generation) {
            return Ok(depths);
        }

        let mut depths: Vec<(InternalId, u32)> = Vec::new();
        for result in Generations::new(self.graph, start, direction, max_generations, cancel) {
            let generation_row = result?;
            for member in &generation_row.members {
                depths.push((member.id, generation_row.depth));
            }
        }

        self.cache
            .lock()
            .put(key, generation, CachedValue::Depths(depths.clone()));
        Ok(depths)
    }

    /// Picks `(ancestor, depth_from, depth_to)` minimizing
    /// `max(depth_from, depth_to)` with the documented tie-break.
    fn lowest_common_ancestor_depths(
        &self,
        from_depths: &[(InternalId, u32)],
        to_depths: &[(InternalId, u32)],
    ) -> Option<(InternalId, u32, u32)> {
        let mut best: Option<(InternalId, u32, u32)> = None;
        for &(id, depth_from) in from_depths {
            let Some(&(_, depth_to)) = to_depths.iter().find(|&&(other, _)| other == id) else {
                continue;
            };
            let candidate_max = depth_from.max(depth_to);
            let better = match best {
                None => true,
                Some((best_id, best_from, best_to)) => {
                    let best_max = best_from.max(best_to);
                    candidate_max < best_max || (candidate_max == best_max && id < best_id)
                }
            };
            if better {
                best = Some((id, depth_from, depth_to));
            }
        }
        best
    }
}
