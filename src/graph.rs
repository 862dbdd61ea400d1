//! The typed relationship graph projected from a [`Tree`].
//!
//! A [`Graph`] owns its nodes, edges, caches and indexes behind one of two
//! interchangeable storage backends: fully in-memory, or hybrid
//! (redb key-value topology plus a shared SQLite metadata store keyed by
//! `file_id`). Query results are identical regardless of backend.
//!
//! Build is single-coordinator; queries are concurrent and read-only.
//! The mutation API (`add_individual`, `add_family`, `add_family_edge`)
//! takes `&mut self`, which gives it exclusive access at the type level;
//! backends additionally guard their internals for shared readers.

pub(crate) mod backend;
pub(crate) mod build;
pub(crate) mod hybrid;
pub(crate) mod index;
pub(crate) mod memory;
pub mod node;

use crate::graph::backend::GraphBackend;
use crate::graph::build::{build_nodes, NodeSlot};
use crate::graph::hybrid::HybridBackend;
use crate::graph::index::IndividualIndexes;
use crate::graph::memory::MemoryBackend;
use crate::graph::node::{EdgeKind, FamilyNode, IndividualNode, InternalId, NodeKind};
use crate::tree::Tree;
use crate::GedcomError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Which storage backend a graph uses. The choice is static per instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageMode {
    /// Everything lives in process memory.
    #[default]
    Memory,
    /// redb + SQLite persistence, shared across trees by `file_id`.
    Hybrid,
}

/// Settings for the hybrid backend.
#[derive(Clone, Debug)]
pub struct HybridConfig {
    /// Logical discriminator isolating this tree inside the shared stores.
    pub file_id: String,
    /// Path of the shared SQLite database.
    pub sqlite_path: PathBuf,
    /// Path of the redb key-value store.
    pub kv_path: PathBuf,
    /// Capacity of the node LRU cache.
    pub node_cache_capacity: usize,
    /// Capacity of the xref↔id LRU cache.
    pub xref_cache_capacity: usize,
    /// SQLite connection pool size.
    pub pool_size: usize,
}

impl HybridConfig {
    /// Conventional layout: `<dir>/graph.sqlite` + `<dir>/graph.redb`.
    #[must_use]
    pub fn new(file_id: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            file_id: file_id.into(),
            sqlite_path: dir.join("graph.sqlite"),
            kv_path: dir.join("graph.redb"),
            node_cache_capacity: 10_000,
            xref_cache_capacity: 50_000,
            pool_size: 4,
        }
    }
}

/// Graph build/storage configuration.
#[derive(Clone, Debug, Default)]
pub struct GraphConfig {
    /// Backend selection.
    pub storage: StorageMode,
    /// Required when `storage` is [`StorageMode::Hybrid`].
    pub hybrid: Option<HybridConfig>,
}

/// The relationship graph.
pub struct Graph {
    backend: Box<dyn GraphBackend>,
    indexes: IndividualIndexes,
    individual_count: usize,
    family_count: usize,
    generation: AtomicU64,
}

impl Graph {
    /// Projects a tree into an in-memory graph.
    ///
    /// # Errors
    ///
    /// Returns `GedcomError::InvalidFormat` for a rejected tree and
    /// `GedcomError::InvariantViolation` when graph integrity cannot be
    /// established.
    pub fn build(tree: &Tree) -> Result<Graph, GedcomError> {
        Self::build_with_config(tree, &GraphConfig::default())
    }

    /// Projects a tree into a graph with an explicit storage choice.
    ///
    /// # Errors
    ///
    /// As [`build`](Self::build); additionally `GedcomError::Backend` for
    /// hybrid storage failures.
    pub fn build_with_config(tree: &Tree, config: &GraphConfig) -> Result<Graph, GedcomError> {
        let built = build_nodes(tree)?;

        let backend: Box<dyn GraphBackend> = match config.storage {
            StorageMode::Memory => Box::new(MemoryBackend::new(&built)),
            StorageMode::Hybrid => {
                let hybrid_config = config.hybrid.as_ref().ok_or_else(|| {
                    GedcomError::Backend(
                        "Hybrid storage selected but no hybrid configuration given".to_string(),
                    )
                })?;
                Box::new(HybridBackend::persist(&built, hybrid_config)?)
            }
        };

        Ok(Graph {
            backend,
            indexes: built.indexes,
            individual_count: built.individual_count,
            family_count: built.family_count,
            generation: AtomicU64::new(0),
        })
    }

    /// Opens a graph previously persisted through the hybrid backend.
    /// Secondary indexes are rebuilt from the stores.
    ///
    /// # Errors
    ///
    /// Returns `GedcomError::Backend` when the stores cannot be opened.
    pub fn open_hybrid(config: &HybridConfig) -> Result<Graph, GedcomError> {
        let backend = HybridBackend::open(config)?;

        let mut indexes = IndividualIndexes::default();
        let individual_ids = backend.individual_ids()?;
        for &id in &individual_ids {
            if let Some(node) = backend.individual(id)? {
                indexes.insert(&node);
            }
        }
        let family_count = backend.family_ids()?.len();

        Ok(Graph {
            backend: Box::new(backend),
            indexes,
            individual_count: individual_ids.len(),
            family_count,
            generation: AtomicU64::new(0),
        })
    }

    /// The individual at `id`, if any.
    pub fn individual(&self, id: InternalId) -> Result<Option<Arc<IndividualNode>>, GedcomError> {
        self.backend.individual(id)
    }

    /// The family at `id`, if any.
    pub fn family(&self, id: InternalId) -> Result<Option<Arc<FamilyNode>>, GedcomError> {
        self.backend.family(id)
    }

    /// Looks an individual up by xref.
    pub fn individual_by_xref(
        &self,
        xref: &str,
    ) -> Result<Option<Arc<IndividualNode>>, GedcomError> {
        match self.backend.resolve_xref(xref)? {
            Some((NodeKind::Individual, id)) => self.backend.individual(id),
            _ => Ok(None),
        }
    }

    /// Looks a family up by xref.
    pub fn family_by_xref(&self, xref: &str) -> Result<Option<Arc<FamilyNode>>, GedcomError> {
        match self.backend.resolve_xref(xref)? {
            Some((NodeKind::Family, id)) => self.backend.family(id),
            _ => Ok(None),
        }
    }

    /// Like [`individual_by_xref`](Self::individual_by_xref), but absence
    /// is a typed [`GedcomError::NotFound`].
    pub fn require_individual(&self, xref: &str) -> Result<Arc<IndividualNode>, GedcomError> {
        self.individual_by_xref(xref)?
            .ok_or_else(|| GedcomError::NotFound(xref.to_string()))
    }

    /// Like [`family_by_xref`](Self::family_by_xref), but absence is a
    /// typed [`GedcomError::NotFound`].
    pub fn require_family(&self, xref: &str) -> Result<Arc<FamilyNode>, GedcomError> {
        self.family_by_xref(xref)?
            .ok_or_else(|| GedcomError::NotFound(xref.to_string()))
    }

    /// Translates an xref to its node kind and internal id.
    pub fn resolve_xref(&self, xref: &str) -> Result<Option<(NodeKind, InternalId)>, GedcomError> {
        self.backend.resolve_xref(xref)
    }

    /// Translates an internal id back to its xref.
    pub fn xref_of(&self, id: InternalId) -> Result<Option<String>, GedcomError> {
        self.backend.xref_of(id)
    }

    /// Every individual id, ascending (== file order).
    pub fn individual_ids(&self) -> Result<Vec<InternalId>, GedcomError> {
        self.backend.individual_ids()
    }

    /// Every family id, ascending.
    pub fn family_ids(&self) -> Result<Vec<InternalId>, GedcomError> {
        self.backend.family_ids()
    }

    /// Number of individual nodes.
    #[must_use]
    pub fn individual_count(&self) -> usize {
        self.individual_count
    }

    /// Number of family nodes.
    #[must_use]
    pub fn family_count(&self) -> usize {
        self.family_count
    }

    /// Monotonic mutation counter; caches key their entries against it.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn indexes(&self) -> &IndividualIndexes {
        &self.indexes
    }

    /// Adds a new, edge-less individual node. Wire it up afterwards with
    /// [`add_family_edge`](Self::add_family_edge).
    ///
    /// # Errors
    ///
    /// Returns `GedcomError::InvariantViolation` when the xref is already
    /// registered.
    pub fn add_individual(
        &mut self,
        record: &crate::types::individual::IndividualRecord,
    ) -> Result<InternalId, GedcomError> {
        if self.backend.resolve_xref(&record.xref)?.is_some() {
            return Err(GedcomError::InvariantViolation(format!(
                "Node {} registered twice",
                record.xref
            )));
        }
        let id = self.backend.next_id()?;
        let node = build::scratch_individual(id, record);
        self.indexes.insert(&node);
        self.backend
            .insert_node(NodeSlot::Individual(Arc::new(node)))?;
        self.individual_count += 1;
        self.generation.fetch_add(1, Ordering::Release);
        Ok(id)
    }

    /// Adds a new, empty family node.
    ///
    /// # Errors
    ///
    /// Returns `GedcomError::InvariantViolation` when the xref is already
    /// registered.
    pub fn add_family(&mut self, xref: &str) -> Result<InternalId, GedcomError> {
        if self.backend.resolve_xref(xref)?.is_some() {
            return Err(GedcomError::InvariantViolation(format!(
                "Node {xref} registered twice"
            )));
        }
        let id = self.backend.next_id()?;
        self.backend.insert_node(NodeSlot::Family(Arc::new(FamilyNode {
            id,
            xref: xref.to_string(),
            husband: None,
            wife: None,
            children: Vec::new(),
            marriage_year: None,
            marriage_place: None,
        })))?;
        self.family_count += 1;
        self.generation.fetch_add(1, Ordering::Release);
        Ok(id)
    }

    /// Wires one family edge (`Husb`, `Wife`, or `Chil`) and restores the
    /// derived state it touches: reciprocal FAMS/FAMC lists, the parent
    /// caches of the family's children, and spouse/children flags.
    ///
    /// # Errors
    ///
    /// `GedcomError::NotFound` when either xref is unknown;
    /// `GedcomError::InvariantViolation` when the edge would give the
    /// family a second husband or wife, or `kind` is not a family edge.
    pub fn add_family_edge(
        &mut self,
        family_xref: &str,
        kind: EdgeKind,
        individual_xref: &str,
    ) -> Result<(), GedcomError> {
        let family = self.require_family(family_xref)?;
        let individual = self.require_individual(individual_xref)?;

        let mut family = family.as_ref().clone();
        let mut touched: Vec<IndividualNode> = Vec::new();
        let mut member = individual.as_ref().clone();

        match kind {
            EdgeKind::Husb | EdgeKind::Wife => {
                let slot = if kind == EdgeKind::Husb {
                    &mut family.husband
                } else {
                    &mut family.wife
                };
                if slot.is_some() {
                    return Err(GedcomError::InvariantViolation(format!(
                        "Family {family_xref} already has a {kind} edge"
                    )));
                }
                *slot = Some(member.id);
                if !member.fams.contains(&family.id) {
                    member.fams.push(family.id);
                }
            }
            EdgeKind::Chil => {
                if !family.children.contains(&member.id) {
                    family.children.push(member.id);
                }
                if !member.famc.contains(&family.id) {
                    member.famc.push(family.id);
                }
            }
            other => {
                return Err(GedcomError::InvariantViolation(format!(
                    "{other} is not a family edge"
                )));
            }
        }
        touched.push(member);

        // Derived state: parents of the family's children, and flags of
        // both spouses.
        for &child_id in &family.children {
            if touched.iter().any(|n| n.id == child_id) {
                continue;
            }
            if let Some(child) = self.backend.individual(child_id)? {
                touched.push(child.as_ref().clone());
            }
        }
        for spouse_id in family.spouses() {
            if touched.iter().any(|n| n.id == spouse_id) {
                continue;
            }
            if let Some(spouse) = self.backend.individual(spouse_id)? {
                touched.push(spouse.as_ref().clone());
            }
        }

        self.backend
            .replace_node(NodeSlot::Family(Arc::new(family.clone())))?;

        for mut node in touched {
            self.refresh_derived(&mut node, &family)?;
            self.backend
                .replace_node(NodeSlot::Individual(Arc::new(node)))?;
        }

        self.rebuild_indexes()?;
        self.generation.fetch_add(1, Ordering::Release);
        Ok(())
    }

    /// Recomputes the parent cache and flags of one individual. `updated`
    /// is the family just rewritten, whose backend copy may be stale.
    fn refresh_derived(
        &self,
        node: &mut IndividualNode,
        updated: &FamilyNode,
    ) -> Result<(), GedcomError> {
        let fetch_family = |id: InternalId| -> Result<Option<Arc<FamilyNode>>, GedcomError> {
            if id == updated.id {
                Ok(Some(Arc::new(updated.clone())))
            } else {
                self.backend.family(id)
            }
        };

        let mut parents: Vec<InternalId> = Vec::with_capacity(2);
        for &family_id in &node.famc {
            if let Some(family) = fetch_family(family_id)? {
                for parent in family.spouses() {
                    if !parents.contains(&parent) {
                        parents.push(parent);
                    }
                }
            }
        }
        node.parents = parents;

        let mut has_spouse = false;
        let mut has_children = false;
        for &family_id in &node.fams {
            if let Some(family) = fetch_family(family_id)? {
                if family.spouse_of(node.id).is_some() {
                    has_spouse = true;
                }
                if !family.children.is_empty() {
                    has_children = true;
                }
            }
        }
        node.has_spouse = has_spouse;
        node.has_children = has_children;
        Ok(())
    }

    /// Rebuilds the secondary indexes from backend state. Mutations are
    /// rare next to queries; a full rebuild keeps them trivially correct.
    fn rebuild_indexes(&mut self) -> Result<(), GedcomError> {
        let mut indexes = IndividualIndexes::default();
        for id in self.backend.individual_ids()? {
            if let Some(node) = self.backend.individual(id)? {
                indexes.insert(&node);
            }
        }
        self.indexes = indexes;
        Ok(())
    }
}
