//! The storage-backend contract behind [`crate::Graph`].
//!
//! Two implementations exist: fully in-memory, and hybrid (redb key-value
//! topology + SQLite metadata). Clients of [`crate::Graph`] never observe
//! which backend is in use; identical results are part of the contract.

use crate::graph::build::NodeSlot;
use crate::graph::node::{FamilyNode, IndividualNode, InternalId, NodeKind};
use crate::GedcomError;
use std::sync::Arc;

/// Uniform node access for graph backends.
pub(crate) trait GraphBackend: Send + Sync {
    /// The individual at `id`, if that id names one.
    fn individual(&self, id: InternalId) -> Result<Option<Arc<IndividualNode>>, GedcomError>;

    /// The family at `id`, if that id names one.
    fn family(&self, id: InternalId) -> Result<Option<Arc<FamilyNode>>, GedcomError>;

    /// Translates an xref to its kind and internal id.
    fn resolve_xref(&self, xref: &str) -> Result<Option<(NodeKind, InternalId)>, GedcomError>;

    /// Translates an internal id back to its xref.
    fn xref_of(&self, id: InternalId) -> Result<Option<String>, GedcomError>;

    /// Every individual id, ascending.
    fn individual_ids(&self) -> Result<Vec<InternalId>, GedcomError>;

    /// Every family id, ascending.
    fn family_ids(&self) -> Result<Vec<InternalId>, GedcomError>;

    /// The id the next inserted node will receive.
    fn next_id(&self) -> Result<InternalId, GedcomError>;

    /// Inserts a new node; its id must equal [`next_id`](Self::next_id).
    fn insert_node(&self, slot: NodeSlot) -> Result<(), GedcomError>;

    /// Replaces an existing node in place (same id, same kind).
    fn replace_node(&self, slot: NodeSlot) -> Result<(), GedcomError>;
}
