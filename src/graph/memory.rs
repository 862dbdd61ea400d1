//! The in-memory graph backend.
//!
//! Owns all nodes directly. A single reader-writer lock protects the
//! translation table and the slot vector: queries take shared locks,
//! build and incremental updates take the exclusive lock.

use crate::graph::backend::GraphBackend;
use crate::graph::build::{BuiltGraph, NodeSlot};
use crate::graph::node::{FamilyNode, IndividualNode, InternalId, NodeKind};
use crate::GedcomError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) struct MemoryBackend {
    inner: RwLock<Inner>,
}

struct Inner {
    slots: Vec<NodeSlot>,
    xref_to_id: HashMap<String, (NodeKind, InternalId)>,
}

impl MemoryBackend {
    pub(crate) fn new(built: &BuiltGraph) -> Self {
        Self {
            inner: RwLock::new(Inner {
                slots: built.slots.clone(),
                xref_to_id: built.xref_to_id.clone(),
            }),
        }
    }
}

impl GraphBackend for MemoryBackend {
    fn individual(&self, id: InternalId) -> Result<Option<Arc<IndividualNode>>, GedcomError> {
        let inner = self.inner.read();
        Ok(match inner.slots.get(id as usize) {
            Some(NodeSlot::Individual(node)) => Some(Arc::clone(node)),
            _ => None,
        })
    }

    fn family(&self, id: InternalId) -> Result<Option<Arc<FamilyNode>>, GedcomError> {
        let inner = self.inner.read();
        Ok(match inner.slots.get(id as usize) {
            Some(NodeSlot::Family(node)) => Some(Arc::clone(node)),
            _ => None,
        })
    }

    fn resolve_xref(&self, xref: &str) -> Result<Option<(NodeKind, InternalId)>, GedcomError> {
        Ok(self.inner.read().xref_to_id.get(xref).copied())
    }

    fn xref_of(&self, id: InternalId) -> Result<Option<String>, GedcomError> {
        let inner = self.inner.read();
        Ok(inner
            .slots
            .get(id as usize)
            .map(|slot| slot.xref().to_string()))
    }

    fn individual_ids(&self) -> Result<Vec<InternalId>, GedcomError> {
        let inner = self.inner.read();
        Ok(inner
            .slots
            .iter()
            .filter_map(|slot| match slot {
                NodeSlot::Individual(node) => Some(node.id),
                _ => None,
            })
            .collect())
    }

    fn family_ids(&self) -> Result<Vec<InternalId>, GedcomError> {
        let inner = self.inner.read();
        Ok(inner
            .slots
            .iter()
            .filter_map(|slot| match slot {
                NodeSlot::Family(node) => Some(node.id),
                _ => None,
            })
            .collect())
    }

    fn next_id(&self) -> Result<InternalId, GedcomError> {
        Ok(self.inner.read().slots.len() as InternalId)
    }

    fn insert_node(&self, slot: NodeSlot) -> Result<(), GedcomError> {
        let mut inner = self.inner.write();
        let expected = inner.slots.len() as InternalId;
        let id = match &slot {
            NodeSlot::Individual(node) => node.id,
            NodeSlot::Family(node) => node.id,
            NodeSlot::Aux(node) => node.id,
        };
        if id != expected {
            return Err(GedcomError::InvariantViolation(format!(
                "Inserted node id {id} does not match next id {expected}"
            )));
        }
        let xref = slot.xref().to_string();
        if inner.xref_to_id.contains_key(&xref) {
            return Err(GedcomError::InvariantViolation(format!(
                "Node {xref} registered twice"
            )));
        }
        inner.xref_to_id.insert(xref, (slot.kind(), id));
        inner.slots.push(slot);
        Ok(())
    }

    fn replace_node(&self, slot: NodeSlot) -> Result<(), GedcomError> {
        let mut inner = self.inner.write();
        let id = match &slot {
            NodeSlot::Individual(node) => node.id,
            NodeSlot::Family(node) => node.id,
            NodeSlot::Aux(node) => node.id,
        };
        match inner.slots.get_mut(id as usize) {
            Some(existing) if existing.kind() == slot.kind() => {
                *existing = slot;
                Ok(())
            }
            Some(_) => Err(GedcomError::InvariantViolation(format!(
                "Replacement for node {id} changes its kind"
            ))),
            None => Err(GedcomError::NotFound(format!("node id {id}"))),
        }
    }
}
