//! Projects a [`Tree`] into graph nodes, edges, caches, and indexes.
//!
//! Internal ids are assigned in file order across record kinds, so every
//! documented tie-break on "smallest internal id" equals first-seen file
//! order. Dangling references are logged and skipped; structural
//! impossibilities (duplicate registration) abort the build with
//! [`GedcomError::InvariantViolation`].

use crate::graph::index::IndividualIndexes;
use crate::graph::node::{AuxNode, FamilyNode, IndividualNode, InternalId, NodeKind};
use crate::tree::Tree;
use crate::types::individual::IndividualRecord;
use crate::types::RecordKind;
use crate::GedcomError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a backend needs to serve a freshly built graph.
pub(crate) struct BuiltGraph {
    /// Node slots indexed by internal id.
    pub slots: Vec<NodeSlot>,
    /// xref → (kind, id); the id → xref direction lives on the nodes.
    pub xref_to_id: HashMap<String, (NodeKind, InternalId)>,
    pub indexes: IndividualIndexes,
    pub individual_count: usize,
    pub family_count: usize,
}

/// A node of any kind, stored at its internal id.
#[derive(Clone, Debug)]
pub(crate) enum NodeSlot {
    Individual(Arc<IndividualNode>),
    Family(Arc<FamilyNode>),
    Aux(Arc<AuxNode>),
}

impl NodeSlot {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            NodeSlot::Individual(_) => NodeKind::Individual,
            NodeSlot::Family(_) => NodeKind::Family,
            NodeSlot::Aux(aux) => aux.kind,
        }
    }

    pub(crate) fn xref(&self) -> &str {
        match self {
            NodeSlot::Individual(node) => &node.xref,
            NodeSlot::Family(node) => &node.xref,
            NodeSlot::Aux(node) => &node.xref,
        }
    }
}

/// Builds nodes, edges, the parent cache, and secondary indexes.
///
/// # Errors
///
/// Returns [`GedcomError::InvariantViolation`] when the same xref would
/// register twice (the tree normally prevents this), and
/// [`GedcomError::InvalidFormat`] for a tree whose verdict is rejected.
pub(crate) fn build_nodes(tree: &Tree) -> Result<BuiltGraph, GedcomError> {
    if tree.verdict(false) == crate::tree::Verdict::Rejected {
        return Err(GedcomError::InvalidFormat(
            "Cannot build a graph from a rejected tree".to_string(),
        ));
    }

    let mut xref_to_id: HashMap<String, (NodeKind, InternalId)> = HashMap::new();
    let mut slots: Vec<NodeSlot> = Vec::with_capacity(tree.total_records());

    // Pass 1: allocate ids for every node in file order. Individuals are
    // materialized in a scratch form first; edges arrive in pass 2.
    let mut individuals: Vec<IndividualNode> = Vec::new();
    let mut families: Vec<FamilyNode> = Vec::new();
    let mut slot_of_id: Vec<(NodeKind, usize)> = Vec::new(); // id -> (kind, per-kind index)

    for (kind, xref) in tree.record_order() {
        let node_kind = match kind {
            RecordKind::Individual => NodeKind::Individual,
            RecordKind::Family => NodeKind::Family,
            RecordKind::Note => NodeKind::Note,
            RecordKind::Source => NodeKind::Source,
            RecordKind::Repository => NodeKind::Repository,
            // Submitters and multimedia stay out of the graph.
            _ => continue,
        };

        let id = slot_of_id.len() as InternalId;
        if xref_to_id.insert(xref.clone(), (node_kind, id)).is_some() {
            return Err(GedcomError::InvariantViolation(format!(
                "Node {xref} registered twice during build"
            )));
        }

        match node_kind {
            NodeKind::Individual => {
                let record = tree
                    .individual(xref)
                    .ok_or_else(|| GedcomError::InvariantViolation(format!(
                        "Record order names missing individual {xref}"
                    )))?;
                slot_of_id.push((node_kind, individuals.len()));
                individuals.push(scratch_individual(id, record));
            }
            NodeKind::Family => {
                slot_of_id.push((node_kind, families.len()));
                families.push(FamilyNode {
                    id,
                    xref: xref.clone(),
                    husband: None,
                    wife: None,
                    children: Vec::new(),
                    marriage_year: None,
                    marriage_place: None,
                });
            }
            _ => {
                slot_of_id.push((node_kind, 0));
                slots.push(NodeSlot::Aux(Arc::new(AuxNode {
                    id,
                    kind: node_kind,
                    xref: xref.clone(),
                })));
                // Placeholder; aux slots are re-laid-out below.
            }
        }
    }

    // Aux slots were pushed eagerly; pull them into an id-addressed map.
    let mut aux_by_id: HashMap<InternalId, NodeSlot> = slots
        .drain(..)
        .map(|slot| {
            let id = match &slot {
                NodeSlot::Aux(aux) => aux.id,
                _ => unreachable!(),
            };
            (id, slot)
        })
        .collect();

    let resolve_individual = |xref_to_id: &HashMap<String, (NodeKind, InternalId)>,
                              xref: &str|
     -> Option<InternalId> {
        match xref_to_id.get(xref) {
            Some((NodeKind::Individual, id)) => Some(*id),
            _ => None,
        }
    };
    let resolve_family = |xref_to_id: &HashMap<String, (NodeKind, InternalId)>,
                          xref: &str|
     -> Option<InternalId> {
        match xref_to_id.get(xref) {
            Some((NodeKind::Family, id)) => Some(*id),
            _ => None,
        }
    };

    // Pass 2a: the individual's own FAMC/FAMS tag order seeds its edge
    // lists.
    let mut individual_index_of_id: HashMap<InternalId, usize> = HashMap::new();
    for (index, node) in individuals.iter().enumerate() {
        individual_index_of_id.insert(node.id, index);
    }
    let mut family_index_of_id: HashMap<InternalId, usize> = HashMap::new();
    for (index, node) in families.iter().enumerate() {
        family_index_of_id.insert(node.id, index);
    }

    for node in &mut individuals {
        let record = tree
            .individual(&node.xref)
            .expect("individual records are stable during build");
        for famc in &record.famc {
            match resolve_family(&xref_to_id, famc) {
                Some(family_id) => node.famc.push(family_id),
                None => warn!(individual = %node.xref, family = %famc, "FAMC does not resolve; edge skipped"),
            }
        }
        for fams in &record.fams {
            match resolve_family(&xref_to_id, fams) {
                Some(family_id) => node.fams.push(family_id),
                None => warn!(individual = %node.xref, family = %fams, "FAMS does not resolve; edge skipped"),
            }
        }
        for note_line in record.line.children_tagged("NOTE") {
            if let Some((NodeKind::Note, id)) = xref_to_id.get(note_line.value.as_str()) {
                node.notes.push(*id);
            }
        }
        for source_line in record.line.children_tagged("SOUR") {
            if let Some((NodeKind::Source, id)) = xref_to_id.get(source_line.value.as_str()) {
                node.sources.push(*id);
            }
        }
    }

    // Pass 2b: family slots and reciprocal edges. A family-side edge the
    // individual's own tags missed is appended, so the reciprocity
    // invariants hold even for non-reciprocal input.
    for family_index in 0..families.len() {
        let record = tree
            .family(&families[family_index].xref)
            .expect("family records are stable during build");

        if let Some(husband_xref) = &record.husband {
            match resolve_individual(&xref_to_id, husband_xref) {
                Some(id) => {
                    families[family_index].husband = Some(id);
                    let family_id = families[family_index].id;
                    if let Some(&i) = individual_index_of_id.get(&id) {
                        if !individuals[i].fams.contains(&family_id) {
                            individuals[i].fams.push(family_id);
                        }
                    }
                }
                None => warn!(family = %families[family_index].xref, husband = %husband_xref, "HUSB does not resolve; edge skipped"),
            }
        }
        if let Some(wife_xref) = &record.wife {
            match resolve_individual(&xref_to_id, wife_xref) {
                Some(id) => {
                    families[family_index].wife = Some(id);
                    let family_id = families[family_index].id;
                    if let Some(&i) = individual_index_of_id.get(&id) {
                        if !individuals[i].fams.contains(&family_id) {
                            individuals[i].fams.push(family_id);
                        }
                    }
                }
                None => warn!(family = %families[family_index].xref, wife = %wife_xref, "WIFE does not resolve; edge skipped"),
            }
        }
        for child_xref in &record.children {
            match resolve_individual(&xref_to_id, child_xref) {
                Some(id) => {
                    families[family_index].children.push(id);
                    let family_id = families[family_index].id;
                    if let Some(&i) = individual_index_of_id.get(&id) {
                        if !individuals[i].famc.contains(&family_id) {
                            individuals[i].famc.push(family_id);
                        }
                    }
                }
                None => warn!(family = %families[family_index].xref, child = %child_xref, "CHIL does not resolve; edge skipped"),
            }
        }

        families[family_index].marriage_year =
            record.marriage.as_ref().and_then(|m| m.year());
        families[family_index].marriage_place = record
            .marriage
            .as_ref()
            .and_then(|m| m.place.clone());
    }

    // Pass 3: parent cache and flags. Father before mother within a
    // family, families in FAMC order, dedup by identity.
    for node in &mut individuals {
        let mut parents: Vec<InternalId> = Vec::with_capacity(2);
        for &family_id in &node.famc {
            let family = &families[family_index_of_id[&family_id]];
            for parent in family.spouses() {
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
            }
        }
        node.parents = parents;

        let mut has_spouse = false;
        let mut has_children = false;
        for &family_id in &node.fams {
            let family = &families[family_index_of_id[&family_id]];
            if family.spouse_of(node.id).is_some() {
                has_spouse = true;
            }
            if !family.children.is_empty() {
                has_children = true;
            }
        }
        node.has_spouse = has_spouse;
        node.has_children = has_children;
    }

    // Pass 4: secondary indexes.
    let mut indexes = IndividualIndexes::default();
    for node in &individuals {
        indexes.insert(node);
    }

    // Final layout: dense slot vector addressed by internal id.
    let total = slot_of_id.len();
    let individual_count = individuals.len();
    let family_count = families.len();
    let mut final_slots: Vec<Option<NodeSlot>> = (0..total).map(|_| None).collect();
    for node in individuals {
        let id = node.id as usize;
        final_slots[id] = Some(NodeSlot::Individual(Arc::new(node)));
    }
    for node in families {
        let id = node.id as usize;
        final_slots[id] = Some(NodeSlot::Family(Arc::new(node)));
    }
    for (id, slot) in aux_by_id.drain() {
        final_slots[id as usize] = Some(slot);
    }

    let slots: Vec<NodeSlot> = final_slots
        .into_iter()
        .map(|slot| slot.expect("every allocated id has a node"))
        .collect();

    debug!(
        individuals = individual_count,
        families = family_count,
        nodes = slots.len(),
        "graph build complete"
    );

    Ok(BuiltGraph {
        slots,
        xref_to_id,
        indexes,
        individual_count,
        family_count,
    })
}

/// An individual node before edges and caches are wired.
pub(crate) fn scratch_individual(id: InternalId, record: &IndividualRecord) -> IndividualNode {
    let name = record.full_name();
    let name_lower = name.as_deref().map(str::to_lowercase).unwrap_or_default();
    let birth_date = record.birth.as_ref().and_then(|b| b.date.as_ref());

    IndividualNode {
        id,
        xref: record.xref.clone(),
        given: record.given_name().map(str::to_string),
        surname: record.surname().map(str::to_string),
        sex: record.sex,
        birth_year: birth_date.and_then(crate::types::date::DateValue::year),
        birth_year_range: birth_date.and_then(crate::types::date::DateValue::year_range),
        birth_month: birth_date.and_then(crate::types::date::DateValue::month),
        birth_day: birth_date.and_then(crate::types::date::DateValue::day),
        birth_place: record.birth.as_ref().and_then(|b| b.place.clone()),
        death_year: record
            .death
            .as_ref()
            .and_then(crate::types::event::EventDetail::year),
        famc: Vec::new(),
        fams: Vec::new(),
        parents: Vec::new(),
        notes: Vec::new(),
        sources: Vec::new(),
        has_spouse: false,
        has_children: false,
        living: record.is_living(),
        name,
        name_lower,
    }
}

/// Union-find over spouse and parent-child edges; used to persist the
/// `components` table of the hybrid backend.
pub(crate) fn connected_components(built: &BuiltGraph) -> HashMap<InternalId, u32> {
    struct Dsu {
        parent: Vec<u32>,
    }
    impl Dsu {
        fn find(&mut self, x: u32) -> u32 {
            let mut root = x;
            while self.parent[root as usize] != root {
                root = self.parent[root as usize];
            }
            let mut current = x;
            while self.parent[current as usize] != root {
                let next = self.parent[current as usize];
                self.parent[current as usize] = root;
                current = next;
            }
            root
        }
        fn union(&mut self, a: u32, b: u32) {
            let ra = self.find(a);
            let rb = self.find(b);
            if ra != rb {
                self.parent[rb as usize] = ra;
            }
        }
    }

    let n = built.slots.len() as u32;
    let mut dsu = Dsu {
        parent: (0..n).collect(),
    };

    for slot in &built.slots {
        if let NodeSlot::Family(family) = slot {
            let members: Vec<InternalId> =
                family.spouses().chain(family.children.iter().copied()).collect();
            for window in members.windows(2) {
                dsu.union(window[0], window[1]);
            }
        }
    }

    let mut components = HashMap::new();
    let mut label_of_root: HashMap<u32, u32> = HashMap::new();
    let mut next_label = 0;
    for slot in &built.slots {
        if let NodeSlot::Individual(node) = slot {
            let root = dsu.find(node.id);
            let label = *label_of_root.entry(root).or_insert_with(|| {
                let label = next_label;
                next_label += 1;
                label
            });
            components.insert(node.id, label);
        }
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gedcom;

    fn built(source: &str) -> BuiltGraph {
        let tree = Gedcom::parse_str(source).unwrap();
        build_nodes(&tree).unwrap()
    }

    const FAMILY: &str = "\
        0 HEAD\n\
        0 @I1@ INDI\n\
        1 NAME John /Doe/\n\
        1 SEX M\n\
        1 FAMS @F1@\n\
        0 @I2@ INDI\n\
        1 NAME Mary /Doe/\n\
        1 SEX F\n\
        1 FAMS @F1@\n\
        0 @I3@ INDI\n\
        1 NAME Jim /Doe/\n\
        1 FAMC @F1@\n\
        0 @F1@ FAM\n\
        1 HUSB @I1@\n\
        1 WIFE @I2@\n\
        1 CHIL @I3@\n\
        0 TRLR";

    fn individual<'a>(built: &'a BuiltGraph, xref: &str) -> &'a IndividualNode {
        let (_, id) = built.xref_to_id[xref];
        match &built.slots[id as usize] {
            NodeSlot::Individual(node) => node,
            _ => panic!("{xref} is not an individual"),
        }
    }

    #[test]
    fn test_ids_follow_file_order() {
        let built = built(FAMILY);
        assert_eq!(built.xref_to_id["@I1@"].1, 0);
        assert_eq!(built.xref_to_id["@I2@"].1, 1);
        assert_eq!(built.xref_to_id["@I3@"].1, 2);
        assert_eq!(built.xref_to_id["@F1@"].1, 3);
    }

    #[test]
    fn test_reciprocal_edges_and_slots() {
        let built = built(FAMILY);
        let family = match &built.slots[3] {
            NodeSlot::Family(node) => node.clone(),
            _ => panic!(),
        };
        assert_eq!(family.husband, Some(0));
        assert_eq!(family.wife, Some(1));
        assert_eq!(family.children, vec![2]);

        assert_eq!(individual(&built, "@I1@").fams, vec![3]);
        assert_eq!(individual(&built, "@I3@").famc, vec![3]);
    }

    #[test]
    fn test_parent_cache_order() {
        let built = built(FAMILY);
        assert_eq!(individual(&built, "@I3@").parents, vec![0, 1]);
    }

    #[test]
    fn test_flags() {
        let built = built(FAMILY);
        assert!(individual(&built, "@I1@").has_spouse);
        assert!(individual(&built, "@I1@").has_children);
        assert!(!individual(&built, "@I3@").has_spouse);
        assert!(individual(&built, "@I1@").living);
    }

    #[test]
    fn test_family_side_edges_fill_missing_backlinks() {
        // @I1@ lacks the FAMS tag; the family's HUSB edge supplies it.
        let source = "\
            0 HEAD\n\
            0 @I1@ INDI\n\
            0 @F1@ FAM\n\
            1 HUSB @I1@\n\
            0 TRLR";
        let built = built(source);
        assert_eq!(individual(&built, "@I1@").fams, vec![1]);
    }

    #[test]
    fn test_dangling_reference_skipped() {
        let source = "\
            0 HEAD\n\
            0 @F1@ FAM\n\
            1 HUSB @I404@\n\
            0 TRLR";
        let built = built(source);
        let family = match &built.slots[0] {
            NodeSlot::Family(node) => node,
            _ => panic!(),
        };
        assert_eq!(family.husband, None);
    }

    #[test]
    fn test_connected_components() {
        let source = "\
            0 HEAD\n\
            0 @I1@ INDI\n\
            1 FAMS @F1@\n\
            0 @I2@ INDI\n\
            1 FAMS @F1@\n\
            0 @I3@ INDI\n\
            0 @F1@ FAM\n\
            1 HUSB @I1@\n\
            1 WIFE @I2@\n\
            0 TRLR";
        let built = built(source);
        let components = connected_components(&built);
        assert_eq!(components[&0], components[&1]);
        assert_ne!(components[&0], components[&2]);
    }
}
