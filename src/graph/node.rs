//! Graph node and edge types.
//!
//! Nodes carry their own small-integer identifier so hot paths read it
//! without touching the translation table or taking a lock. Individual
//! nodes own their per-kind edge lists and the precomputed parent cache;
//! family nodes own direct husband/wife slots and the ordered child list.

use crate::types::individual::gender::Sex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal node identifier, assigned in file order at build time.
pub type InternalId = u32;

/// The node kinds of the relationship graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// An `INDI` record.
    Individual,
    /// A `FAM` record.
    Family,
    /// A `NOTE` record.
    Note,
    /// A `SOUR` record.
    Source,
    /// A `REPO` record.
    Repository,
    /// An event structure promoted to a node.
    Event,
}

impl NodeKind {
    /// Stable single-byte code used in storage keys.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            NodeKind::Individual => 0,
            NodeKind::Family => 1,
            NodeKind::Note => 2,
            NodeKind::Source => 3,
            NodeKind::Repository => 4,
            NodeKind::Event => 5,
        }
    }

    /// Inverse of [`code`](Self::code).
    #[must_use]
    pub const fn from_code(code: u8) -> Option<NodeKind> {
        match code {
            0 => Some(NodeKind::Individual),
            1 => Some(NodeKind::Family),
            2 => Some(NodeKind::Note),
            3 => Some(NodeKind::Source),
            4 => Some(NodeKind::Repository),
            5 => Some(NodeKind::Event),
            _ => None,
        }
    }

    /// Short label used in the relational store's `type` column.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Individual => "INDI",
            NodeKind::Family => "FAM",
            NodeKind::Note => "NOTE",
            NodeKind::Source => "SOUR",
            NodeKind::Repository => "REPO",
            NodeKind::Event => "EVEN",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Edge kinds over Individual↔Family, plus auxiliary edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Individual is a child of the family.
    Famc,
    /// Individual is a spouse in the family.
    Fams,
    /// Family's husband slot.
    Husb,
    /// Family's wife slot.
    Wife,
    /// Family's ordered child edge.
    Chil,
    /// Reference to a note record.
    Note,
    /// Reference to a source record.
    Source,
    /// Reference to an event node.
    Event,
}

impl EdgeKind {
    /// Stable single-byte code used in storage keys.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            EdgeKind::Famc => 0,
            EdgeKind::Fams => 1,
            EdgeKind::Husb => 2,
            EdgeKind::Wife => 3,
            EdgeKind::Chil => 4,
            EdgeKind::Note => 5,
            EdgeKind::Source => 6,
            EdgeKind::Event => 7,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EdgeKind::Famc => "FAMC",
            EdgeKind::Fams => "FAMS",
            EdgeKind::Husb => "HUSB",
            EdgeKind::Wife => "WIFE",
            EdgeKind::Chil => "CHIL",
            EdgeKind::Note => "NOTE",
            EdgeKind::Source => "SOUR",
            EdgeKind::Event => "EVEN",
        };
        write!(f, "{label}")
    }
}

/// An individual projected into the graph, with denormalized fields the
/// query engine and duplicate detector read on hot paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndividualNode {
    /// Internal identifier, stored on the node for lock-free access.
    pub id: InternalId,
    /// Stable cross-reference identifier.
    pub xref: String,
    /// Full name with slashes stripped.
    pub name: Option<String>,
    /// Lowercased full name (empty when unnamed); index key.
    pub name_lower: String,
    /// Given-name portion.
    pub given: Option<String>,
    /// Surname portion.
    pub surname: Option<String>,
    /// Sex per the record.
    pub sex: Sex,
    /// Representative birth year.
    pub birth_year: Option<i32>,
    /// Resolved birth-year range for imprecise dates.
    pub birth_year_range: Option<(i32, i32)>,
    /// Birth month, when the date carries one.
    pub birth_month: Option<u8>,
    /// Birth day of month, when the date carries one.
    pub birth_day: Option<u8>,
    /// Birth place as written.
    pub birth_place: Option<String>,
    /// Representative death year.
    pub death_year: Option<i32>,
    /// Families this individual is a child of, in FAMC order.
    pub famc: Vec<InternalId>,
    /// Families this individual is a spouse in, in FAMS order.
    pub fams: Vec<InternalId>,
    /// Precomputed parents: father-before-mother within a family,
    /// families in FAMC order, deduplicated, first-seen order kept.
    pub parents: Vec<InternalId>,
    /// Auxiliary note-record references.
    pub notes: Vec<InternalId>,
    /// Auxiliary source-record references.
    pub sources: Vec<InternalId>,
    /// True when a spouse exists in some family of `fams`.
    pub has_spouse: bool,
    /// True when some family of `fams` has children.
    pub has_children: bool,
    /// True when the record has no death structure.
    pub living: bool,
}

/// A family projected into the graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FamilyNode {
    /// Internal identifier.
    pub id: InternalId,
    /// Stable cross-reference identifier.
    pub xref: String,
    /// At most one husband edge.
    pub husband: Option<InternalId>,
    /// At most one wife edge.
    pub wife: Option<InternalId>,
    /// Ordered child edges.
    pub children: Vec<InternalId>,
    /// Representative marriage year.
    pub marriage_year: Option<i32>,
    /// Marriage place as written.
    pub marriage_place: Option<String>,
}

impl FamilyNode {
    /// Husband-then-wife, nulls omitted.
    #[must_use]
    pub fn spouses(&self) -> impl Iterator<Item = InternalId> + '_ {
        self.husband.into_iter().chain(self.wife)
    }

    /// The other spouse relative to `id`.
    #[must_use]
    pub fn spouse_of(&self, id: InternalId) -> Option<InternalId> {
        if self.husband == Some(id) {
            self.wife
        } else if self.wife == Some(id) {
            self.husband
        } else {
            None
        }
    }
}

/// A node for record kinds the graph carries but does not traverse
/// (notes, sources, repositories).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuxNode {
    /// Internal identifier.
    pub id: InternalId,
    /// Node kind.
    pub kind: NodeKind,
    /// Stable cross-reference identifier.
    pub xref: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_round_trip() {
        for kind in [
            NodeKind::Individual,
            NodeKind::Family,
            NodeKind::Note,
            NodeKind::Source,
            NodeKind::Repository,
            NodeKind::Event,
        ] {
            assert_eq!(NodeKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(NodeKind::from_code(99), None);
    }

    #[test]
    fn test_family_spouse_of() {
        let family = FamilyNode {
            id: 7,
            xref: "@F1@".to_string(),
            husband: Some(1),
            wife: Some(2),
            children: vec![3],
            marriage_year: None,
            marriage_place: None,
        };
        assert_eq!(family.spouse_of(1), Some(2));
        assert_eq!(family.spouse_of(2), Some(1));
        assert_eq!(family.spouse_of(3), None);
        assert_eq!(family.spouses().collect::<Vec<_>>(), vec![1, 2]);
    }
}
