//! Secondary indexes over individual nodes.
//!
//! Candidate lists hold internal ids in ascending order (ids are assigned
//! in file order and inserted in that order), so set intersections in the
//! filter engine run as linear merges.

use crate::graph::node::{IndividualNode, InternalId};
use crate::types::individual::gender::Sex;
use crate::types::place;
use std::collections::{BTreeMap, HashMap};

/// Index keys derived from an individual at build time.
#[derive(Debug, Default)]
pub(crate) struct IndividualIndexes {
    /// Lowercased full name → ids.
    pub by_name_lower: HashMap<String, Vec<InternalId>>,
    /// Lowercased surname → ids.
    pub by_surname: HashMap<String, Vec<InternalId>>,
    /// Parsed birth year → ids; BTreeMap supports range scans.
    pub by_birth_year: BTreeMap<i32, Vec<InternalId>>,
    /// Birth place token → ids.
    pub by_place_token: HashMap<String, Vec<InternalId>>,
    /// Sex → ids.
    pub by_sex: HashMap<Sex, Vec<InternalId>>,
    pub has_children: Vec<InternalId>,
    pub has_spouse: Vec<InternalId>,
    pub living: Vec<InternalId>,
    pub deceased: Vec<InternalId>,
}

impl IndividualIndexes {
    /// Registers one node under every applicable key.
    pub(crate) fn insert(&mut self, node: &IndividualNode) {
        if !node.name_lower.is_empty() {
            self.by_name_lower
                .entry(node.name_lower.clone())
                .or_default()
                .push(node.id);
        }
        if let Some(surname) = &node.surname {
            self.by_surname
                .entry(surname.to_lowercase())
                .or_default()
                .push(node.id);
        }
        if let Some(year) = node.birth_year {
            self.by_birth_year.entry(year).or_default().push(node.id);
        }
        if let Some(token) = node.birth_place.as_deref().and_then(place::primary_token) {
            self.by_place_token.entry(token).or_default().push(node.id);
        }
        self.by_sex.entry(node.sex).or_default().push(node.id);
        if node.has_children {
            self.has_children.push(node.id);
        }
        if node.has_spouse {
            self.has_spouse.push(node.id);
        }
        if node.living {
            self.living.push(node.id);
        } else {
            self.deceased.push(node.id);
        }
    }

    /// Ids with birth year within `[low, high]`, ascending.
    pub(crate) fn birth_year_range(&self, low: i32, high: i32) -> Vec<InternalId> {
        let mut out: Vec<InternalId> = self
            .by_birth_year
            .range(low..=high)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        out.sort_unstable();
        out
    }
}
