//! Field-level similarity measures between two people.
//!
//! [`PersonFacts`] is the comparison view shared by the duplicate
//! detector (over graph nodes) and the diff engine's content matcher
//! (over records from two different trees).

use crate::dedup::soundex::soundex;
use crate::graph::node::IndividualNode;
use crate::types::individual::gender::Sex;
use crate::types::individual::IndividualRecord;
use crate::types::place;

/// The comparable facts of one person.
#[derive(Clone, Debug, Default)]
pub(crate) struct PersonFacts {
    /// Lowercased full name; empty when unnamed.
    pub name_lower: String,
    /// Lowercased given name.
    pub given: Option<String>,
    /// Lowercased surname.
    pub surname: Option<String>,
    pub sex: Sex,
    pub birth_year: Option<i32>,
    pub birth_year_range: Option<(i32, i32)>,
    /// Birth place as written.
    pub birth_place: Option<String>,
}

impl From<&IndividualNode> for PersonFacts {
    fn from(node: &IndividualNode) -> Self {
        PersonFacts {
            name_lower: node.name_lower.clone(),
            given: node.given.as_deref().map(str::to_lowercase),
            surname: node.surname.as_deref().map(str::to_lowercase),
            sex: node.sex,
            birth_year: node.birth_year,
            birth_year_range: node.birth_year_range,
            birth_place: node.birth_place.clone(),
        }
    }
}

impl From<&IndividualRecord> for PersonFacts {
    fn from(record: &IndividualRecord) -> Self {
        let birth_date = record.birth.as_ref().and_then(|b| b.date.as_ref());
        PersonFacts {
            name_lower: record
                .full_name()
                .map(|n| n.to_lowercase())
                .unwrap_or_default(),
            given: record.given_name().map(str::to_lowercase),
            surname: record.surname().map(str::to_lowercase),
            sex: record.sex,
            birth_year: birth_date.and_then(crate::types::date::DateValue::year),
            birth_year_range: birth_date.and_then(crate::types::date::DateValue::year_range),
            birth_place: record.birth.as_ref().and_then(|b| b.place.clone()),
        }
    }
}

/// Name similarity: the best of normalized equality, component-wise
/// given/surname agreement, phonetic agreement, and fuzzy edit distance.
pub(crate) fn name_score(a: &PersonFacts, b: &PersonFacts, use_phonetic: bool) -> f64 {
    if a.name_lower.is_empty() || b.name_lower.is_empty() {
        return 0.0;
    }

    let mut best: f64 = if a.name_lower == b.name_lower { 1.0 } else { 0.0 };

    best = best.max(component_score(a, b));

    if use_phonetic {
        best = best.max(phonetic_score(a, b));
    }

    let distance = strsim::levenshtein(&a.name_lower, &b.name_lower);
    let longest = a.name_lower.chars().count().max(b.name_lower.chars().count());
    if longest > 0 {
        best = best.max(1.0 - distance as f64 / longest as f64);
    }

    best.clamp(0.0, 1.0)
}

fn component_score(a: &PersonFacts, b: &PersonFacts) -> f64 {
    let surname_match = match (&a.surname, &b.surname) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    };
    let given_match = match (&a.given, &b.given) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    };
    let initial_match = match (&a.given, &b.given) {
        (Some(x), Some(y)) => x.chars().next().is_some() && x.chars().next() == y.chars().next(),
        _ => false,
    };

    if surname_match && given_match {
        1.0
    } else if surname_match && initial_match {
        0.85
    } else if surname_match {
        0.7
    } else if given_match {
        0.4
    } else {
        0.0
    }
}

fn phonetic_score(a: &PersonFacts, b: &PersonFacts) -> f64 {
    let surname_match = match (
        a.surname.as_deref().and_then(soundex),
        b.surname.as_deref().and_then(soundex),
    ) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    };
    let given_match = match (
        a.given.as_deref().and_then(soundex),
        b.given.as_deref().and_then(soundex),
    ) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    };

    if surname_match && given_match {
        0.9
    } else if surname_match {
        0.75
    } else {
        0.0
    }
}

/// Date similarity. Exact years score by distance; imprecise dates
/// resolve to year ranges and score by overlap, never worse than their
/// centers would.
pub(crate) fn date_score(a: &PersonFacts, b: &PersonFacts) -> f64 {
    let (Some(year_a), Some(year_b)) = (a.birth_year, b.birth_year) else {
        return 0.0;
    };

    let by_distance: f64 = match year_a.abs_diff(year_b) {
        0 => 1.0,
        1 => 0.9,
        2 => 0.8,
        3..=5 => 0.7,
        6..=10 => 0.5,
        _ => 0.0,
    };

    let by_overlap = match (a.birth_year_range, b.birth_year_range) {
        (Some((lo_a, hi_a)), Some((lo_b, hi_b))) if hi_a > lo_a || hi_b > lo_b => {
            let overlap = (hi_a.min(hi_b) - lo_a.max(lo_b) + 1).max(0);
            let union = hi_a.max(hi_b) - lo_a.min(lo_b) + 1;
            if union > 0 {
                f64::from(overlap) / f64::from(union)
            } else {
                0.0
            }
        }
        _ => 0.0,
    };

    by_distance.max(by_overlap)
}

/// Place similarity: exact normalized equality is 1.0; a partial
/// jurisdiction-hierarchy match scores proportionally.
pub(crate) fn place_score(a: &PersonFacts, b: &PersonFacts) -> f64 {
    let (Some(place_a), Some(place_b)) = (&a.birth_place, &b.birth_place) else {
        return 0.0;
    };
    if place::normalize(place_a) == place::normalize(place_b) {
        return 1.0;
    }
    place::hierarchy_overlap(place_a, place_b)
}

/// Sex agreement: matching known values 1.0, conflicting 0.0, and 0.5
/// (neutral) when either side is unknown.
pub(crate) fn sex_score(a: &PersonFacts, b: &PersonFacts) -> f64 {
    match (a.sex, b.sex) {
        (Sex::Unknown, _) | (_, Sex::Unknown) => 0.5,
        (x, y) if x == y => 1.0,
        _ => 0.0,
    }
}
