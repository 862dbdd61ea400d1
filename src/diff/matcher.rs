//! Record matching across two trees.
//!
//! Three strategies: `Xref` pairs records with identical identifiers
//! (fast, but fails across identifier spaces); `Content` pairs through
//! blocking and similarity scoring (the duplicate detector's machinery,
//! run across trees); `Hybrid` tries xref first and feeds the remainder
//! to content matching. Matching is deterministic for fixed inputs and
//! configuration.

use crate::cancel::{check_opt, CancelToken};
use crate::dedup::blocking::block_keys;
use crate::dedup::similarity::{self, PersonFacts};
use crate::types::individual::IndividualRecord;
use crate::GedcomError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// How records of the two trees are paired.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchingStrategy {
    /// Identical cross-reference identifiers.
    Xref,
    /// Content similarity through blocking + scoring.
    Content,
    /// Xref first, content for the remainder.
    #[default]
    Hybrid,
}

/// Index pairs into the left/right individual slices, plus leftovers.
#[derive(Debug, Default)]
pub(crate) struct IndividualMatches {
    pub pairs: Vec<(usize, usize)>,
    pub left_unmatched: Vec<usize>,
    pub right_unmatched: Vec<usize>,
}

pub(crate) fn match_individuals(
    left: &[IndividualRecord],
    right: &[IndividualRecord],
    strategy: MatchingStrategy,
    similarity_threshold: f64,
    cancel: Option<&CancelToken>,
) -> Result<IndividualMatches, GedcomError> {
    match strategy {
        MatchingStrategy::Xref => Ok(match_by_xref(left, right)),
        MatchingStrategy::Content => {
            let all_left: Vec<usize> = (0..left.len()).collect();
            let all_right: Vec<usize> = (0..right.len()).collect();
            match_by_content(left, right, all_left, all_right, similarity_threshold, cancel)
        }
        MatchingStrategy::Hybrid => {
            let by_xref = match_by_xref(left, right);
            let mut result = match_by_content(
                left,
                right,
                by_xref.left_unmatched,
                by_xref.right_unmatched,
                similarity_threshold,
                cancel,
            )?;
            let mut pairs = by_xref.pairs;
            pairs.append(&mut result.pairs);
            pairs.sort_unstable();
            result.pairs = pairs;
            Ok(result)
        }
    }
}

fn match_by_xref(left: &[IndividualRecord], right: &[IndividualRecord]) -> IndividualMatches {
    let right_by_xref: HashMap<&str, usize> = right
        .iter()
        .enumerate()
        .map(|(index, record)| (record.xref.as_str(), index))
        .collect();

    let mut matches = IndividualMatches::default();
    let mut matched_right: HashSet<usize> = HashSet::new();
    for (left_index, record) in left.iter().enumerate() {
        match right_by_xref.get(record.xref.as_str()) {
            Some(&right_index) => {
                matches.pairs.push((left_index, right_index));
                matched_right.insert(right_index);
            }
            None => matches.left_unmatched.push(left_index),
        }
    }
    matches.right_unmatched = (0..right.len())
        .filter(|index| !matched_right.contains(index))
        .collect();
    matches
}

/// Blocks the unmatched records of both sides together, scores cross-side
/// candidates, and assigns pairs greedily from the best score down.
fn match_by_content(
    left: &[IndividualRecord],
    right: &[IndividualRecord],
    left_candidates: Vec<usize>,
    right_candidates: Vec<usize>,
    similarity_threshold: f64,
    cancel: Option<&CancelToken>,
) -> Result<IndividualMatches, GedcomError> {
    let left_facts: Vec<(usize, PersonFacts)> = left_candidates
        .iter()
        .map(|&index| (index, PersonFacts::from(&left[index])))
        .collect();
    let right_facts: Vec<(usize, PersonFacts)> = right_candidates
        .iter()
        .map(|&index| (index, PersonFacts::from(&right[index])))
        .collect();

    // Right-side records grouped by block key.
    let mut right_by_key: HashMap<String, Vec<usize>> = HashMap::new();
    for (position, (_, facts)) in right_facts.iter().enumerate() {
        for key in block_keys(facts) {
            right_by_key.entry(key).or_default().push(position);
        }
    }

    // Score every cross-side candidate pair once.
    let mut scored: Vec<(f64, usize, usize)> = Vec::new();
    for (left_index, facts) in &left_facts {
        check_opt(cancel)?;
        let mut seen: HashSet<usize> = HashSet::new();
        for key in block_keys(facts) {
            let Some(positions) = right_by_key.get(&key) else {
                continue;
            };
            for &right_position in positions {
                if !seen.insert(right_position) {
                    continue;
                }
                let (right_index, right_person) = &right_facts[right_position];
                let score = content_score(facts, right_person);
                if score >= similarity_threshold {
                    scored.push((score, *left_index, *right_index));
                }
            }
        }
    }

    // Greedy assignment, best score first; ties resolve on indexes so
    // runs are reproducible.
    scored.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    let mut matches = IndividualMatches::default();
    let mut taken_left: HashSet<usize> = HashSet::new();
    let mut taken_right: HashSet<usize> = HashSet::new();
    for (_, left_index, right_index) in scored {
        if taken_left.contains(&left_index) || taken_right.contains(&right_index) {
            continue;
        }
        taken_left.insert(left_index);
        taken_right.insert(right_index);
        matches.pairs.push((left_index, right_index));
    }
    matches.pairs.sort_unstable();

    matches.left_unmatched = left_candidates
        .into_iter()
        .filter(|index| !taken_left.contains(index))
        .collect();
    matches.right_unmatched = right_candidates
        .into_iter()
        .filter(|index| !taken_right.contains(index))
        .collect();
    Ok(matches)
}

/// Similarity used for cross-tree matching: name, date, place, and sex
/// (relationships span trees and are not comparable here). Components
/// without evidence on both sides drop out of the weighting.
fn content_score(a: &PersonFacts, b: &PersonFacts) -> f64 {
    let mut total_weight = 0.0;
    let mut total = 0.0;
    let mut add = |weight: f64, score: f64, available: bool| {
        if available {
            total_weight += weight;
            total += weight * score;
        }
    };

    add(
        0.50,
        similarity::name_score(a, b, true),
        !a.name_lower.is_empty() && !b.name_lower.is_empty(),
    );
    add(
        0.30,
        similarity::date_score(a, b),
        a.birth_year.is_some() && b.birth_year.is_some(),
    );
    add(
        0.15,
        similarity::place_score(a, b),
        a.birth_place.is_some() && b.birth_place.is_some(),
    );
    add(0.05, similarity::sex_score(a, b), true);

    if total_weight <= 0.0 {
        0.0
    } else {
        (total / total_weight).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gedcom;

    fn individuals(source: &str) -> Vec<IndividualRecord> {
        Gedcom::parse_str(source).unwrap().individuals().to_vec()
    }

    const LEFT: &str = "\
        0 HEAD\n\
        0 @I1@ INDI\n\
        1 NAME John /Doe/\n\
        1 BIRT\n\
        2 DATE 1850\n\
        0 @I2@ INDI\n\
        1 NAME Mary /Roe/\n\
        1 BIRT\n\
        2 DATE 1855\n\
        0 TRLR";

    // Same people under a different identifier space.
    const RIGHT: &str = "\
        0 HEAD\n\
        0 @P7@ INDI\n\
        1 NAME John /Doe/\n\
        1 BIRT\n\
        2 DATE 1850\n\
        0 @P8@ INDI\n\
        1 NAME Mary /Roe/\n\
        1 BIRT\n\
        2 DATE 1855\n\
        0 @P9@ INDI\n\
        1 NAME Newman /Only/\n\
        1 BIRT\n\
        2 DATE 1880\n\
        0 TRLR";

    #[test]
    fn test_xref_strategy_requires_same_identifiers() {
        let left = individuals(LEFT);
        let right = individuals(RIGHT);
        let matches =
            match_individuals(&left, &right, MatchingStrategy::Xref, 0.85, None).unwrap();
        assert!(matches.pairs.is_empty());
        assert_eq!(matches.left_unmatched.len(), 2);
        assert_eq!(matches.right_unmatched.len(), 3);
    }

    #[test]
    fn test_content_strategy_crosses_identifier_spaces() {
        let left = individuals(LEFT);
        let right = individuals(RIGHT);
        let matches =
            match_individuals(&left, &right, MatchingStrategy::Content, 0.85, None).unwrap();
        assert_eq!(matches.pairs, vec![(0, 0), (1, 1)]);
        assert!(matches.left_unmatched.is_empty());
        assert_eq!(matches.right_unmatched, vec![2]);
    }

    #[test]
    fn test_hybrid_prefers_xref_then_content() {
        let left = individuals(LEFT);
        // Right reuses @I1@ but renames Mary's identifier.
        let right = individuals(
            "\
            0 HEAD\n\
            0 @I1@ INDI\n\
            1 NAME John /Doe/\n\
            1 BIRT\n\
            2 DATE 1850\n\
            0 @P8@ INDI\n\
            1 NAME Mary /Roe/\n\
            1 BIRT\n\
            2 DATE 1855\n\
            0 TRLR",
        );
        let matches =
            match_individuals(&left, &right, MatchingStrategy::Hybrid, 0.85, None).unwrap();
        assert_eq!(matches.pairs, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_matching_is_deterministic() {
        let left = individuals(LEFT);
        let right = individuals(RIGHT);
        let first =
            match_individuals(&left, &right, MatchingStrategy::Hybrid, 0.85, None).unwrap();
        let second =
            match_individuals(&left, &right, MatchingStrategy::Hybrid, 0.85, None).unwrap();
        assert_eq!(first.pairs, second.pairs);
        assert_eq!(first.right_unmatched, second.right_unmatched);
    }
}
