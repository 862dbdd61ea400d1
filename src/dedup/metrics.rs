//! Blocking metrics, reported alongside the match list.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Observability counters for one detection run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BlockingMetrics {
    /// Individuals considered.
    pub total_people: usize,
    /// Individuals that produced at least one block key.
    pub people_with_keys: usize,
    /// Individuals with no key at all (never compared).
    pub people_without_keys: usize,
    /// Number of retained blocks.
    pub block_count: usize,
    /// Blocks per key family ("primary", "bucket", "initial", ...).
    pub blocks_by_family: HashMap<String, usize>,
    /// The largest blocks, `(key, population)`, descending.
    pub top_block_sizes: Vec<(String, usize)>,
    /// Blocks dropped for exceeding the size cap.
    pub skipped_blocks: usize,
    /// Unordered candidate pairs sent to scoring.
    pub candidate_pairs: usize,
    /// Mean candidates per person.
    pub average_candidates_per_person: f64,
    /// Largest per-person candidate count (after capping).
    pub max_candidates_per_person: usize,
    /// People with zero candidates.
    pub people_with_no_candidates: usize,
    /// People with exactly one candidate.
    pub people_with_one_candidate: usize,
    /// People with more than one candidate.
    pub people_with_many_candidates: usize,
    /// Human-readable observations (e.g. one surname dominating).
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_zeroed() {
        let metrics = BlockingMetrics::default();
        assert_eq!(metrics.total_people, 0);
        assert_eq!(metrics.candidate_pairs, 0);
        assert!(metrics.warnings.is_empty());
    }
}
