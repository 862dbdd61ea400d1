//! Duplicate detection: blocking, then weighted pairwise scoring.
//!
//! The detector never compares all pairs. Individuals are first grouped
//! into blocks of likely matches (see [`blocking`]); candidate pairs come
//! only from shared blocks, with adaptive caps keeping degenerate data
//! near-linear. Each candidate pair is then scored by a weighted blend of
//! name, date, place, sex, and relationship similarity. Scoring is
//! fanned out over a worker pool fed by a shared channel; the emitted
//! match list is sorted by score and internal id so parallel runs are
//! bit-for-bit reproducible.

pub mod blocking;
pub mod metrics;
pub(crate) mod similarity;
pub mod soundex;

use crate::cancel::{check_opt, CancelToken};
use crate::dedup::metrics::BlockingMetrics;
use crate::dedup::similarity::PersonFacts;
use crate::graph::node::{IndividualNode, InternalId};
use crate::graph::Graph;
use crate::GedcomError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Similarity component weights. Normalized before use, so only ratios
/// matter; the sum must be positive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub name: f64,
    pub date: f64,
    pub place: f64,
    pub sex: f64,
    pub relationship: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            name: 0.40,
            date: 0.30,
            place: 0.15,
            sex: 0.05,
            relationship: 0.10,
        }
    }
}

/// Duplicate-detection configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Pairs scoring below this are discarded.
    pub min_threshold: f64,
    /// Lower bound of the `High` confidence bucket.
    pub high_confidence_threshold: f64,
    /// Lower bound of the `Exact` confidence bucket.
    pub exact_match_threshold: f64,
    /// Component weights.
    pub weights: SimilarityWeights,
    /// Year tolerance used when listing matching/differing fields.
    pub date_tolerance: u32,
    /// Include the phonetic variant in name scoring.
    pub use_phonetic: bool,
    /// Include the relationship component.
    pub use_relationships: bool,
    /// Fan scoring out over a worker pool.
    pub parallel: bool,
    /// Worker count; `None` uses the machine's parallelism.
    pub num_workers: Option<usize>,
    /// Blocks larger than this are skipped entirely.
    pub max_block_size: usize,
    /// Per-person candidate cap; excess candidates are dropped by
    /// coarse pre-score.
    pub max_candidates_per_person: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            min_threshold: 0.60,
            high_confidence_threshold: 0.85,
            exact_match_threshold: 0.95,
            weights: SimilarityWeights::default(),
            date_tolerance: 2,
            use_phonetic: true,
            use_relationships: true,
            parallel: true,
            num_workers: None,
            max_block_size: 5000,
            max_candidates_per_person: 50,
        }
    }
}

/// Confidence bucket of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    /// Composite ≥ the exact-match threshold (default 0.95).
    Exact,
    /// Composite ≥ the high-confidence threshold (default 0.85).
    High,
    /// Composite ≥ 0.70.
    Medium,
    /// Everything else above the minimum threshold.
    Low,
}

impl Confidence {
    fn bucket(score: f64, config: &DedupConfig) -> Confidence {
        if score >= config.exact_match_threshold {
            Confidence::Exact
        } else if score >= config.high_confidence_threshold {
            Confidence::High
        } else if score >= 0.70 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Per-component subscores of a match.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub name: f64,
    pub date: f64,
    pub place: f64,
    pub sex: f64,
    pub relationship: f64,
}

/// A candidate duplicate pair with its similarity breakdown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    /// Xref of the individual with the smaller internal id.
    pub xref1: String,
    /// Xref of the individual with the larger internal id.
    pub xref2: String,
    /// Internal id of the first individual.
    pub id1: InternalId,
    /// Internal id of the second individual.
    pub id2: InternalId,
    /// Composite similarity in [0, 1].
    pub score: f64,
    /// Component breakdown.
    pub subscores: SubScores,
    /// Confidence bucket.
    pub confidence: Confidence,
    /// Fields that agree.
    pub matching_fields: Vec<String>,
    /// Fields where both sides have values that disagree.
    pub differing_fields: Vec<String>,
}

/// The outcome of a detection run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DedupReport {
    /// Matches sorted by score descending, then (id1, id2) ascending.
    pub matches: Vec<DuplicateMatch>,
    /// Blocking observability counters.
    pub metrics: BlockingMetrics,
}

#[cfg(feature = "json")]
impl DedupReport {
    /// Serializes the report to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `GedcomError::Backend` when serialization fails.
    pub fn to_json(&self) -> Result<String, GedcomError> {
        serde_json::to_string_pretty(self).map_err(GedcomError::backend)
    }
}

/// Relationship context of one person, prefetched before scoring.
#[derive(Clone, Debug, Default)]
struct RelationFacts {
    parents: Vec<InternalId>,
    spouses: Vec<InternalId>,
    children: Vec<InternalId>,
}

impl RelationFacts {
    fn is_empty(&self) -> bool {
        self.parents.is_empty() && self.spouses.is_empty() && self.children.is_empty()
    }
}

/// The duplicate detector; see the module docs.
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    config: DedupConfig,
}

impl DuplicateDetector {
    /// Creates a detector with the given configuration.
    #[must_use]
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Runs detection over every individual of the graph.
    ///
    /// # Errors
    ///
    /// Returns `GedcomError::Cancelled` when the token trips, or a
    /// backend error from node access.
    pub fn find_duplicates(
        &self,
        graph: &Graph,
        cancel: Option<&CancelToken>,
    ) -> Result<DedupReport, GedcomError> {
        let mut nodes: Vec<Arc<IndividualNode>> = Vec::new();
        for id in graph.individual_ids()? {
            if let Some(node) = graph.individual(id)? {
                nodes.push(node);
            }
        }

        let facts: Vec<PersonFacts> = nodes.iter().map(|n| PersonFacts::from(n.as_ref())).collect();
        let relations = if self.config.use_relationships {
            relation_facts(graph, &nodes)?
        } else {
            vec![RelationFacts::default(); nodes.len()]
        };

        let mut run_metrics = BlockingMetrics {
            total_people: nodes.len(),
            ..BlockingMetrics::default()
        };

        let (blocks, summary) = blocking::build_blocks(&facts, &self.config);
        run_metrics.people_with_keys = summary.keyed_people;
        run_metrics.people_without_keys = nodes.len() - summary.keyed_people;
        run_metrics.skipped_blocks = summary.skipped_blocks;
        run_metrics.block_count = blocks.len();
        for (key, members) in &blocks {
            *run_metrics
                .blocks_by_family
                .entry(blocking::key_family(key).to_string())
                .or_default() += 1;
            run_metrics.top_block_sizes.push((key.clone(), members.len()));
        }
        run_metrics
            .top_block_sizes
            .sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        run_metrics.top_block_sizes.truncate(10);

        let pairs = self.candidate_pairs(&blocks, &facts, nodes.len(), cancel, &mut run_metrics)?;
        surname_dominance_warning(&facts, &mut run_metrics);

        debug!(
            people = nodes.len(),
            blocks = blocks.len(),
            pairs = pairs.len(),
            "duplicate detection scoring starts"
        );

        let mut matches = self.score_pairs(&nodes, &facts, &relations, &pairs, cancel)?;
        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.id1.cmp(&b.id1))
                .then_with(|| a.id2.cmp(&b.id2))
        });

        Ok(DedupReport {
            matches,
            metrics: run_metrics,
        })
    }

    /// Emits unique candidate pairs from the blocks, applying the
    /// per-person cap by coarse pre-score.
    fn candidate_pairs(
        &self,
        blocks: &[(String, Vec<usize>)],
        facts: &[PersonFacts],
        population: usize,
        cancel: Option<&CancelToken>,
        run_metrics: &mut BlockingMetrics,
    ) -> Result<Vec<(usize, usize)>, GedcomError> {
        let mut pair_set: HashSet<(usize, usize)> = HashSet::new();
        let mut per_person: Vec<Vec<usize>> = vec![Vec::new(); population];

        for (_, members) in blocks {
            check_opt(cancel)?;
            for (position, &a) in members.iter().enumerate() {
                for &b in &members[position + 1..] {
                    let pair = (a.min(b), a.max(b));
                    if pair.0 != pair.1 && pair_set.insert(pair) {
                        per_person[pair.0].push(pair.1);
                        per_person[pair.1].push(pair.0);
                    }
                }
            }
        }

        // Per-person cap: keep the most promising candidates by coarse
        // pre-score; a pair survives while either endpoint retains it.
        let cap = self.config.max_candidates_per_person;
        let mut kept: HashSet<(usize, usize)> = HashSet::new();
        let mut max_candidates = 0usize;
        let mut total_candidates = 0usize;
        for (person, candidates) in per_person.iter_mut().enumerate() {
            if candidates.len() > cap {
                candidates.sort_by(|&x, &y| {
                    prescore(&facts[person], &facts[y])
                        .cmp(&prescore(&facts[person], &facts[x]))
                        .then_with(|| x.cmp(&y))
                });
                candidates.truncate(cap);
            }
            max_candidates = max_candidates.max(candidates.len());
            total_candidates += candidates.len();
            match candidates.len() {
                0 => run_metrics.people_with_no_candidates += 1,
                1 => run_metrics.people_with_one_candidate += 1,
                _ => run_metrics.people_with_many_candidates += 1,
            }
            for &other in candidates.iter() {
                kept.insert((person.min(other), person.max(other)));
            }
        }

        let mut pairs: Vec<(usize, usize)> = kept.into_iter().collect();
        pairs.sort_unstable();

        run_metrics.candidate_pairs = pairs.len();
        run_metrics.max_candidates_per_person = max_candidates;
        run_metrics.average_candidates_per_person = if population == 0 {
            0.0
        } else {
            total_candidates as f64 / population as f64
        };

        Ok(pairs)
    }

    /// Scores the pairs, inline or across a worker pool.
    fn score_pairs(
        &self,
        nodes: &[Arc<IndividualNode>],
        facts: &[PersonFacts],
        relations: &[RelationFacts],
        pairs: &[(usize, usize)],
        cancel: Option<&CancelToken>,
    ) -> Result<Vec<DuplicateMatch>, GedcomError> {
        let workers = self
            .config
            .num_workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(std::num::NonZeroUsize::get)
                    .unwrap_or(1)
            })
            .max(1);

        if !self.config.parallel || workers == 1 || pairs.len() < 256 {
            let mut out = Vec::new();
            for chunk in pairs.chunks(256) {
                check_opt(cancel)?;
                for &(a, b) in chunk {
                    if let Some(found) = self.score_pair(nodes, facts, relations, a, b) {
                        out.push(found);
                    }
                }
            }
            return Ok(out);
        }

        let (sender, receiver) = crossbeam_channel::unbounded::<&[(usize, usize)]>();
        for chunk in pairs.chunks(1024) {
            sender.send(chunk).expect("receiver outlives the send loop");
        }
        drop(sender);

        let results = std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for _ in 0..workers {
                let receiver = receiver.clone();
                handles.push(scope.spawn(move || {
                    let mut out = Vec::new();
                    while let Ok(chunk) = receiver.recv() {
                        if cancel.is_some_and(CancelToken::is_cancelled) {
                            break;
                        }
                        for &(a, b) in chunk {
                            if let Some(found) = self.score_pair(nodes, facts, relations, a, b) {
                                out.push(found);
                            }
                        }
                    }
                    out
                }));
            }
            let mut all = Vec::new();
            for handle in handles {
                all.extend(handle.join().expect("scoring workers do not panic"));
            }
            all
        });

        // Cancelled workers stop early; partial results are not returned.
        check_opt(cancel)?;
        Ok(results)
    }

    /// Weighted similarity of one pair; `None` below the minimum
    /// threshold. Components with no evidence on either side drop out
    /// and the remaining weights renormalize.
    fn score_pair(
        &self,
        nodes: &[Arc<IndividualNode>],
        facts: &[PersonFacts],
        relations: &[RelationFacts],
        a: usize,
        b: usize,
    ) -> Option<DuplicateMatch> {
        let config = &self.config;
        let (fa, fb) = (&facts[a], &facts[b]);

        let name = similarity::name_score(fa, fb, config.use_phonetic);
        let date = similarity::date_score(fa, fb);
        let place = similarity::place_score(fa, fb);
        let sex = similarity::sex_score(fa, fb);
        let relationship = relation_overlap(&relations[a], &relations[b]);

        let subscores = SubScores {
            name,
            date,
            place,
            sex,
            relationship,
        };

        let weights = config.weights;
        let mut total_weight = 0.0;
        let mut total = 0.0;
        let mut add = |weight: f64, score: f64, available: bool| {
            if available && weight > 0.0 {
                total_weight += weight;
                total += weight * score;
            }
        };
        add(
            weights.name,
            name,
            !fa.name_lower.is_empty() && !fb.name_lower.is_empty(),
        );
        add(
            weights.date,
            date,
            fa.birth_year.is_some() && fb.birth_year.is_some(),
        );
        add(
            weights.place,
            place,
            fa.birth_place.is_some() && fb.birth_place.is_some(),
        );
        add(weights.sex, sex, true);
        add(
            weights.relationship,
            relationship,
            config.use_relationships
                && !relations[a].is_empty()
                && !relations[b].is_empty(),
        );

        if total_weight <= 0.0 {
            return None;
        }
        let score = (total / total_weight).clamp(0.0, 1.0);
        if score < config.min_threshold {
            return None;
        }

        let (matching_fields, differing_fields) = field_lists(fa, fb, &subscores);

        Some(DuplicateMatch {
            xref1: nodes[a].xref.clone(),
            xref2: nodes[b].xref.clone(),
            id1: nodes[a].id,
            id2: nodes[b].id,
            score,
            subscores,
            confidence: Confidence::bucket(score, config),
            matching_fields,
            differing_fields,
        })
    }
}

/// Prefetches parents, spouses, and children per person.
fn relation_facts(
    graph: &Graph,
    nodes: &[Arc<IndividualNode>],
) -> Result<Vec<RelationFacts>, GedcomError> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        let mut relation = RelationFacts {
            parents: node.parents.clone(),
            ..RelationFacts::default()
        };
        for &family_id in &node.fams {
            if let Some(family) = graph.family(family_id)? {
                if let Some(spouse) = family.spouse_of(node.id) {
                    relation.spouses.push(spouse);
                }
                relation.children.extend_from_slice(&family.children);
            }
        }
        out.push(relation);
    }
    Ok(out)
}

/// Flags datasets where one surname dominates; blocking degrades there.
fn surname_dominance_warning(facts: &[PersonFacts], run_metrics: &mut BlockingMetrics) {
    if facts.len() < 100 {
        return;
    }
    let mut by_surname: HashMap<&str, usize> = HashMap::new();
    for fact in facts {
        if let Some(surname) = fact.surname.as_deref() {
            *by_surname.entry(surname).or_default() += 1;
        }
    }
    for (surname, count) in by_surname {
        if count * 5 >= facts.len() {
            run_metrics.warnings.push(format!(
                "surname `{surname}` covers {count} of {} people; expect large blocks",
                facts.len()
            ));
        }
    }
    run_metrics.warnings.sort();
}

/// +0.2 per common parent or spouse, +0.1 per common child, capped.
fn relation_overlap(a: &RelationFacts, b: &RelationFacts) -> f64 {
    let common = |x: &[InternalId], y: &[InternalId]| x.iter().filter(|v| y.contains(v)).count();
    let score = 0.2 * common(&a.parents, &b.parents) as f64
        + 0.2 * common(&a.spouses, &b.spouses) as f64
        + 0.1 * common(&a.children, &b.children) as f64;
    score.min(1.0)
}

/// Which fields agree and which carry conflicting values.
fn field_lists(
    fa: &PersonFacts,
    fb: &PersonFacts,
    subscores: &SubScores,
) -> (Vec<String>, Vec<String>) {
    let mut matching = Vec::new();
    let mut differing = Vec::new();

    if !fa.name_lower.is_empty() && !fb.name_lower.is_empty() {
        if subscores.name >= 0.85 {
            matching.push("name".to_string());
        } else if subscores.name < 0.5 {
            differing.push("name".to_string());
        }
    }
    if fa.birth_year.is_some() && fb.birth_year.is_some() {
        if subscores.date >= 0.8 {
            matching.push("birth_date".to_string());
        } else if subscores.date < 0.5 {
            differing.push("birth_date".to_string());
        }
    }
    if fa.birth_place.is_some() && fb.birth_place.is_some() {
        if subscores.place >= 0.8 {
            matching.push("birth_place".to_string());
        } else if subscores.place < 0.5 {
            differing.push("birth_place".to_string());
        }
    }
    if fa.sex == fb.sex {
        matching.push("sex".to_string());
    } else if subscores.sex == 0.0 {
        differing.push("sex".to_string());
    }

    (matching, differing)
}

/// Coarse candidate priority used by the per-person cap.
fn prescore(a: &PersonFacts, b: &PersonFacts) -> u8 {
    if let (Some(ya), Some(yb)) = (a.birth_year, b.birth_year) {
        match ya.abs_diff(yb) {
            0 => return 6,
            1 => return 5,
            2 => return 4,
            _ => {}
        }
    }
    if a.surname.is_some() && a.surname == b.surname {
        return 3;
    }
    if let (Some(pa), Some(pb)) = (&a.birth_place, &b.birth_place) {
        if crate::types::place::normalize(pa) == crate::types::place::normalize(pb) {
            return 2;
        }
    }
    if let (Some(ga), Some(gb)) = (&a.given, &b.given) {
        if ga.chars().count() >= 2 && ga.chars().take(2).eq(gb.chars().take(2)) {
            return 1;
        }
    }
    0
}
