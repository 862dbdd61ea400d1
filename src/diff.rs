//! Semantic diff of two trees.
//!
//! Records are matched by xref, by content similarity, or both (see
//! [`matcher::MatchingStrategy`]); matched individuals and families are
//! then compared field by field. Dates within the configured tolerance
//! and places that differ only cosmetically are reported as
//! [`ChangeKind::SemanticallyEquivalent`] rather than modified. The
//! change set is consumable by any formatter.

pub mod changes;
pub mod matcher;

use crate::cancel::{check_opt, CancelToken};
use crate::diff::changes::{
    ChangeKind, ChangeSet, DiffSummary, FieldChange, HistoryEntry, ModifiedRecord, RecordRef,
};
use crate::diff::matcher::MatchingStrategy;
use crate::tree::Tree;
use crate::types::date::DateValue;
use crate::types::event::EventDetail;
use crate::types::family::FamilyRecord;
use crate::types::individual::gender::Sex;
use crate::types::individual::IndividualRecord;
use crate::types::{place, RecordKind};
use crate::GedcomError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// How much of each change is materialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetailLevel {
    /// Counts only; modified records carry no field changes.
    Summary,
    /// Field-level changes.
    #[default]
    Field,
    /// Field-level changes plus per-change history entries.
    Full,
}

/// Diff configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiffConfig {
    /// Record matching strategy.
    pub matching_strategy: MatchingStrategy,
    /// Content-matching similarity cutoff.
    pub similarity_threshold: f64,
    /// Years within which two dates count as semantically equivalent.
    pub date_tolerance: u32,
    /// Also list matched records without changes.
    pub include_unchanged: bool,
    /// Output granularity.
    pub detail_level: DetailLevel,
    /// Attach timestamped history entries to every change.
    pub track_history: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            matching_strategy: MatchingStrategy::Hybrid,
            similarity_threshold: 0.85,
            date_tolerance: 2,
            include_unchanged: false,
            detail_level: DetailLevel::Field,
            track_history: false,
        }
    }
}

/// The diff engine; see the module docs.
#[derive(Debug, Default)]
pub struct DiffEngine {
    config: DiffConfig,
}

impl DiffEngine {
    /// Creates an engine with the given configuration.
    #[must_use]
    pub fn new(config: DiffConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Diffs `left` (the old tree) against `right` (the new tree).
    ///
    /// # Errors
    ///
    /// Returns `GedcomError::Cancelled` when the token trips.
    pub fn diff(
        &self,
        left: &Tree,
        right: &Tree,
        cancel: Option<&CancelToken>,
    ) -> Result<ChangeSet, GedcomError> {
        let mut change_set = ChangeSet::default();

        let individual_matches = matcher::match_individuals(
            left.individuals(),
            right.individuals(),
            self.config.matching_strategy,
            self.config.similarity_threshold,
            cancel,
        )?;

        // Individual xref translation for family-side comparison.
        let left_to_right: HashMap<&str, &str> = individual_matches
            .pairs
            .iter()
            .map(|&(l, r)| {
                (
                    left.individuals()[l].xref.as_str(),
                    right.individuals()[r].xref.as_str(),
                )
            })
            .collect();

        for &(left_index, right_index) in &individual_matches.pairs {
            check_opt(cancel)?;
            let left_record = &left.individuals()[left_index];
            let right_record = &right.individuals()[right_index];
            let field_changes = self.compare_individuals(left_record, right_record);
            self.record_outcome(
                &mut change_set,
                RecordKind::Individual,
                &left_record.xref,
                &right_record.xref,
                field_changes,
            );
        }
        for &index in &individual_matches.left_unmatched {
            change_set.removed.push(RecordRef {
                xref: left.individuals()[index].xref.clone(),
                kind: RecordKind::Individual,
            });
        }
        for &index in &individual_matches.right_unmatched {
            change_set.added.push(RecordRef {
                xref: right.individuals()[index].xref.clone(),
                kind: RecordKind::Individual,
            });
        }

        self.diff_families(left, right, &left_to_right, &mut change_set, cancel)?;

        change_set.summary = DiffSummary {
            added: change_set.added.len(),
            removed: change_set.removed.len(),
            modified: change_set.modified.len(),
            unchanged: change_set.summary.unchanged,
            field_changes: change_set
                .modified
                .iter()
                .map(|m| m.changes.len())
                .sum(),
            semantically_equivalent: change_set
                .modified
                .iter()
                .flat_map(|m| m.changes.iter())
                .filter(|c| c.kind == ChangeKind::SemanticallyEquivalent)
                .count(),
        };

        if self.config.track_history {
            change_set.history = change_set
                .modified
                .iter()
                .flat_map(|m| m.history.iter().cloned())
                .collect();
        }

        debug!(
            added = change_set.summary.added,
            removed = change_set.summary.removed,
            modified = change_set.summary.modified,
            "diff complete"
        );
        Ok(change_set)
    }

    /// Families are matched by xref; under content strategies, also by
    /// their spouse pair translated through the individual matches.
    fn diff_families(
        &self,
        left: &Tree,
        right: &Tree,
        left_to_right: &HashMap<&str, &str>,
        change_set: &mut ChangeSet,
        cancel: Option<&CancelToken>,
    ) -> Result<(), GedcomError> {
        let right_by_xref: HashMap<&str, usize> = right
            .families()
            .iter()
            .enumerate()
            .map(|(index, family)| (family.xref.as_str(), index))
            .collect();
        let right_by_spouses: HashMap<(Option<&str>, Option<&str>), usize> = right
            .families()
            .iter()
            .enumerate()
            .map(|(index, family)| {
                (
                    (family.husband.as_deref(), family.wife.as_deref()),
                    index,
                )
            })
            .collect();

        let mut matched_right: HashSet<usize> = HashSet::new();
        for left_family in left.families() {
            check_opt(cancel)?;

            let mut right_index = right_by_xref.get(left_family.xref.as_str()).copied();
            if right_index.is_none() && self.config.matching_strategy != MatchingStrategy::Xref {
                let translated = (
                    left_family
                        .husband
                        .as_deref()
                        .and_then(|x| left_to_right.get(x).copied()),
                    left_family
                        .wife
                        .as_deref()
                        .and_then(|x| left_to_right.get(x).copied()),
                );
                if translated.0.is_some() || translated.1.is_some() {
                    right_index = right_by_spouses.get(&translated).copied();
                }
            }

            match right_index {
                Some(right_index) if !matched_right.contains(&right_index) => {
                    matched_right.insert(right_index);
                    let right_family = &right.families()[right_index];
                    let field_changes =
                        self.compare_families(left_family, right_family, left_to_right);
                    self.record_outcome(
                        change_set,
                        RecordKind::Family,
                        &left_family.xref,
                        &right_family.xref,
                        field_changes,
                    );
                }
                _ => change_set.removed.push(RecordRef {
                    xref: left_family.xref.clone(),
                    kind: RecordKind::Family,
                }),
            }
        }
        for (index, family) in right.families().iter().enumerate() {
            if !matched_right.contains(&index) {
                change_set.added.push(RecordRef {
                    xref: family.xref.clone(),
                    kind: RecordKind::Family,
                });
            }
        }
        Ok(())
    }

    /// Buckets a matched record as modified or unchanged.
    fn record_outcome(
        &self,
        change_set: &mut ChangeSet,
        kind: RecordKind,
        left_xref: &str,
        right_xref: &str,
        field_changes: Vec<FieldChange>,
    ) {
        if field_changes.is_empty() {
            change_set.summary.unchanged += 1;
            if self.config.include_unchanged {
                change_set.unchanged.push(RecordRef {
                    xref: left_xref.to_string(),
                    kind,
                });
            }
            return;
        }

        let history = if self.config.track_history
            || self.config.detail_level == DetailLevel::Full
        {
            let now = chrono::Utc::now();
            field_changes
                .iter()
                .map(|change| HistoryEntry {
                    timestamp: now,
                    field: change.path.clone(),
                    old: change.old.clone(),
                    new: change.new.clone(),
                    kind: change.kind,
                    author: None,
                    reason: None,
                })
                .collect()
        } else {
            Vec::new()
        };

        let changes = match self.config.detail_level {
            DetailLevel::Summary => Vec::new(),
            DetailLevel::Field | DetailLevel::Full => field_changes,
        };

        change_set.modified.push(ModifiedRecord {
            xref: left_xref.to_string(),
            matched_xref: right_xref.to_string(),
            kind,
            changes,
            history,
        });
    }

    fn compare_individuals(
        &self,
        left: &IndividualRecord,
        right: &IndividualRecord,
    ) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        self.compare_text(
            &mut changes,
            "NAME",
            left.full_name().as_deref(),
            right.full_name().as_deref(),
            |a, b| a == b,
        );
        self.compare_sex(&mut changes, left.sex, right.sex);
        self.compare_event(&mut changes, "BIRT", left.birth.as_ref(), right.birth.as_ref());
        self.compare_event(&mut changes, "DEAT", left.death.as_ref(), right.death.as_ref());

        changes
    }

    fn compare_families(
        &self,
        left: &FamilyRecord,
        right: &FamilyRecord,
        left_to_right: &HashMap<&str, &str>,
    ) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        let translate = |xref: Option<&str>| -> Option<String> {
            xref.map(|x| (*left_to_right.get(x).unwrap_or(&x)).to_string())
        };

        self.compare_text(
            &mut changes,
            "HUSB",
            left.husband.as_deref(),
            right.husband.as_deref(),
            |a, b| translate(Some(a)).as_deref() == Some(b),
        );
        self.compare_text(
            &mut changes,
            "WIFE",
            left.wife.as_deref(),
            right.wife.as_deref(),
            |a, b| translate(Some(a)).as_deref() == Some(b),
        );
        self.compare_event(
            &mut changes,
            "MARR",
            left.marriage.as_ref(),
            right.marriage.as_ref(),
        );

        // Children as a set difference under translation.
        let translated_left: Vec<String> = left
            .children
            .iter()
            .map(|child| translate(Some(child)).unwrap_or_else(|| child.clone()))
            .collect();
        for (child, translated) in left.children.iter().zip(&translated_left) {
            if !right.children.iter().any(|c| c == translated) {
                changes.push(FieldChange {
                    path: "CHIL".to_string(),
                    old: Some(child.clone()),
                    new: None,
                    kind: ChangeKind::Removed,
                });
            }
        }
        for child in &right.children {
            if !translated_left.iter().any(|c| c == child) {
                changes.push(FieldChange {
                    path: "CHIL".to_string(),
                    old: None,
                    new: Some(child.clone()),
                    kind: ChangeKind::Added,
                });
            }
        }

        changes
    }

    /// Generic optional-text field comparison; `same` decides equality.
    fn compare_text<F>(
        &self,
        changes: &mut Vec<FieldChange>,
        path: &str,
        left: Option<&str>,
        right: Option<&str>,
        same: F,
    ) where
        F: Fn(&str, &str) -> bool,
    {
        match (left, right) {
            (None, None) => {}
            (Some(old), None) => changes.push(FieldChange {
                path: path.to_string(),
                old: Some(old.to_string()),
                new: None,
                kind: ChangeKind::Removed,
            }),
            (None, Some(new)) => changes.push(FieldChange {
                path: path.to_string(),
                old: None,
                new: Some(new.to_string()),
                kind: ChangeKind::Added,
            }),
            (Some(old), Some(new)) => {
                if !same(old, new) {
                    changes.push(FieldChange {
                        path: path.to_string(),
                        old: Some(old.to_string()),
                        new: Some(new.to_string()),
                        kind: ChangeKind::Modified,
                    });
                }
            }
        }
    }

    fn compare_sex(&self, changes: &mut Vec<FieldChange>, left: Sex, right: Sex) {
        if left != right {
            changes.push(FieldChange {
                path: "SEX".to_string(),
                old: (left != Sex::Unknown).then(|| left.as_str().to_string()),
                new: (right != Sex::Unknown).then(|| right.as_str().to_string()),
                kind: match (left, right) {
                    (Sex::Unknown, _) => ChangeKind::Added,
                    (_, Sex::Unknown) => ChangeKind::Removed,
                    _ => ChangeKind::Modified,
                },
            });
        }
    }

    /// DATE and PLAC sub-fields of one event structure.
    fn compare_event(
        &self,
        changes: &mut Vec<FieldChange>,
        tag: &str,
        left: Option<&EventDetail>,
        right: Option<&EventDetail>,
    ) {
        let left_date = left.and_then(|e| e.date.as_ref());
        let right_date = right.and_then(|e| e.date.as_ref());
        self.compare_date(changes, &format!("{tag}.DATE"), left_date, right_date);

        let left_place = left.and_then(|e| e.place.as_deref());
        let right_place = right.and_then(|e| e.place.as_deref());
        self.compare_place(changes, &format!("{tag}.PLAC"), left_place, right_place);
    }

    fn compare_date(
        &self,
        changes: &mut Vec<FieldChange>,
        path: &str,
        left: Option<&DateValue>,
        right: Option<&DateValue>,
    ) {
        match (left, right) {
            (None, None) => {}
            (Some(old), None) => changes.push(FieldChange {
                path: path.to_string(),
                old: Some(old.raw.clone()),
                new: None,
                kind: ChangeKind::Removed,
            }),
            (None, Some(new)) => changes.push(FieldChange {
                path: path.to_string(),
                old: None,
                new: Some(new.raw.clone()),
                kind: ChangeKind::Added,
            }),
            (Some(old), Some(new)) => {
                if old.raw.trim() == new.raw.trim() {
                    return;
                }
                let kind = if old.semantically_equivalent(new, self.config.date_tolerance) {
                    ChangeKind::SemanticallyEquivalent
                } else {
                    ChangeKind::Modified
                };
                changes.push(FieldChange {
                    path: path.to_string(),
                    old: Some(old.raw.clone()),
                    new: Some(new.raw.clone()),
                    kind,
                });
            }
        }
    }

    fn compare_place(
        &self,
        changes: &mut Vec<FieldChange>,
        path: &str,
        left: Option<&str>,
        right: Option<&str>,
    ) {
        match (left, right) {
            (None, None) => {}
            (Some(old), None) => changes.push(FieldChange {
                path: path.to_string(),
                old: Some(old.to_string()),
                new: None,
                kind: ChangeKind::Removed,
            }),
            (None, Some(new)) => changes.push(FieldChange {
                path: path.to_string(),
                old: None,
                new: Some(new.to_string()),
                kind: ChangeKind::Added,
            }),
            (Some(old), Some(new)) => {
                if old == new {
                    return;
                }
                let kind = if place::normalize(old) == place::normalize(new) {
                    ChangeKind::SemanticallyEquivalent
                } else {
                    ChangeKind::Modified
                };
                changes.push(FieldChange {
                    path: path.to_string(),
                    old: Some(old.to_string()),
                    new: Some(new.to_string()),
                    kind,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gedcom;

    fn diff_trees(left: &str, right: &str, config: DiffConfig) -> ChangeSet {
        let left = Gedcom::parse_str(left).unwrap();
        let right = Gedcom::parse_str(right).unwrap();
        DiffEngine::new(config).diff(&left, &right, None).unwrap()
    }

    const BASE: &str = "\
        0 HEAD\n\
        0 @I1@ INDI\n\
        1 NAME John /Doe/\n\
        1 SEX M\n\
        1 BIRT\n\
        2 DATE 1800\n\
        2 PLAC New York\n\
        0 @F1@ FAM\n\
        1 HUSB @I1@\n\
        0 TRLR";

    #[test]
    fn test_identical_trees_diff_empty() {
        let change_set = diff_trees(BASE, BASE, DiffConfig::default());
        assert!(change_set.is_empty());
        assert_eq!(change_set.summary.unchanged, 2);
    }

    #[test]
    fn test_semantically_equivalent_date() {
        let right = BASE.replace("2 DATE 1800", "2 DATE ABT 1800");
        let change_set = diff_trees(BASE, &right, DiffConfig::default());

        assert_eq!(change_set.modified.len(), 1);
        let modified = &change_set.modified[0];
        assert_eq!(modified.xref, "@I1@");
        assert_eq!(modified.changes.len(), 1);
        let change = &modified.changes[0];
        assert_eq!(change.path, "BIRT.DATE");
        assert_eq!(change.kind, ChangeKind::SemanticallyEquivalent);
        assert_eq!(change.old.as_deref(), Some("1800"));
        assert_eq!(change.new.as_deref(), Some("ABT 1800"));
    }

    #[test]
    fn test_material_date_change() {
        let right = BASE.replace("2 DATE 1800", "2 DATE 1850");
        let change_set = diff_trees(BASE, &right, DiffConfig::default());
        assert_eq!(change_set.modified[0].changes[0].kind, ChangeKind::Modified);
    }

    #[test]
    fn test_cosmetic_place_change() {
        let right = BASE.replace("2 PLAC New York", "2 PLAC new  YORK");
        let change_set = diff_trees(BASE, &right, DiffConfig::default());
        let change = &change_set.modified[0].changes[0];
        assert_eq!(change.path, "BIRT.PLAC");
        assert_eq!(change.kind, ChangeKind::SemanticallyEquivalent);
    }

    #[test]
    fn test_added_and_removed_records() {
        let right = "\
            0 HEAD\n\
            0 @I2@ INDI\n\
            1 NAME Completely /Different/\n\
            1 BIRT\n\
            2 DATE 1999\n\
            0 TRLR";
        let change_set = diff_trees(BASE, right, DiffConfig::default());

        assert_eq!(change_set.summary.removed, 2); // @I1@ and @F1@
        assert_eq!(change_set.summary.added, 1); // @I2@
        assert!(change_set
            .removed
            .iter()
            .any(|r| r.xref == "@I1@" && r.kind == RecordKind::Individual));
        assert!(change_set.added.iter().any(|r| r.xref == "@I2@"));
    }

    #[test]
    fn test_xref_completeness() {
        // Every individual xref lands in exactly one bucket.
        let right = BASE.replace("1 SEX M", "1 SEX F");
        let change_set = diff_trees(
            BASE,
            &right,
            DiffConfig {
                include_unchanged: true,
                ..DiffConfig::default()
            },
        );
        let total = change_set.summary.added
            + change_set.summary.removed
            + change_set.summary.modified
            + change_set.summary.unchanged;
        assert_eq!(total, 2); // @I1@ modified + @F1@ unchanged
    }

    #[test]
    fn test_child_set_difference() {
        let left = "\
            0 HEAD\n\
            0 @I1@ INDI\n\
            1 NAME A /B/\n\
            0 @I2@ INDI\n\
            1 NAME C /D/\n\
            0 @F1@ FAM\n\
            1 CHIL @I1@\n\
            1 CHIL @I2@\n\
            0 TRLR";
        let right = "\
            0 HEAD\n\
            0 @I1@ INDI\n\
            1 NAME A /B/\n\
            0 @I3@ INDI\n\
            1 NAME E /F/\n\
            0 @F1@ FAM\n\
            1 CHIL @I1@\n\
            1 CHIL @I3@\n\
            0 TRLR";
        let change_set = diff_trees(left, right, DiffConfig::default());

        let family = change_set
            .modified
            .iter()
            .find(|m| m.kind == RecordKind::Family)
            .unwrap();
        let removed: Vec<&FieldChange> = family
            .changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Removed)
            .collect();
        let added: Vec<&FieldChange> = family
            .changes
            .iter()
            .filter(|c| c.kind == ChangeKind::Added)
            .collect();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].old.as_deref(), Some("@I2@"));
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].new.as_deref(), Some("@I3@"));
    }

    #[test]
    fn test_content_matching_across_identifier_spaces() {
        let right = "\
            0 HEAD\n\
            0 @P9@ INDI\n\
            1 NAME John /Doe/\n\
            1 SEX M\n\
            1 BIRT\n\
            2 DATE 1800\n\
            2 PLAC New York\n\
            0 TRLR";
        let change_set = diff_trees(
            BASE,
            right,
            DiffConfig {
                matching_strategy: MatchingStrategy::Content,
                ..DiffConfig::default()
            },
        );
        // @I1@ matched @P9@ with no field changes; only @F1@ is removed.
        assert_eq!(change_set.summary.unchanged, 1);
        assert!(!change_set.removed.iter().any(|r| r.xref == "@I1@"));
    }

    #[test]
    fn test_summary_detail_level_drops_field_changes() {
        let right = BASE.replace("2 DATE 1800", "2 DATE 1850");
        let change_set = diff_trees(
            BASE,
            &right,
            DiffConfig {
                detail_level: DetailLevel::Summary,
                ..DiffConfig::default()
            },
        );
        assert_eq!(change_set.summary.modified, 1);
        assert!(change_set.modified[0].changes.is_empty());
    }

    #[test]
    fn test_history_tracking() {
        let right = BASE.replace("2 DATE 1800", "2 DATE 1850");
        let change_set = diff_trees(
            BASE,
            &right,
            DiffConfig {
                track_history: true,
                ..DiffConfig::default()
            },
        );
        assert_eq!(change_set.history.len(), 1);
        let entry = &change_set.history[0];
        assert_eq!(entry.field, "BIRT.DATE");
        assert!(entry.author.is_none());
        assert!(entry.reason.is_none());
    }

    #[test]
    fn test_cancellation() {
        let left = Gedcom::parse_str(BASE).unwrap();
        let right = Gedcom::parse_str(BASE).unwrap();
        let token = crate::CancelToken::new();
        token.cancel();
        let result = DiffEngine::new(DiffConfig::default()).diff(&left, &right, Some(&token));
        assert!(matches!(result, Err(GedcomError::Cancelled)));
    }
}
