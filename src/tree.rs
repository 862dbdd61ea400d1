//! The record store: every parsed record, indexed by kind and xref.
//!
//! A [`Tree`] is read-mostly once built: the assembler populates it, the
//! validator and graph builder read it. Lookups are O(1) through per-kind
//! xref indexes built at insertion time; iteration follows file order.

use crate::diagnostics::{DiagnosticCollector, Severity};
use crate::encoding::GedcomEncoding;
use crate::line::Line;
use crate::types::family::FamilyRecord;
use crate::types::individual::IndividualRecord;
use crate::types::{RawRecord, RecordKind, Xref};
use std::collections::HashMap;
use std::fmt;

/// The two-level verdict on a loaded tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Queryable, possibly with warnings attached.
    Usable,
    /// Structurally unusable; no graph may be built from it.
    Rejected,
}

/// A complete parsed GEDCOM file.
#[derive(Debug, Default)]
pub struct Tree {
    /// The `HEAD` record, when present.
    pub header: Option<Line>,
    /// The `TRLR` record, when present.
    pub trailer: Option<Line>,
    /// Declared or detected character encoding.
    pub encoding: Option<GedcomEncoding>,
    /// `GEDC`/`VERS` value from the header.
    pub version: Option<String>,
    /// Diagnostics accumulated while parsing and validating.
    pub diagnostics: DiagnosticCollector,

    individuals: Vec<IndividualRecord>,
    families: Vec<FamilyRecord>,
    others: Vec<RawRecord>,
    /// Top-level records outside the 5.5.1 kinds (SUBN, custom tags),
    /// kept untouched for export.
    unmodeled: Vec<Line>,

    individual_index: HashMap<Xref, usize>,
    family_index: HashMap<Xref, usize>,
    other_index: HashMap<Xref, usize>,

    /// Unified xref index across kinds.
    xref_kinds: HashMap<Xref, RecordKind>,
    /// Record anchors in file order, for deterministic downstream ids.
    record_order: Vec<(RecordKind, Xref)>,
}

impl Tree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tree from assembled level-0 records.
    #[must_use]
    pub fn from_records(records: Vec<Line>, mut diagnostics: DiagnosticCollector) -> Tree {
        let mut tree = Tree::new();
        for record in records {
            tree.insert_record(record, &mut diagnostics);
        }
        tree.version = tree
            .header
            .as_ref()
            .and_then(|h| h.at(&["GEDC", "VERS"]))
            .map(|l| l.value.clone());
        tree.diagnostics = diagnostics;
        tree
    }

    /// Registers one assembled record, extracting the typed view for the
    /// kinds the toolkit models. Duplicate xrefs keep the first record
    /// and raise a severe diagnostic.
    pub fn insert_record(&mut self, record: Line, diagnostics: &mut DiagnosticCollector) {
        let Some(kind) = RecordKind::from_tag(&record.tag) else {
            // SUBN, custom tags, and anything else: carried along
            // untouched so export can round-trip them.
            diagnostics.info(
                Some(record.line_number),
                format!("Unmodeled record `{}` kept as-is", record.tag),
            );
            self.unmodeled.push(record);
            return;
        };

        match kind {
            RecordKind::Header => {
                if self.header.is_some() {
                    diagnostics.severe(Some(record.line_number), "Duplicate HEAD record");
                } else {
                    self.header = Some(record);
                }
                return;
            }
            RecordKind::Trailer => {
                if self.trailer.is_some() {
                    diagnostics.severe(Some(record.line_number), "Duplicate TRLR record");
                } else {
                    self.trailer = Some(record);
                }
                return;
            }
            _ => {}
        }

        let xref = match &record.xref {
            Some(xref) => xref.clone(),
            None => {
                diagnostics.severe(
                    Some(record.line_number),
                    format!("{kind} record has no cross-reference identifier"),
                );
                return;
            }
        };

        if let Some(existing) = self.xref_kinds.get(&xref) {
            diagnostics.severe(
                Some(record.line_number),
                format!("Duplicate cross-reference {xref} (already used by a {existing} record)"),
            );
            return;
        }

        match kind {
            RecordKind::Individual => {
                let individual = IndividualRecord::from_line(record, diagnostics);
                self.individual_index
                    .insert(xref.clone(), self.individuals.len());
                self.individuals.push(individual);
            }
            RecordKind::Family => {
                let family = FamilyRecord::from_line(record, diagnostics);
                self.family_index.insert(xref.clone(), self.families.len());
                self.families.push(family);
            }
            _ => {
                self.other_index.insert(xref.clone(), self.others.len());
                self.others.push(RawRecord {
                    xref: Some(xref.clone()),
                    kind,
                    line: record,
                });
            }
        }

        self.xref_kinds.insert(xref.clone(), kind);
        self.record_order.push((kind, xref));
    }

    /// Finds an individual by cross-reference ID in O(1) time.
    #[inline]
    #[must_use]
    pub fn individual(&self, xref: &str) -> Option<&IndividualRecord> {
        self.individual_index
            .get(xref)
            .map(|&idx| &self.individuals[idx])
    }

    /// Finds a family by cross-reference ID in O(1) time.
    #[inline]
    #[must_use]
    pub fn family(&self, xref: &str) -> Option<&FamilyRecord> {
        self.family_index.get(xref).map(|&idx| &self.families[idx])
    }

    /// Finds an untyped record (NOTE/SOUR/REPO/SUBM/OBJE) by xref.
    #[inline]
    #[must_use]
    pub fn other(&self, xref: &str) -> Option<&RawRecord> {
        self.other_index.get(xref).map(|&idx| &self.others[idx])
    }

    /// All individuals in file order.
    #[must_use]
    pub fn individuals(&self) -> &[IndividualRecord] {
        &self.individuals
    }

    /// All families in file order.
    #[must_use]
    pub fn families(&self) -> &[FamilyRecord] {
        &self.families
    }

    /// All untyped records in file order.
    #[must_use]
    pub fn others(&self) -> &[RawRecord] {
        &self.others
    }

    /// Records outside the 5.5.1 kinds, kept verbatim.
    #[must_use]
    pub fn unmodeled(&self) -> &[Line] {
        &self.unmodeled
    }

    /// The kind registered under an xref, across every record kind.
    #[must_use]
    pub fn kind_of(&self, xref: &str) -> Option<RecordKind> {
        self.xref_kinds.get(xref).copied()
    }

    /// Record anchors `(kind, xref)` in file order.
    #[must_use]
    pub fn record_order(&self) -> &[(RecordKind, Xref)] {
        &self.record_order
    }

    /// Total count of xref-anchored records.
    #[must_use]
    pub fn total_records(&self) -> usize {
        self.record_order.len()
    }

    /// True when the tree holds no records at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.record_order.is_empty() && self.header.is_none()
    }

    /// The load verdict. A tree with nothing salvageable is rejected
    /// outright; `reject_on_severe` additionally rejects any tree that
    /// accumulated severe diagnostics.
    #[must_use]
    pub fn verdict(&self, reject_on_severe: bool) -> Verdict {
        if self.is_empty() {
            return Verdict::Rejected;
        }
        if reject_on_severe && self.diagnostics.has_severe() {
            return Verdict::Rejected;
        }
        Verdict::Usable
    }

    /// Record counts for a quick summary.
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let mut notes = 0;
        let mut sources = 0;
        let mut repositories = 0;
        let mut submitters = 0;
        let mut multimedia = 0;
        for record in &self.others {
            match record.kind {
                RecordKind::Note => notes += 1,
                RecordKind::Source => sources += 1,
                RecordKind::Repository => repositories += 1,
                RecordKind::Submitter => submitters += 1,
                RecordKind::Multimedia => multimedia += 1,
                _ => {}
            }
        }
        TreeStats {
            individuals: self.individuals.len(),
            families: self.families.len(),
            notes,
            sources,
            repositories,
            submitters,
            multimedia,
        }
    }

    /// Data-completeness measures feeding the `quality` command.
    #[must_use]
    pub fn quality(&self) -> QualityReport {
        let total = self.individuals.len();
        let with_name = self
            .individuals
            .iter()
            .filter(|i| i.full_name().is_some())
            .count();
        let with_birth = self
            .individuals
            .iter()
            .filter(|i| i.birth_year().is_some())
            .count();
        let with_death = self.individuals.iter().filter(|i| !i.is_living()).count();

        let coverage = |count: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            }
        };

        QualityReport {
            severe: self.diagnostics.count(Severity::Severe),
            warnings: self.diagnostics.count(Severity::Warning),
            infos: self.diagnostics.count(Severity::Info),
            hints: self.diagnostics.count(Severity::Hint),
            individuals: total,
            name_coverage: coverage(with_name),
            birth_coverage: coverage(with_birth),
            death_coverage: coverage(with_death),
        }
    }
}

/// Record counts by kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub individuals: usize,
    pub families: usize,
    pub notes: usize,
    pub sources: usize,
    pub repositories: usize,
    pub submitters: usize,
    pub multimedia: usize,
}

impl fmt::Display for TreeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----------------------")?;
        writeln!(f, "| Tree Stats:        |")?;
        writeln!(f, "----------------------")?;
        writeln!(f, "  individuals: {}", self.individuals)?;
        writeln!(f, "  families: {}", self.families)?;
        writeln!(f, "  notes: {}", self.notes)?;
        writeln!(f, "  sources: {}", self.sources)?;
        writeln!(f, "  repositories: {}", self.repositories)?;
        writeln!(f, "  submitters: {}", self.submitters)?;
        writeln!(f, "  multimedia: {}", self.multimedia)?;
        write!(f, "----------------------")
    }
}

/// Severity counts and completeness ratios for a parsed tree.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QualityReport {
    pub severe: usize,
    pub warnings: usize,
    pub infos: usize,
    pub hints: usize,
    pub individuals: usize,
    /// Share of individuals with a usable name.
    pub name_coverage: f64,
    /// Share of individuals with a parseable birth year.
    pub birth_coverage: f64,
    /// Share of individuals with a death record.
    pub death_coverage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gedcom;

    #[test]
    fn test_tree_lookup_and_order() {
        let sample = "\
            0 HEAD\n\
            1 GEDC\n\
            2 VERS 5.5.1\n\
            0 @I1@ INDI\n\
            1 NAME John /Doe/\n\
            0 @F1@ FAM\n\
            1 HUSB @I1@\n\
            0 @I2@ INDI\n\
            0 @S1@ SOUR\n\
            1 TITL Birth Records\n\
            0 TRLR";

        let tree = Gedcom::parse_str(sample).unwrap();
        assert!(tree.individual("@I1@").is_some());
        assert!(tree.family("@F1@").is_some());
        assert!(tree.other("@S1@").is_some());
        assert_eq!(tree.kind_of("@F1@"), Some(RecordKind::Family));
        assert_eq!(tree.version.as_deref(), Some("5.5.1"));

        let order: Vec<&str> = tree
            .record_order()
            .iter()
            .map(|(_, xref)| xref.as_str())
            .collect();
        assert_eq!(order, vec!["@I1@", "@F1@", "@I2@", "@S1@"]);
    }

    #[test]
    fn test_duplicate_xref_is_severe_and_keeps_first() {
        let sample = "\
            0 HEAD\n\
            0 @I1@ INDI\n\
            1 NAME First /One/\n\
            0 @I1@ INDI\n\
            1 NAME Second /One/\n\
            0 TRLR";

        let tree = Gedcom::parse_str(sample).unwrap();
        assert_eq!(tree.individuals().len(), 1);
        assert_eq!(
            tree.individual("@I1@").unwrap().full_name().as_deref(),
            Some("First One")
        );
        assert!(tree.diagnostics.has_severe());
    }

    #[test]
    fn test_missing_xref_on_individual_is_severe() {
        let sample = "0 HEAD\n0 INDI\n1 NAME Nobody\n0 TRLR";
        let tree = Gedcom::parse_str(sample).unwrap();
        assert!(tree.individuals().is_empty());
        assert!(tree.diagnostics.has_severe());
    }

    #[test]
    fn test_verdict() {
        let tree = Gedcom::parse_str("0 HEAD\n0 @I1@ INDI\n0 TRLR").unwrap();
        assert_eq!(tree.verdict(false), Verdict::Usable);

        let empty = Tree::new();
        assert_eq!(empty.verdict(false), Verdict::Rejected);
    }

    #[test]
    fn test_stats_and_quality() {
        let sample = "\
            0 HEAD\n\
            0 @I1@ INDI\n\
            1 NAME John /Doe/\n\
            1 BIRT\n\
            2 DATE 1900\n\
            0 @I2@ INDI\n\
            1 DEAT Y\n\
            0 @F1@ FAM\n\
            0 @N1@ NOTE hello\n\
            0 TRLR";

        let tree = Gedcom::parse_str(sample).unwrap();
        let stats = tree.stats();
        assert_eq!(stats.individuals, 2);
        assert_eq!(stats.families, 1);
        assert_eq!(stats.notes, 1);

        let quality = tree.quality();
        assert_eq!(quality.individuals, 2);
        assert!((quality.name_coverage - 0.5).abs() < f64::EPSILON);
        assert!((quality.birth_coverage - 0.5).abs() < f64::EPSILON);
        assert!((quality.death_coverage - 0.5).abs() < f64::EPSILON);
    }
}
