//! Change-set types produced by the diff engine.

use crate::types::RecordKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a field differs between the two trees.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Present only on the right side.
    Added,
    /// Present only on the left side.
    Removed,
    /// Both present with materially different values.
    Modified,
    /// Both present; the values differ only cosmetically or within the
    /// configured tolerance.
    SemanticallyEquivalent,
}

/// One field-level change of a matched record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Dotted field path, e.g. `BIRT.DATE`.
    pub path: String,
    /// Left-side value.
    pub old: Option<String>,
    /// Right-side value.
    pub new: Option<String>,
    /// The kind of change.
    pub kind: ChangeKind,
}

/// A timestamped audit entry. The engine stamps the time and field;
/// author and reason are left for callers to populate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Wall clock at diff time.
    pub timestamp: DateTime<Utc>,
    /// Dotted field path.
    pub field: String,
    /// Left-side value.
    pub old: Option<String>,
    /// Right-side value.
    pub new: Option<String>,
    /// The kind of change.
    pub kind: ChangeKind,
    /// Optional author attribution.
    pub author: Option<String>,
    /// Optional free-form reason.
    pub reason: Option<String>,
}

/// Reference to a record that exists on only one side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    /// The record's xref on its own side.
    pub xref: String,
    /// The record kind.
    pub kind: RecordKind,
}

/// A matched record with at least one field-level change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModifiedRecord {
    /// Xref on the left side.
    pub xref: String,
    /// Xref on the right side (differs under content matching).
    pub matched_xref: String,
    /// The record kind.
    pub kind: RecordKind,
    /// Field changes in field order; empty at summary detail level.
    pub changes: Vec<FieldChange>,
    /// Per-change history entries, when history tracking is on.
    pub history: Vec<HistoryEntry>,
}

/// Aggregate counts over a change set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Records only on the right.
    pub added: usize,
    /// Records only on the left.
    pub removed: usize,
    /// Matched records with changes.
    pub modified: usize,
    /// Matched records with no changes.
    pub unchanged: usize,
    /// Total field-level changes.
    pub field_changes: usize,
    /// Field changes tagged semantically equivalent.
    pub semantically_equivalent: usize,
}

/// The result of diffing two trees.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Records present only in the right tree, in its file order.
    pub added: Vec<RecordRef>,
    /// Records present only in the left tree, in its file order.
    pub removed: Vec<RecordRef>,
    /// Matched records with changes, in left file order.
    pub modified: Vec<ModifiedRecord>,
    /// Matched records without changes; populated only when the
    /// configuration asks for them.
    pub unchanged: Vec<RecordRef>,
    /// Aggregate counts.
    pub summary: DiffSummary,
    /// Change-set-scope history, when history tracking is on.
    pub history: Vec<HistoryEntry>,
}

impl ChangeSet {
    /// True when the two trees matched completely.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Serializes the change set to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `GedcomError::Backend` when serialization fails.
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String, crate::GedcomError> {
        serde_json::to_string_pretty(self).map_err(crate::GedcomError::backend)
    }
}
