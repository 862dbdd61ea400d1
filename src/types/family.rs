//! Family (FAM) records.
//!
//! HUSB & WIFE are pointers to individuals; no gender checking is done on
//! parse — the validator reports reciprocity problems instead.

use crate::diagnostics::DiagnosticCollector;
use crate::line::Line;
use crate::types::event::EventDetail;
use serde::{Deserialize, Serialize};

/// Family (tag: FAM), representing a relationship between individuals and
/// the ordered set of their children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FamilyRecord {
    /// Cross-reference identifier (e.g. `@F1@`).
    pub xref: String,
    /// `HUSB` pointer, at most one.
    pub husband: Option<String>,
    /// `WIFE` pointer, at most one.
    pub wife: Option<String>,
    /// `CHIL` pointers in file order; order is significant.
    pub children: Vec<String>,
    /// Marriage event detail, when a `MARR` structure is present.
    pub marriage: Option<EventDetail>,
    /// The underlying record tree.
    pub line: Line,
}

impl FamilyRecord {
    /// Extracts the typed view from an assembled `FAM` record. A second
    /// `HUSB` or `WIFE` keeps the first pointer and warns.
    #[must_use]
    pub fn from_line(line: Line, diagnostics: &mut DiagnosticCollector) -> FamilyRecord {
        let xref = line.xref.clone().unwrap_or_default();

        let mut husband = None;
        let mut wife = None;
        for child in &line.children {
            match child.tag.as_str() {
                "HUSB" => {
                    if husband.is_some() {
                        diagnostics.warning(
                            Some(child.line_number),
                            format!("Family {xref} has more than one HUSB; keeping the first"),
                        );
                    } else {
                        husband = Some(child.value.clone());
                    }
                }
                "WIFE" => {
                    if wife.is_some() {
                        diagnostics.warning(
                            Some(child.line_number),
                            format!("Family {xref} has more than one WIFE; keeping the first"),
                        );
                    } else {
                        wife = Some(child.value.clone());
                    }
                }
                _ => {}
            }
        }

        let children = line
            .children_tagged("CHIL")
            .map(|l| l.value.clone())
            .collect();
        let marriage = line.child("MARR").map(EventDetail::from_line);

        FamilyRecord {
            xref,
            husband,
            wife,
            children,
            marriage,
            line,
        }
    }

    /// Both spouse pointers in husband-then-wife order, nulls omitted.
    #[must_use]
    pub fn spouses(&self) -> Vec<&str> {
        self.husband
            .iter()
            .chain(self.wife.iter())
            .map(String::as_str)
            .collect()
    }

    /// True when `xref` is the husband or wife of this family.
    #[must_use]
    pub fn has_spouse(&self, xref: &str) -> bool {
        self.husband.as_deref() == Some(xref) || self.wife.as_deref() == Some(xref)
    }

    /// The other spouse relative to `xref`, when both slots are known.
    #[must_use]
    pub fn spouse_of(&self, xref: &str) -> Option<&str> {
        if self.husband.as_deref() == Some(xref) {
            self.wife.as_deref()
        } else if self.wife.as_deref() == Some(xref) {
            self.husband.as_deref()
        } else {
            None
        }
    }
}
