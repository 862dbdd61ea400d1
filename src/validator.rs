//! Structural validation of an assembled tree against the 5.5.1 schema.
//!
//! Every check emits a severity-tagged diagnostic; validation never
//! aborts. Xref uniqueness and the SEX value domain are enforced during
//! record insertion, so they are not re-checked here.

use crate::diagnostics::{Diagnostic, Severity};
use crate::tree::Tree;
use crate::types::date::DateValue;
use crate::types::RecordKind;

/// Runs every validation check over the tree and returns the resulting
/// diagnostics. Callers typically merge them into the tree's collector.
#[must_use]
pub fn validate(tree: &Tree) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    check_envelope(tree, &mut out);
    check_references(tree, &mut out);
    check_reciprocity(tree, &mut out);
    check_dates(tree, &mut out);
    out
}

fn push(out: &mut Vec<Diagnostic>, severity: Severity, line: Option<u32>, message: String) {
    out.push(Diagnostic {
        severity,
        line,
        message,
    });
}

/// HEAD/TRLR presence and their no-xref rule.
fn check_envelope(tree: &Tree, out: &mut Vec<Diagnostic>) {
    match &tree.header {
        Some(header) => {
            if header.xref.is_some() {
                push(
                    out,
                    Severity::Warning,
                    Some(header.line_number),
                    "HEAD record must not carry a cross-reference identifier".to_string(),
                );
            }
        }
        None => push(
            out,
            Severity::Severe,
            None,
            "Missing HEAD record".to_string(),
        ),
    }

    match &tree.trailer {
        Some(trailer) => {
            if trailer.xref.is_some() {
                push(
                    out,
                    Severity::Warning,
                    Some(trailer.line_number),
                    "TRLR record must not carry a cross-reference identifier".to_string(),
                );
            }
        }
        None => push(
            out,
            Severity::Warning,
            None,
            "Missing TRLR record at end of file".to_string(),
        ),
    }
}

/// FAMC/FAMS/HUSB/WIFE/CHIL must resolve to records of the expected kind.
fn check_references(tree: &Tree, out: &mut Vec<Diagnostic>) {
    for individual in tree.individuals() {
        for (tag, target) in individual
            .famc
            .iter()
            .map(|x| ("FAMC", x))
            .chain(individual.fams.iter().map(|x| ("FAMS", x)))
        {
            match tree.kind_of(target) {
                Some(RecordKind::Family) => {}
                Some(other) => push(
                    out,
                    Severity::Warning,
                    Some(individual.line.line_number),
                    format!(
                        "{} {tag} {target} resolves to a {other} record, not a family",
                        individual.xref
                    ),
                ),
                None => push(
                    out,
                    Severity::Warning,
                    Some(individual.line.line_number),
                    format!("{} {tag} {target} does not resolve", individual.xref),
                ),
            }
        }
    }

    for family in tree.families() {
        let members = family
            .husband
            .iter()
            .map(|x| ("HUSB", x))
            .chain(family.wife.iter().map(|x| ("WIFE", x)))
            .chain(family.children.iter().map(|x| ("CHIL", x)));
        for (tag, target) in members {
            match tree.kind_of(target) {
                Some(RecordKind::Individual) => {}
                Some(other) => push(
                    out,
                    Severity::Warning,
                    Some(family.line.line_number),
                    format!(
                        "{} {tag} {target} resolves to a {other} record, not an individual",
                        family.xref
                    ),
                ),
                None => push(
                    out,
                    Severity::Warning,
                    Some(family.line.line_number),
                    format!("{} {tag} {target} does not resolve", family.xref),
                ),
            }
        }
    }
}

/// HUSB/WIFE must be mirrored by FAMS on the individual; CHIL by FAMC.
fn check_reciprocity(tree: &Tree, out: &mut Vec<Diagnostic>) {
    for family in tree.families() {
        for spouse in family.spouses() {
            if let Some(individual) = tree.individual(spouse) {
                if !individual.fams.iter().any(|f| f == &family.xref) {
                    push(
                        out,
                        Severity::Warning,
                        Some(family.line.line_number),
                        format!(
                            "{} names spouse {spouse}, but {spouse} has no FAMS {} back-link",
                            family.xref, family.xref
                        ),
                    );
                }
            }
        }
        for child in &family.children {
            if let Some(individual) = tree.individual(child) {
                if !individual.famc.iter().any(|f| f == &family.xref) {
                    push(
                        out,
                        Severity::Warning,
                        Some(family.line.line_number),
                        format!(
                            "{} names child {child}, but {child} has no FAMC {} back-link",
                            family.xref, family.xref
                        ),
                    );
                }
            }
        }
    }

    for individual in tree.individuals() {
        for fams in &individual.fams {
            if let Some(family) = tree.family(fams) {
                if !family.has_spouse(&individual.xref) {
                    push(
                        out,
                        Severity::Warning,
                        Some(individual.line.line_number),
                        format!(
                            "{} has FAMS {fams}, but {fams} does not name it as a spouse",
                            individual.xref
                        ),
                    );
                }
            }
        }
        for famc in &individual.famc {
            if let Some(family) = tree.family(famc) {
                if !family.children.iter().any(|c| c == &individual.xref) {
                    push(
                        out,
                        Severity::Warning,
                        Some(individual.line.line_number),
                        format!(
                            "{} has FAMC {famc}, but {famc} does not name it as a child",
                            individual.xref
                        ),
                    );
                }
            }
        }
    }
}

/// Every non-empty DATE payload must parse under the date grammar.
fn check_dates(tree: &Tree, out: &mut Vec<Diagnostic>) {
    let mut check_record = |record_line: &crate::line::Line| {
        record_line.walk(&mut |line| {
            if line.tag == "DATE" && !line.value.is_empty() {
                let parsed = DateValue::parse(&line.value);
                if !parsed.is_parsed() {
                    out.push(Diagnostic {
                        severity: Severity::Warning,
                        line: Some(line.line_number),
                        message: format!("Date `{}` does not match the date grammar", line.value),
                    });
                }
            }
            true
        });
    };

    for individual in tree.individuals() {
        check_record(&individual.line);
    }
    for family in tree.families() {
        check_record(&family.line);
    }
}
