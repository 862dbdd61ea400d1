//! Individual (INDI) records.

pub mod gender;
pub mod name;

use crate::diagnostics::DiagnosticCollector;
use crate::line::Line;
use crate::types::event::EventDetail;
use crate::types::individual::{gender::Sex, name::Name};
use serde::{Deserialize, Serialize};

/// Individual (tag: INDI) represents a compilation of facts about a
/// person. The typed fields cover the query surface: primary name with
/// its decomposition, sex, birth and death, and the family links in file
/// order. The full record tree stays available through [`line`](Self::line)
/// for validation, diffing, and export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndividualRecord {
    /// Cross-reference identifier (e.g. `@I1@`).
    pub xref: String,
    /// Primary name (the first `NAME` structure), when present.
    pub name: Option<Name>,
    /// Sex per the `SEX` tag; `Unknown` when absent or nonstandard.
    pub sex: Sex,
    /// Birth event detail, when a `BIRT` structure is present.
    pub birth: Option<EventDetail>,
    /// Death event detail, when a `DEAT` structure is present.
    pub death: Option<EventDetail>,
    /// Family-as-child links (`FAMC` payloads) in file order.
    pub famc: Vec<String>,
    /// Family-as-spouse links (`FAMS` payloads) in file order.
    pub fams: Vec<String>,
    /// The underlying record tree.
    pub line: Line,
}

impl IndividualRecord {
    /// Extracts the typed view from an assembled `INDI` record.
    ///
    /// Structural oddities (a missing xref is handled by the caller)
    /// are tolerated here; the validator reports them.
    #[must_use]
    pub fn from_line(line: Line, diagnostics: &mut DiagnosticCollector) -> IndividualRecord {
        let xref = line.xref.clone().unwrap_or_default();

        let name = line.child("NAME").map(Name::from_line);
        let sex = match line.child("SEX") {
            Some(sex_line) => {
                if !Sex::is_standard(&sex_line.value) {
                    diagnostics.warning(
                        Some(sex_line.line_number),
                        format!("SEX value `{}` is not one of M, F, U", sex_line.value),
                    );
                }
                Sex::parse(&sex_line.value)
            }
            None => Sex::Unknown,
        };

        let birth = line.child("BIRT").map(EventDetail::from_line);
        let death = line.child("DEAT").map(EventDetail::from_line);

        let famc = line
            .children_tagged("FAMC")
            .map(|l| l.value.clone())
            .collect();
        let fams = line
            .children_tagged("FAMS")
            .map(|l| l.value.clone())
            .collect();

        IndividualRecord {
            xref,
            name,
            sex,
            birth,
            death,
            famc,
            fams,
            line,
        }
    }

    /// Returns the full name with slashes removed.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        self.name.as_ref().and_then(Name::full_name)
    }

    /// The given-name portion, when known.
    #[must_use]
    pub fn given_name(&self) -> Option<&str> {
        self.name.as_ref().and_then(|n| n.given.as_deref())
    }

    /// The surname portion, when known.
    #[must_use]
    pub fn surname(&self) -> Option<&str> {
        self.name.as_ref().and_then(|n| n.surname.as_deref())
    }

    /// Representative birth year, when the birth date parses.
    #[must_use]
    pub fn birth_year(&self) -> Option<i32> {
        self.birth.as_ref().and_then(EventDetail::year)
    }

    /// An individual with no `DEAT` structure counts as living.
    #[must_use]
    pub fn is_living(&self) -> bool {
        self.death.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::Gedcom;

    #[test]
    fn test_extract_individual_record() {
        let sample = "\
            0 HEAD\n\
            1 GEDC\n\
            2 VERS 5.5.1\n\
            0 @PERSON1@ INDI\n\
            1 NAME John /Doe/\n\
            1 SEX M\n\
            1 BIRT\n\
            2 DATE 1 JAN 1900\n\
            2 PLAC York\n\
            1 FAMC @F9@\n\
            1 FAMS @F1@\n\
            1 FAMS @F2@\n\
            0 TRLR";

        let tree = Gedcom::parse_str(sample).unwrap();
        let indi = tree.individual("@PERSON1@").unwrap();
        assert_eq!(indi.full_name().as_deref(), Some("John Doe"));
        assert_eq!(indi.sex, Sex::Male);
        assert_eq!(indi.birth_year(), Some(1900));
        assert_eq!(indi.famc, vec!["@F9@"]);
        assert_eq!(indi.fams, vec!["@F1@", "@F2@"]);
        assert!(indi.is_living());
    }

    #[test]
    fn test_nonstandard_sex_warns() {
        let sample = "\
            0 HEAD\n\
            0 @I1@ INDI\n\
            1 SEX X\n\
            0 TRLR";

        let tree = Gedcom::parse_str(sample).unwrap();
        let indi = tree.individual("@I1@").unwrap();
        assert_eq!(indi.sex, Sex::Unknown);
        assert!(tree.diagnostics.count(Severity::Warning) >= 1);
    }

    #[test]
    fn test_death_marks_deceased() {
        let sample = "\
            0 HEAD\n\
            0 @I1@ INDI\n\
            1 DEAT Y\n\
            0 TRLR";

        let tree = Gedcom::parse_str(sample).unwrap();
        assert!(!tree.individual("@I1@").unwrap().is_living());
    }
}
