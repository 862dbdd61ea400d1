//! Data structures representing the parsed contents of a GEDCOM file.

pub mod date;
pub mod event;
pub mod family;
pub mod individual;
pub mod place;

use crate::line::Line;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cross-reference identifier (e.g. `@I1@`).
pub type Xref = String;

/// The record kinds of GEDCOM 5.5.1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// `HEAD`, exactly one, first record.
    Header,
    /// `TRLR`, exactly one, last record.
    Trailer,
    /// `INDI`
    Individual,
    /// `FAM`
    Family,
    /// `NOTE`
    Note,
    /// `SOUR`
    Source,
    /// `REPO`
    Repository,
    /// `SUBM`
    Submitter,
    /// `OBJE`
    Multimedia,
}

impl RecordKind {
    /// Maps a level-0 tag to its record kind.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<RecordKind> {
        match tag {
            "HEAD" => Some(RecordKind::Header),
            "TRLR" => Some(RecordKind::Trailer),
            "INDI" => Some(RecordKind::Individual),
            "FAM" => Some(RecordKind::Family),
            "NOTE" => Some(RecordKind::Note),
            "SOUR" => Some(RecordKind::Source),
            "REPO" => Some(RecordKind::Repository),
            "SUBM" => Some(RecordKind::Submitter),
            "OBJE" => Some(RecordKind::Multimedia),
            _ => None,
        }
    }

    /// The level-0 tag for the kind.
    #[must_use]
    pub const fn as_tag(&self) -> &'static str {
        match self {
            RecordKind::Header => "HEAD",
            RecordKind::Trailer => "TRLR",
            RecordKind::Individual => "INDI",
            RecordKind::Family => "FAM",
            RecordKind::Note => "NOTE",
            RecordKind::Source => "SOUR",
            RecordKind::Repository => "REPO",
            RecordKind::Submitter => "SUBM",
            RecordKind::Multimedia => "OBJE",
        }
    }

    /// True for kinds that must carry a unique xref.
    #[must_use]
    pub const fn requires_xref(&self) -> bool {
        !matches!(self, RecordKind::Header | RecordKind::Trailer)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

/// A record of a kind the toolkit does not model field-by-field. It is
/// anchored by its xref and keeps the full record tree for value
/// extraction, diffing, and export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Cross-reference identifier, when the record carried one.
    pub xref: Option<Xref>,
    /// The record kind.
    pub kind: RecordKind,
    /// The underlying record tree.
    pub line: Line,
}

impl RawRecord {
    /// The record payload (a NOTE record's text lives in its own value).
    #[must_use]
    pub fn value(&self) -> &str {
        &self.line.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_round_trip() {
        for kind in [
            RecordKind::Header,
            RecordKind::Trailer,
            RecordKind::Individual,
            RecordKind::Family,
            RecordKind::Note,
            RecordKind::Source,
            RecordKind::Repository,
            RecordKind::Submitter,
            RecordKind::Multimedia,
        ] {
            assert_eq!(RecordKind::from_tag(kind.as_tag()), Some(kind));
        }
        assert_eq!(RecordKind::from_tag("SUBN"), None);
    }

    #[test]
    fn test_xref_requirement() {
        assert!(RecordKind::Individual.requires_xref());
        assert!(!RecordKind::Header.requires_xref());
        assert!(!RecordKind::Trailer.requires_xref());
    }
}
