/*!
`gedkit` is a Rust toolkit for GEDCOM 5.5.1 genealogy data: a streaming
parser, a queryable relationship graph, duplicate detection, and a
semantic diff engine.

The library works with GEDCOM (GEnealogical Data Communication), a
text-based format widely supported by genealogy software for storing and
exchanging family history data. `gedkit` parses this text format into a
record [`Tree`], projects it into a typed relationship [`Graph`], and
answers relationship, filtering, analytics, duplicate-detection, and diff
queries over it.

Basic example:

```rust
use gedkit::{Gedcom, Graph, QueryEngine};

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let source = "\
    0 HEAD\n\
    1 GEDC\n\
    2 VERS 5.5.1\n\
    0 @I1@ INDI\n\
    1 NAME John /Doe/\n\
    1 FAMS @F1@\n\
    0 @I2@ INDI\n\
    1 NAME Mary /Doe/\n\
    1 FAMS @F1@\n\
    0 @F1@ FAM\n\
    1 HUSB @I1@\n\
    1 WIFE @I2@\n\
    0 TRLR";

// Parse into the record tree, then project into a graph.
let tree = Gedcom::parse_str(source)?;
let graph = Graph::build(&tree)?;

// Query relationships.
let engine = QueryEngine::new(&graph);
let spouses = engine.spouses("@I1@")?;
assert_eq!(spouses[0].xref, "@I2@");
# Ok(())
# }
```

Large files can be parsed without loading them into memory via
[`GedcomBuilder::build_from_reader`], and graphs can be persisted through
the hybrid storage backend (see [`graph::GraphConfig`]).
*/

#![deny(clippy::pedantic)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

pub mod assembler;
pub mod builder;
pub mod cancel;
pub mod dedup;
pub mod diagnostics;
pub mod diff;
pub mod encoding;
mod error;
pub mod export;
pub mod graph;
pub mod line;
pub mod query;
pub mod tokenizer;
pub mod tree;
pub mod types;
pub mod validator;

pub use builder::{GedcomBuilder, ParserConfig};
pub use cancel::CancelToken;
pub use diagnostics::{Diagnostic, DiagnosticCollector, Severity};
pub use error::GedcomError;
pub use graph::Graph;
pub use query::QueryEngine;
pub use tree::{Tree, Verdict};

use std::io::BufRead;
use std::path::Path;

/// The main entry point for parsing GEDCOM inputs with default settings.
///
/// For configured parsing (strict mode, size guards, validation toggles)
/// use [`GedcomBuilder`].
pub struct Gedcom;

impl Gedcom {
    /// Parses GEDCOM text with default settings.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` when nothing parseable is found.
    pub fn parse_str(source: &str) -> Result<Tree, GedcomError> {
        GedcomBuilder::new().build_from_str(source)
    }

    /// Detects the encoding of raw bytes, decodes, and parses.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` when decoding fails or nothing parseable
    /// is found.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Tree, GedcomError> {
        GedcomBuilder::new().build_from_bytes(bytes)
    }

    /// Streams a UTF-8 GEDCOM file from a reader.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` on I/O failure or non-UTF-8 input.
    pub fn parse_reader<R: BufRead>(reader: R) -> Result<Tree, GedcomError> {
        GedcomBuilder::new().build_from_reader(reader)
    }

    /// Reads and parses a GEDCOM file from disk, with encoding detection.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` on I/O failure or undecodable content.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Tree, GedcomError> {
        let bytes = std::fs::read(path)?;
        Self::parse_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_document() {
        let sample = "\
           0 HEAD\n\
           1 GEDC\n\
           2 VERS 5.5.1\n\
           0 TRLR";

        let tree = Gedcom::parse_str(sample).unwrap();
        assert_eq!(tree.version.as_deref(), Some("5.5.1"));
        assert!(tree.header.is_some());
        assert!(tree.trailer.is_some());
    }

    #[test]
    fn test_parse_all_record_types() {
        let sample = "\
            0 HEAD\n\
            1 GEDC\n\
            2 VERS 5.5.1\n\
            0 @SUBMITTER@ SUBM\n\
            0 @PERSON1@ INDI\n\
            0 @FAMILY1@ FAM\n\
            0 @R1@ REPO\n\
            0 @SOURCE1@ SOUR\n\
            0 @MEDIA1@ OBJE\n\
            0 @N1@ NOTE A shared note\n\
            0 _MYOWNTAG This is a non-standard tag. Not recommended but allowed\n\
            0 TRLR";

        let tree = Gedcom::parse_str(sample).unwrap();

        assert_eq!(tree.individuals().len(), 1);
        assert_eq!(tree.individuals()[0].xref, "@PERSON1@");

        assert_eq!(tree.families().len(), 1);
        assert_eq!(tree.families()[0].xref, "@FAMILY1@");

        assert!(tree.other("@SUBMITTER@").is_some());
        assert!(tree.other("@R1@").is_some());
        assert!(tree.other("@SOURCE1@").is_some());
        assert!(tree.other("@MEDIA1@").is_some());
        assert_eq!(tree.other("@N1@").unwrap().value(), "A shared note");

        assert_eq!(tree.unmodeled().len(), 1);
    }
}
