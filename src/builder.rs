//! Builder pattern implementation for configuring GEDCOM parsing.
//!
//! The `GedcomBuilder` provides a fluent API for configuring how GEDCOM
//! files are parsed: encoding detection, size guards, schema validation,
//! and strictness of the load verdict.
//!
//! # Example
//!
//! ```rust
//! use gedkit::GedcomBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = "0 HEAD\n1 GEDC\n2 VERS 5.5.1\n0 TRLR";
//! let tree = GedcomBuilder::new()
//!     .strict_mode(false)
//!     .validate(true)
//!     .build_from_str(source)?;
//!
//! println!("Parsed {} individuals", tree.individuals().len());
//! # Ok(())
//! # }
//! ```

use crate::assembler::RecordAssembler;
use crate::diagnostics::DiagnosticCollector;
use crate::encoding;
use crate::tokenizer::{StreamTokenizer, Tokenizer, TokenizerTrait};
use crate::tree::{Tree, Verdict};
use crate::validator;
use crate::GedcomError;
use std::io::BufRead;

/// Configuration options for GEDCOM parsing.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// When true, a tree that accumulated severe diagnostics is rejected
    /// and parsing returns an error instead of a queryable tree.
    pub strict_mode: bool,

    /// When true, the schema validator runs after assembly and its
    /// diagnostics are merged into the tree.
    pub validate: bool,

    /// When true, byte inputs go through BOM/`CHAR` encoding detection.
    /// When false, UTF-8 is assumed.
    pub encoding_detection: bool,

    /// Optional maximum input size in bytes. Inputs exceeding this size
    /// cause an error before parsing begins.
    pub max_file_size: Option<usize>,

    /// Cap on retained diagnostics.
    pub diagnostics_capacity: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            validate: true,
            encoding_detection: true,
            max_file_size: None,
            diagnostics_capacity: 10_000,
        }
    }
}

/// A builder for creating and configuring a GEDCOM parser.
///
/// # Example
///
/// ```rust
/// use gedkit::GedcomBuilder;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = "0 HEAD\n1 GEDC\n2 VERS 5.5.1\n0 TRLR";
/// let tree = GedcomBuilder::new()
///     .strict_mode(true)
///     .build_from_str(source)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct GedcomBuilder {
    config: ParserConfig,
}

impl GedcomBuilder {
    /// Creates a new `GedcomBuilder` with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables strict parsing mode. In strict mode a tree
    /// with severe diagnostics is rejected.
    #[must_use]
    pub fn strict_mode(mut self, enabled: bool) -> Self {
        self.config.strict_mode = enabled;
        self
    }

    /// Enables or disables post-assembly schema validation.
    #[must_use]
    pub fn validate(mut self, enabled: bool) -> Self {
        self.config.validate = enabled;
        self
    }

    /// Enables or disables automatic encoding detection for byte inputs.
    #[must_use]
    pub fn encoding_detection(mut self, enabled: bool) -> Self {
        self.config.encoding_detection = enabled;
        self
    }

    /// Sets a maximum input size limit in bytes.
    #[must_use]
    pub fn max_file_size(mut self, size: usize) -> Self {
        self.config.max_file_size = Some(size);
        self
    }

    /// Sets the cap on retained diagnostics.
    #[must_use]
    pub fn diagnostics_capacity(mut self, capacity: usize) -> Self {
        self.config.diagnostics_capacity = capacity;
        self
    }

    /// Returns a reference to the current parser configuration.
    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses GEDCOM text.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` if the input exceeds the size limit, or if
    /// strict mode rejects the parsed tree.
    pub fn build_from_str(self, content: &str) -> Result<Tree, GedcomError> {
        self.check_size(content.len())?;

        let mut diagnostics = DiagnosticCollector::with_capacity(self.config.diagnostics_capacity);
        let mut tokenizer = Tokenizer::new(content.chars());
        match tokenizer.next_token() {
            Ok(()) => {}
            Err(err) => {
                // The very first line is malformed; assembly will recover.
                diagnostics.severe(Some(tokenizer.line), err.to_string());
                tokenizer.skip_line().ok();
            }
        }

        let records = RecordAssembler::new().assemble(&mut tokenizer, &mut diagnostics)?;
        self.finish(Tree::from_records(records, diagnostics))
    }

    /// Detects the encoding of raw bytes, decodes them, and parses.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` if decoding fails entirely, the input
    /// exceeds the size limit, or strict mode rejects the tree.
    pub fn build_from_bytes(self, bytes: &[u8]) -> Result<Tree, GedcomError> {
        self.check_size(bytes.len())?;

        let (content, detected, decode_diags) = if self.config.encoding_detection {
            encoding::decode(bytes)?
        } else {
            (
                String::from_utf8_lossy(bytes).into_owned(),
                encoding::GedcomEncoding::Utf8,
                Vec::new(),
            )
        };

        let mut tree = self.build_from_str(&content)?;
        tree.encoding = Some(detected);
        tree.diagnostics.extend(decode_diags);
        Ok(tree)
    }

    /// Parses from a buffered reader without loading the input into
    /// memory. UTF-8 only; use [`build_from_bytes`](Self::build_from_bytes)
    /// for other encodings.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` on I/O failure, non-UTF-8 input, or a
    /// strict-mode rejection.
    pub fn build_from_reader<R: BufRead>(self, reader: R) -> Result<Tree, GedcomError> {
        let mut diagnostics = DiagnosticCollector::with_capacity(self.config.diagnostics_capacity);
        let mut tokenizer = StreamTokenizer::new(reader)?;

        let records = RecordAssembler::new().assemble(&mut tokenizer, &mut diagnostics)?;
        let mut tree = Tree::from_records(records, diagnostics);
        tree.encoding = Some(encoding::GedcomEncoding::Utf8);
        self.finish(tree)
    }

    fn check_size(&self, size: usize) -> Result<(), GedcomError> {
        if let Some(max_size) = self.config.max_file_size {
            if size > max_size {
                return Err(GedcomError::FileSizeLimitExceeded { size, max_size });
            }
        }
        Ok(())
    }

    fn finish(&self, mut tree: Tree) -> Result<Tree, GedcomError> {
        if self.config.validate {
            let found = validator::validate(&tree);
            tree.diagnostics.extend(found);
        }

        if tree.verdict(self.config.strict_mode) == Verdict::Rejected {
            return Err(GedcomError::InvalidFormat(format!(
                "Tree rejected: {} severe diagnostics, {} records",
                tree.diagnostics
                    .count(crate::diagnostics::Severity::Severe),
                tree.total_records()
            )));
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let builder = GedcomBuilder::new();
        assert!(!builder.config().strict_mode);
        assert!(builder.config().validate);
        assert!(builder.config().encoding_detection);
        assert!(builder.config().max_file_size.is_none());
    }

    #[test]
    fn test_builder_fluent_api() {
        let builder = GedcomBuilder::new()
            .strict_mode(true)
            .validate(false)
            .encoding_detection(false)
            .max_file_size(1_000_000)
            .diagnostics_capacity(50);

        assert!(builder.config().strict_mode);
        assert!(!builder.config().validate);
        assert!(!builder.config().encoding_detection);
        assert_eq!(builder.config().max_file_size, Some(1_000_000));
        assert_eq!(builder.config().diagnostics_capacity, 50);
    }

    #[test]
    fn test_build_minimal() {
        let tree = GedcomBuilder::new()
            .build_from_str("0 HEAD\n1 GEDC\n2 VERS 5.5.1\n0 TRLR")
            .unwrap();
        assert_eq!(tree.version.as_deref(), Some("5.5.1"));
    }

    #[test]
    fn test_strict_mode_rejects_severe() {
        let sample = "0 HEAD\n0 INDI\n1 NAME Nobody\n0 TRLR";
        assert!(GedcomBuilder::new().build_from_str(sample).is_ok());
        let result = GedcomBuilder::new().strict_mode(true).build_from_str(sample);
        assert!(matches!(result, Err(GedcomError::InvalidFormat(_))));
    }

    #[test]
    fn test_max_file_size_exceeded() {
        let content = "0 HEAD\n".to_string() + &"0 @I1@ INDI\n".repeat(100) + "0 TRLR";
        let result = GedcomBuilder::new()
            .max_file_size(100)
            .build_from_str(&content);
        match result {
            Err(GedcomError::FileSizeLimitExceeded { size, max_size }) => {
                assert!(size > 100);
                assert_eq!(max_size, 100);
            }
            _ => panic!("Expected FileSizeLimitExceeded error"),
        }
    }

    #[test]
    fn test_build_from_bytes_detects_encoding() {
        let bytes = b"0 HEAD\n1 CHAR ANSI\n0 @I1@ INDI\n1 NAME Jos\xE9\n0 TRLR";
        let tree = GedcomBuilder::new().build_from_bytes(bytes).unwrap();
        assert_eq!(tree.encoding, Some(crate::encoding::GedcomEncoding::Ansi));
        assert_eq!(
            tree.individual("@I1@").unwrap().full_name().as_deref(),
            Some("Jos\u{e9}")
        );
    }

    #[test]
    fn test_build_from_reader() {
        let source = "0 HEAD\n0 @I1@ INDI\n1 NAME Jane /Doe/\n0 TRLR\n";
        let tree = GedcomBuilder::new()
            .build_from_reader(std::io::BufReader::new(source.as_bytes()))
            .unwrap();
        assert_eq!(tree.individuals().len(), 1);
    }

    #[test]
    fn test_validation_can_be_disabled() {
        // Dangling HUSB triggers a validator warning only when enabled.
        let sample = "0 HEAD\n0 @F1@ FAM\n1 HUSB @I404@\n0 TRLR";
        let with = GedcomBuilder::new().build_from_str(sample).unwrap();
        let without = GedcomBuilder::new()
            .validate(false)
            .build_from_str(sample)
            .unwrap();
        assert!(with.diagnostics.total() > without.diagnostics.total());
    }
}
