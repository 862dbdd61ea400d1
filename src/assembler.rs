//! Folds the token stream into hierarchical records.
//!
//! The assembler is a stack machine: the stack mirrors the open ancestry of
//! the line being read. `CONC`/`CONT` tokens are consumed directly into the
//! value of the line on top of the stack and never become children. Lines
//! whose level has no valid parent are dropped with a warning; malformed
//! lines are skipped with a severe diagnostic. Assembly never aborts on
//! bad input — only I/O and encoding failures propagate.

use crate::diagnostics::DiagnosticCollector;
use crate::line::{is_valid_tag, is_valid_xref, Line};
use crate::tokenizer::{Token, TokenizerTrait};
use crate::GedcomError;

/// A line as read from the tokenizer, before it finds its parent.
struct Pending {
    line: Line,
    parent: Option<usize>,
}

/// Assembles level-0 record trees from a token stream.
///
/// The assembler stage is sequential: the stack-based nesting semantics
/// depend on source order.
pub struct RecordAssembler {
    nodes: Vec<Pending>,
    /// Indices into `nodes`; the top is the current parent.
    stack: Vec<usize>,
    records: Vec<Line>,
}

impl RecordAssembler {
    /// Creates an assembler with an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            stack: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Consumes the token stream and returns the assembled level-0 records
    /// in file order.
    ///
    /// # Errors
    ///
    /// Returns a `GedcomError` only for I/O or encoding failures from the
    /// underlying tokenizer; malformed content becomes diagnostics.
    pub fn assemble<T: TokenizerTrait>(
        mut self,
        tokenizer: &mut T,
        diagnostics: &mut DiagnosticCollector,
    ) -> Result<Vec<Line>, GedcomError> {
        loop {
            match read_line_tuple(tokenizer, diagnostics)? {
                Some(line) => self.push_line(line, diagnostics),
                None => break,
            }
        }
        self.finalize_open_record();
        Ok(self.records)
    }

    /// Feeds one assembled line into the stack machine.
    fn push_line(&mut self, line: Line, diagnostics: &mut DiagnosticCollector) {
        // Continuations fold into the value of the open line; they are
        // never stored as children.
        if line.tag == "CONC" || line.tag == "CONT" {
            match self.stack.last() {
                Some(&top) => {
                    let target = &mut self.nodes[top].line.value;
                    if line.tag == "CONT" {
                        target.push('\n');
                    }
                    target.push_str(&line.value);
                }
                None => diagnostics.warning(
                    Some(line.line_number),
                    format!("{} continuation with no open line; dropped", line.tag),
                ),
            }
            return;
        }

        if line.level == 0 {
            self.finalize_open_record();
            self.nodes.push(Pending { line, parent: None });
            self.stack.push(0);
            return;
        }

        if self.nodes.is_empty() {
            diagnostics.warning(
                Some(line.line_number),
                format!("Line `{}` appears before any record; dropped", line.tag),
            );
            return;
        }

        // Pop until the top is a plausible parent.
        while let Some(&top) = self.stack.last() {
            if self.nodes[top].line.level >= line.level {
                self.stack.pop();
            } else {
                break;
            }
        }

        match self.stack.last() {
            Some(&top) if self.nodes[top].line.level == line.level - 1 => {
                let index = self.nodes.len();
                self.nodes.push(Pending {
                    line,
                    parent: Some(top),
                });
                self.stack.push(index);
            }
            _ => {
                diagnostics.warning(
                    Some(line.line_number),
                    format!(
                        "Line `{}` at level {} has no parent at level {}; dropped",
                        line.tag,
                        line.level,
                        line.level - 1
                    ),
                );
            }
        }
    }

    /// Converts the pending flat nodes into an owned record tree.
    fn finalize_open_record(&mut self) {
        let nodes = std::mem::take(&mut self.nodes);
        self.stack.clear();
        if nodes.is_empty() {
            return;
        }

        let mut parents: Vec<Option<usize>> = Vec::with_capacity(nodes.len());
        let mut lines: Vec<Option<Line>> = Vec::with_capacity(nodes.len());
        for pending in nodes {
            parents.push(pending.parent);
            lines.push(Some(pending.line));
        }

        // Attach children back-to-front: a node's subtree is complete by
        // the time the node itself is attached. Attaching in reverse
        // leaves every child list reversed, so flip it just before use.
        for index in (1..lines.len()).rev() {
            let mut line = lines[index].take().unwrap_or_default();
            line.children.reverse();
            if let Some(parent) = parents[index] {
                if let Some(parent_line) = lines[parent].as_mut() {
                    parent_line.children.push(line);
                }
            }
        }

        if let Some(mut root) = lines[0].take() {
            root.children.reverse();
            self.records.push(root);
        }
    }
}

/// Reads one `(level, xref?, tag, value)` tuple, skipping malformed
/// lines. Returns `None` at end of input.
fn read_line_tuple<T: TokenizerTrait>(
    tokenizer: &mut T,
    diagnostics: &mut DiagnosticCollector,
) -> Result<Option<Line>, GedcomError> {
    loop {
        if tokenizer.done() {
            return Ok(None);
        }

        let level = match tokenizer.current_token() {
            Token::Level(n) => *n,
            Token::EOF => return Ok(None),
            other => {
                diagnostics.severe(
                    Some(tokenizer.line()),
                    format!("Expected level number, found {other:?}; line skipped"),
                );
                recover(tokenizer, diagnostics)?;
                continue;
            }
        };
        let line_number = tokenizer.line();

        if let Err(err) = tokenizer.next_token() {
            report_and_recover(tokenizer, diagnostics, err)?;
            continue;
        }

        let mut xref = None;
        if let Token::Pointer(pointer) = tokenizer.current_token() {
            let pointer = pointer.to_string();
            if !is_valid_xref(&pointer) {
                diagnostics.warning(
                    Some(line_number),
                    format!("Cross-reference `{pointer}` does not match @[A-Z0-9_]{{1,22}}@"),
                );
            }
            xref = Some(pointer);
            if let Err(err) = tokenizer.next_token() {
                report_and_recover(tokenizer, diagnostics, err)?;
                continue;
            }
        }

        let tag = match tokenizer.current_token() {
            Token::Tag(tag) | Token::CustomTag(tag) => tag.to_string(),
            // A line that ended after its pointer: the tokenizer already
            // sits on the next line's level, no skipping needed.
            Token::Level(_) | Token::EOF => {
                diagnostics.severe(Some(line_number), "Line has no tag; skipped");
                continue;
            }
            other => {
                diagnostics.severe(
                    Some(line_number),
                    format!("Expected tag, found {other:?}; line skipped"),
                );
                recover(tokenizer, diagnostics)?;
                continue;
            }
        };
        if !is_valid_tag(&tag) {
            diagnostics.warning(
                Some(line_number),
                format!("Tag `{tag}` does not match [A-Z0-9_]{{1,31}}"),
            );
        }
        if let Err(err) = tokenizer.next_token() {
            report_and_recover(tokenizer, diagnostics, err)?;
            continue;
        }

        let value = match tokenizer.current_token() {
            Token::LineValue(value) => {
                let value = value.to_string();
                if let Err(err) = tokenizer.next_token() {
                    report_and_recover(tokenizer, diagnostics, err)?;
                }
                value
            }
            // Tokenizers always emit a value token; anything else means
            // the machine already sits on the next line.
            _ => String::new(),
        };

        return Ok(Some(Line::new(level, xref, tag, value, line_number)));
    }
}

/// Reports a tokenizer error and skips forward to the next line start.
/// I/O and encoding failures stay fatal.
fn report_and_recover<T: TokenizerTrait>(
    tokenizer: &mut T,
    diagnostics: &mut DiagnosticCollector,
    err: GedcomError,
) -> Result<(), GedcomError> {
    match err {
        GedcomError::ParseError { line, message } => {
            diagnostics.severe(Some(line), format!("{message}; line skipped"));
            recover(tokenizer, diagnostics)
        }
        err @ (GedcomError::IoError(_) | GedcomError::EncodingError(_)) => Err(err),
        err => {
            diagnostics.severe(Some(tokenizer.line()), err.to_string());
            recover(tokenizer, diagnostics)
        }
    }
}

/// Skips lines until the tokenizer is back in sync on a level number.
fn recover<T: TokenizerTrait>(
    tokenizer: &mut T,
    diagnostics: &mut DiagnosticCollector,
) -> Result<(), GedcomError> {
    loop {
        match tokenizer.skip_line() {
            Ok(()) => return Ok(()),
            Err(GedcomError::ParseError { line, message }) => {
                diagnostics.severe(Some(line), format!("{message}; line skipped"));
            }
            Err(other) => return Err(other),
        }
    }
}

impl Default for RecordAssembler {
    fn default() -> Self {
        Self::new()
    }
}
