//! Serializes a [`Tree`] back to GEDCOM 5.5.1 text.
//!
//! This is a serializer, not an editor: records are re-emitted in file
//! order from their line trees. Values with embedded newlines become
//! `CONT` lines; values longer than a physical line allows are split into
//! `CONC` chunks.

use crate::line::Line;
use crate::tree::Tree;
use crate::types::RecordKind;
use crate::GedcomError;
use std::fmt::Write as _;
use std::io::Write;

/// Longest value chunk emitted on one physical line, leaving headroom for
/// the level/xref/tag prefix within the 255-character line limit.
const MAX_VALUE_CHUNK: usize = 240;

/// Serializes the tree to a string.
#[must_use]
pub fn to_string(tree: &Tree) -> String {
    let mut out = String::new();
    if let Some(header) = &tree.header {
        write_record(&mut out, header);
    }
    for (kind, xref) in tree.record_order() {
        let line = match kind {
            RecordKind::Individual => tree.individual(xref).map(|r| &r.line),
            RecordKind::Family => tree.family(xref).map(|r| &r.line),
            _ => tree.other(xref).map(|r| &r.line),
        };
        if let Some(line) = line {
            write_record(&mut out, line);
        }
    }
    for line in tree.unmodeled() {
        write_record(&mut out, line);
    }
    if let Some(trailer) = &tree.trailer {
        write_record(&mut out, trailer);
    } else {
        out.push_str("0 TRLR\n");
    }
    out
}

/// Serializes the tree to a writer.
///
/// # Errors
///
/// Returns a `GedcomError` on I/O failure.
pub fn write<W: Write>(tree: &Tree, writer: &mut W) -> Result<(), GedcomError> {
    writer.write_all(to_string(tree).as_bytes())?;
    Ok(())
}

fn write_record(out: &mut String, line: &Line) {
    write_line(out, line);
    for child in &line.children {
        write_record(out, child);
    }
}

fn write_line(out: &mut String, line: &Line) {
    // First physical segment: up to the first newline, then chunked.
    let mut segments = line.value.split('\n');
    let first = segments.next().unwrap_or("");
    let (head, head_rest) = split_chunk(first);

    let _ = write!(out, "{}", line.level);
    if let Some(xref) = &line.xref {
        let _ = write!(out, " {xref}");
    }
    let _ = write!(out, " {}", line.tag);
    if !head.is_empty() {
        let _ = write!(out, " {head}");
    }
    out.push('\n');

    let continuation_level = line.level + 1;
    emit_concs(out, continuation_level, head_rest);
    for segment in segments {
        let (chunk, rest) = split_chunk(segment);
        let _ = writeln!(out, "{continuation_level} CONT {chunk}");
        emit_concs(out, continuation_level, rest);
    }
}

fn emit_concs(out: &mut String, level: u8, mut rest: &str) {
    while !rest.is_empty() {
        let (chunk, next) = split_chunk(rest);
        let _ = writeln!(out, "{level} CONC {chunk}");
        rest = next;
    }
}

/// Splits off the leading chunk that fits on one physical line, on a char
/// boundary.
fn split_chunk(value: &str) -> (&str, &str) {
    if value.len() <= MAX_VALUE_CHUNK {
        return (value, "");
    }
    let mut cut = MAX_VALUE_CHUNK;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    value.split_at(cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gedcom;

    #[test]
    fn test_round_trip_simple() {
        let source = "\
            0 HEAD\n\
            1 GEDC\n\
            2 VERS 5.5.1\n\
            0 @I1@ INDI\n\
            1 NAME John /Doe/\n\
            1 SEX M\n\
            1 BIRT\n\
            2 DATE 1 JAN 1900\n\
            2 PLAC York\n\
            0 @F1@ FAM\n\
            1 HUSB @I1@\n\
            0 TRLR\n";

        let tree = Gedcom::parse_str(source).unwrap();
        let exported = to_string(&tree);
        assert_eq!(exported, source);
    }

    #[test]
    fn test_multiline_value_becomes_cont() {
        let source = "\
            0 HEAD\n\
            0 @N1@ NOTE first\n\
            1 CONT second\n\
            0 TRLR\n";
        let tree = Gedcom::parse_str(source).unwrap();
        assert_eq!(tree.other("@N1@").unwrap().value(), "first\nsecond");

        let exported = to_string(&tree);
        assert_eq!(exported, source);
    }

    #[test]
    fn test_long_value_becomes_conc() {
        let long = "x".repeat(500);
        let source = format!("0 HEAD\n0 @N1@ NOTE {long}\n0 TRLR\n");
        let tree = Gedcom::parse_str(&source).unwrap();
        let exported = to_string(&tree);

        assert!(exported.lines().all(|l| l.len() <= 255));
        assert!(exported.contains("CONC"));

        // Re-parsing restores the folded value.
        let reparsed = Gedcom::parse_str(&exported).unwrap();
        assert_eq!(reparsed.other("@N1@").unwrap().value(), long);
    }

    #[test]
    fn test_missing_trailer_synthesized() {
        let tree = Gedcom::parse_str("0 HEAD\n0 @I1@ INDI\n1 NAME X /Y/").unwrap();
        let exported = to_string(&tree);
        assert!(exported.ends_with("0 TRLR\n"));
    }
}
