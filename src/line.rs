//! The hierarchical line model underlying every GEDCOM record.
//!
//! A [`Line`] is one logical line of the source file together with its
//! subordinate lines. Continuation lines (`CONC`/`CONT`) never appear as
//! children — the assembler folds them into the parent's value. Records
//! are level-0 lines; typed accessors over them live in [`crate::types`].

use serde::{Deserialize, Serialize};

/// Matches the xref production `@[A-Z0-9_]{1,22}@`.
#[must_use]
pub fn is_valid_xref(xref: &str) -> bool {
    let bytes = xref.as_bytes();
    if bytes.len() < 3 || bytes.len() > 24 {
        return false;
    }
    if bytes[0] != b'@' || bytes[bytes.len() - 1] != b'@' {
        return false;
    }
    bytes[1..bytes.len() - 1]
        .iter()
        .all(|&b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// Matches the tag production `[A-Z0-9_]{1,31}` (leading underscore marks
/// a user-defined tag).
#[must_use]
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag.len() <= 31
        && tag
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// One logical GEDCOM line and its subordinate lines.
///
/// Children are owned and ordered as they appear in the source; order
/// within a repeated tag is significant (e.g. `CHIL` order). Upward
/// navigation is by traversal context rather than stored parent pointers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Depth within the record tree; 0 for record anchors.
    pub level: u8,
    /// Cross-reference identifier, present on level-0 record anchors.
    pub xref: Option<String>,
    /// The tag, e.g. `INDI`, `BIRT`, `DATE`.
    pub tag: String,
    /// The line value with continuations already folded in.
    pub value: String,
    /// Subordinate lines in source order.
    pub children: Vec<Line>,
    /// Originating physical line number, preserved for diagnostics.
    pub line_number: u32,
}

impl Line {
    /// Creates a line with no children.
    #[must_use]
    pub fn new(level: u8, xref: Option<String>, tag: impl Into<String>, value: impl Into<String>, line_number: u32) -> Self {
        Line {
            level,
            xref,
            tag: tag.into(),
            value: value.into(),
            children: Vec::new(),
            line_number,
        }
    }

    /// True when the tag begins with an underscore (user-defined).
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.tag.starts_with('_')
    }

    /// The first child with the given tag, if any.
    #[must_use]
    pub fn child(&self, tag: &str) -> Option<&Line> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All children with the given tag, in source order.
    pub fn children_tagged<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Line> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// The value of the first child with the given tag, if present and
    /// non-empty.
    #[must_use]
    pub fn child_value(&self, tag: &str) -> Option<&str> {
        self.child(tag)
            .map(|c| c.value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// Descends along a tag path, first-match at each step.
    ///
    /// ```rust
    /// use gedkit::line::Line;
    ///
    /// let mut birt = Line::new(1, None, "BIRT", "", 2);
    /// birt.children.push(Line::new(2, None, "DATE", "1 JAN 1900", 3));
    /// let mut indi = Line::new(0, Some("@I1@".into()), "INDI", "", 1);
    /// indi.children.push(birt);
    ///
    /// assert_eq!(indi.at(&["BIRT", "DATE"]).unwrap().value, "1 JAN 1900");
    /// ```
    #[must_use]
    pub fn at(&self, path: &[&str]) -> Option<&Line> {
        let mut current = self;
        for tag in path {
            current = current.child(tag)?;
        }
        Some(current)
    }

    /// Total number of lines in this subtree, including self.
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Line::subtree_len).sum::<usize>()
    }

    /// Depth-first pre-order visit of the subtree. The visitor returns
    /// `false` to stop descending below a line.
    pub fn walk<F>(&self, visit: &mut F)
    where
        F: FnMut(&Line) -> bool,
    {
        if visit(self) {
            for child in &self.children {
                child.walk(visit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xref_validation() {
        assert!(is_valid_xref("@I1@"));
        assert!(is_valid_xref("@FAM_22@"));
        assert!(is_valid_xref("@A234567890123456789012@")); // 22 inner chars
        assert!(!is_valid_xref("@A2345678901234567890123@")); // 23 inner chars
        assert!(!is_valid_xref("@@"));
        assert!(!is_valid_xref("@i1@")); // lowercase
        assert!(!is_valid_xref("I1"));
        assert!(!is_valid_xref("@I 1@"));
    }

    #[test]
    fn test_tag_validation() {
        assert!(is_valid_tag("INDI"));
        assert!(is_valid_tag("_UID"));
        assert!(!is_valid_tag(""));
        assert!(!is_valid_tag("indi"));
        assert!(!is_valid_tag(&"X".repeat(32)));
    }

    #[test]
    fn test_child_navigation() {
        let mut indi = Line::new(0, Some("@I1@".into()), "INDI", "", 1);
        indi.children.push(Line::new(1, None, "NAME", "John /Doe/", 2));
        indi.children.push(Line::new(1, None, "FAMS", "@F1@", 3));
        indi.children.push(Line::new(1, None, "FAMS", "@F2@", 4));

        assert_eq!(indi.child_value("NAME"), Some("John /Doe/"));
        assert_eq!(indi.child("SEX"), None);
        let fams: Vec<&str> = indi
            .children_tagged("FAMS")
            .map(|l| l.value.as_str())
            .collect();
        assert_eq!(fams, vec!["@F1@", "@F2@"]);
    }

    #[test]
    fn test_subtree_len_and_walk() {
        let mut birt = Line::new(1, None, "BIRT", "", 2);
        birt.children.push(Line::new(2, None, "DATE", "1900", 3));
        let mut indi = Line::new(0, Some("@I1@".into()), "INDI", "", 1);
        indi.children.push(birt);

        assert_eq!(indi.subtree_len(), 3);

        let mut seen = Vec::new();
        indi.walk(&mut |line| {
            seen.push(line.tag.clone());
            true
        });
        assert_eq!(seen, vec!["INDI", "BIRT", "DATE"]);
    }
}
