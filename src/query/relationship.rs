//! Relationship classification between two individuals.
//!
//! Classification works from the two ancestor sets: lineal when one is an
//! ancestor of the other, collateral otherwise, with the lowest common
//! ancestor chosen to minimize the greater of the two walk depths (ties
//! broken on the smallest internal id). Degree and removal follow the
//! conventional definitions: siblings are degree 0, first cousins degree
//! 1, and a generation offset is a removal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The coarse relationship category, described from the perspective of
/// `from`: `Ancestor` means "`to` is an ancestor of `from`".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// The same individual.
    SelfSame,
    /// Spouses in some family.
    Spouse,
    /// Direct parent.
    Parent,
    /// Direct child.
    Child,
    /// Shared parents, depth 1 on both sides.
    Sibling,
    /// `to` is a lineal ancestor of `from`.
    Ancestor,
    /// `to` is a lineal descendant of `from`.
    Descendant,
    /// Collateral relatives through a common ancestor.
    Collateral,
    /// No common ancestor and no marriage connection.
    NotRelated,
}

impl RelationshipKind {
    /// Stable lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::SelfSame => "self",
            RelationshipKind::Spouse => "spouse",
            RelationshipKind::Parent => "parent",
            RelationshipKind::Child => "child",
            RelationshipKind::Sibling => "sibling",
            RelationshipKind::Ancestor => "ancestor",
            RelationshipKind::Descendant => "descendant",
            RelationshipKind::Collateral => "cousin",
            RelationshipKind::NotRelated => "none",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified relationship between two individuals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Category, from the perspective of the first individual.
    pub kind: RelationshipKind,
    /// Lineal: generation distance. Collateral: `min(d1, d2) - 1`.
    pub degree: u32,
    /// Collateral generation offset: `|d1 - d2|`.
    pub removal: u32,
    /// The lowest common ancestor's xref, for collateral relations.
    pub common_ancestor: Option<String>,
    /// Human-readable description ("first cousin once removed").
    pub description: String,
}

impl Relationship {
    pub(crate) fn lineal(kind: RelationshipKind, degree: u32) -> Relationship {
        let description = match (kind, degree) {
            (RelationshipKind::Parent, _) => "parent".to_string(),
            (RelationshipKind::Child, _) => "child".to_string(),
            (RelationshipKind::Ancestor, d) => lineal_description("parent", d),
            (RelationshipKind::Descendant, d) => lineal_description("child", d),
            _ => kind.as_str().to_string(),
        };
        Relationship {
            kind,
            degree,
            removal: 0,
            common_ancestor: None,
            description,
        }
    }

    pub(crate) fn trivial(kind: RelationshipKind) -> Relationship {
        Relationship {
            kind,
            degree: 0,
            removal: 0,
            common_ancestor: None,
            description: kind.as_str().to_string(),
        }
    }

    pub(crate) fn collateral(
        depth_from: u32,
        depth_to: u32,
        common_ancestor: String,
    ) -> Relationship {
        let degree = depth_from.min(depth_to).saturating_sub(1);
        let removal = depth_from.abs_diff(depth_to);

        if depth_from == 1 && depth_to == 1 {
            return Relationship {
                kind: RelationshipKind::Sibling,
                degree: 0,
                removal: 0,
                common_ancestor: Some(common_ancestor),
                description: "sibling".to_string(),
            };
        }

        let description = if degree == 0 {
            // Degree zero with an offset: an aunt/uncle or niece/nephew
            // line, depending on which side is closer to the ancestor.
            let base = if depth_to < depth_from {
                "aunt/uncle"
            } else {
                "niece/nephew"
            };
            if removal > 1 {
                format!("grand {base} ({removal} generations)")
            } else {
                base.to_string()
            }
        } else {
            let mut text = format!("{} cousin", ordinal(degree));
            match removal {
                0 => {}
                1 => text.push_str(" once removed"),
                2 => text.push_str(" twice removed"),
                n => {
                    text.push_str(&format!(" {n} times removed"));
                }
            }
            text
        };

        Relationship {
            kind: RelationshipKind::Collateral,
            degree,
            removal,
            common_ancestor: Some(common_ancestor),
            description,
        }
    }
}

fn lineal_description(base: &str, degree: u32) -> String {
    match degree {
        0 | 1 => base.to_string(),
        2 => format!("grand{base}"),
        n => {
            let mut text = String::new();
            for _ in 0..n - 2 {
                text.push_str("great-");
            }
            text.push_str("grand");
            text.push_str(base);
            text
        }
    }
}

fn ordinal(n: u32) -> String {
    match n {
        1 => "first".to_string(),
        2 => "second".to_string(),
        3 => "third".to_string(),
        4 => "fourth".to_string(),
        5 => "fifth".to_string(),
        n => format!("{n}th"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lineal_descriptions() {
        assert_eq!(
            Relationship::lineal(RelationshipKind::Ancestor, 2).description,
            "grandparent"
        );
        assert_eq!(
            Relationship::lineal(RelationshipKind::Ancestor, 4).description,
            "great-great-grandparent"
        );
        assert_eq!(
            Relationship::lineal(RelationshipKind::Descendant, 3).description,
            "great-grandchild"
        );
    }

    #[test]
    fn test_sibling_special_case() {
        let rel = Relationship::collateral(1, 1, "@IG1@".to_string());
        assert_eq!(rel.kind, RelationshipKind::Sibling);
        assert_eq!(rel.degree, 0);
        assert_eq!(rel.removal, 0);
    }

    #[test]
    fn test_first_cousin() {
        let rel = Relationship::collateral(2, 2, "@IG1@".to_string());
        assert_eq!(rel.kind, RelationshipKind::Collateral);
        assert_eq!(rel.degree, 1);
        assert_eq!(rel.removal, 0);
        assert_eq!(rel.description, "first cousin");
    }

    #[test]
    fn test_cousin_with_removal() {
        let rel = Relationship::collateral(3, 2, "@IG1@".to_string());
        assert_eq!(rel.degree, 1);
        assert_eq!(rel.removal, 1);
        assert_eq!(rel.description, "first cousin once removed");
    }

    #[test]
    fn test_aunt_uncle() {
        let rel = Relationship::collateral(2, 1, "@IG1@".to_string());
        assert_eq!(rel.kind, RelationshipKind::Collateral);
        assert_eq!(rel.degree, 0);
        assert_eq!(rel.removal, 1);
        assert_eq!(rel.description, "aunt/uncle");
    }
}
