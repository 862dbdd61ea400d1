//! The SEX tag value domain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sex of an individual per the 5.5.1 value set {M, F, U}.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    /// `M`
    Male,
    /// `F`
    Female,
    /// `U`, missing, or unrecognized.
    #[default]
    Unknown,
}

impl Sex {
    /// Parses a `SEX` payload; anything outside {M, F, U} maps to
    /// `Unknown` (the validator warns about it separately).
    #[must_use]
    pub fn parse(value: &str) -> Sex {
        match value.trim().to_uppercase().as_str() {
            "M" => Sex::Male,
            "F" => Sex::Female,
            _ => Sex::Unknown,
        }
    }

    /// True for a payload the 5.5.1 value set covers.
    #[must_use]
    pub fn is_standard(value: &str) -> bool {
        matches!(value.trim().to_uppercase().as_str(), "M" | "F" | "U" | "")
    }

    /// The GEDCOM payload letter.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
            Sex::Unknown => "U",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "Male"),
            Sex::Female => write!(f, "Female"),
            Sex::Unknown => write!(f, "Unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Sex::parse("M"), Sex::Male);
        assert_eq!(Sex::parse("f"), Sex::Female);
        assert_eq!(Sex::parse("U"), Sex::Unknown);
        assert_eq!(Sex::parse("X"), Sex::Unknown);
    }

    #[test]
    fn test_is_standard() {
        assert!(Sex::is_standard("M"));
        assert!(Sex::is_standard("u"));
        assert!(!Sex::is_standard("X"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Sex::Male.to_string(), "Male");
        assert_eq!(Sex::Unknown.as_str(), "U");
    }
}
