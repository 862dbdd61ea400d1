//! Personal names and their given/surname decomposition.
//!
//! The primary `NAME` payload carries the surname between slashes
//! (`John /Doe/`). `GIVN`/`SURN`/`SPFX` pieces, when present, take
//! precedence over decomposition of the payload.

use crate::line::Line;
use serde::{Deserialize, Serialize};

/// A personal name with its structured pieces.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Name {
    /// The full name value with surname in slashes (e.g. "John /Doe/").
    pub value: Option<String>,
    /// Given name (tag: GIVN), or decomposed from the payload.
    pub given: Option<String>,
    /// Surname (tag: SURN), or the `/…/` span of the payload.
    pub surname: Option<String>,
    /// Surname prefix such as "van" or "de" (tag: SPFX).
    pub surname_prefix: Option<String>,
    /// Nickname (tag: NICK).
    pub nickname: Option<String>,
}

impl Name {
    /// Extracts a name from a `NAME` line, preferring structured pieces
    /// over payload decomposition.
    #[must_use]
    pub fn from_line(line: &Line) -> Name {
        let value = if line.value.is_empty() {
            None
        } else {
            Some(line.value.clone())
        };

        let (decomposed_given, decomposed_surname) = value
            .as_deref()
            .map_or((None, None), Name::decompose);

        Name {
            given: line
                .child_value("GIVN")
                .map(str::to_string)
                .or(decomposed_given),
            surname: line
                .child_value("SURN")
                .map(str::to_string)
                .or(decomposed_surname),
            surname_prefix: line.child_value("SPFX").map(str::to_string),
            nickname: line.child_value("NICK").map(str::to_string),
            value,
        }
    }

    /// Splits a `given /Surname/ suffix` payload into given and surname
    /// parts. Text after the closing slash joins the given part.
    fn decompose(value: &str) -> (Option<String>, Option<String>) {
        let Some(open) = value.find('/') else {
            let trimmed = value.trim();
            return (
                (!trimmed.is_empty()).then(|| trimmed.to_string()),
                None,
            );
        };
        let after = &value[open + 1..];
        let close = after.find('/');

        let surname = match close {
            Some(close) => after[..close].trim(),
            None => after.trim(),
        };
        let mut given = value[..open].trim().to_string();
        if let Some(close) = close {
            let suffix = after[close + 1..].trim();
            if !suffix.is_empty() {
                if !given.is_empty() {
                    given.push(' ');
                }
                given.push_str(suffix);
            }
        }

        (
            (!given.is_empty()).then_some(given),
            (!surname.is_empty()).then(|| surname.to_string()),
        )
    }

    /// Returns the full name with slashes removed.
    ///
    /// This extracts the clean name from the GEDCOM format
    /// (e.g. "John /Doe/" becomes "John Doe").
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match &self.value {
            Some(value) => {
                let cleaned: String = value.replace('/', " ");
                let squeezed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
                (!squeezed.is_empty()).then_some(squeezed)
            }
            None => match (&self.given, &self.surname) {
                (Some(given), Some(surname)) => Some(format!("{given} {surname}")),
                (Some(given), None) => Some(given.clone()),
                (None, Some(surname)) => Some(surname.clone()),
                (None, None) => None,
            },
        }
    }

    /// Lowercased full name with whitespace squeezed, for indexes and
    /// comparison.
    #[must_use]
    pub fn normalized(&self) -> Option<String> {
        self.full_name().map(|n| n.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_line(payload: &str) -> Line {
        Line::new(1, None, "NAME", payload, 2)
    }

    #[test]
    fn test_decompose_standard() {
        let name = Name::from_line(&name_line("John /Doe/"));
        assert_eq!(name.given.as_deref(), Some("John"));
        assert_eq!(name.surname.as_deref(), Some("Doe"));
        assert_eq!(name.full_name().as_deref(), Some("John Doe"));
    }

    #[test]
    fn test_decompose_with_suffix() {
        let name = Name::from_line(&name_line("John /Doe/ Jr."));
        assert_eq!(name.given.as_deref(), Some("John Jr."));
        assert_eq!(name.surname.as_deref(), Some("Doe"));
    }

    #[test]
    fn test_decompose_no_slashes() {
        let name = Name::from_line(&name_line("Pocahontas"));
        assert_eq!(name.given.as_deref(), Some("Pocahontas"));
        assert_eq!(name.surname, None);
    }

    #[test]
    fn test_decompose_unclosed_slash() {
        let name = Name::from_line(&name_line("Mary /Smith"));
        assert_eq!(name.surname.as_deref(), Some("Smith"));
        assert_eq!(name.given.as_deref(), Some("Mary"));
    }

    #[test]
    fn test_pieces_take_precedence() {
        let mut line = name_line("J. /D./");
        line.children.push(Line::new(2, None, "GIVN", "John", 3));
        line.children.push(Line::new(2, None, "SURN", "Doe", 4));
        let name = Name::from_line(&line);
        assert_eq!(name.given.as_deref(), Some("John"));
        assert_eq!(name.surname.as_deref(), Some("Doe"));
        // The payload keeps its original form.
        assert_eq!(name.value.as_deref(), Some("J. /D./"));
    }

    #[test]
    fn test_normalized() {
        let name = Name::from_line(&name_line("John /DOE/"));
        assert_eq!(name.normalized().as_deref(), Some("john doe"));
    }
}
