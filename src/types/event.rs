//! Event details: the date and place attached to BIRT/DEAT/MARR and
//! friends.

use crate::line::Line;
use crate::types::date::DateValue;
use serde::{Deserialize, Serialize};

/// The date+place core of a GEDCOM event structure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDetail {
    /// The event tag this detail was read from (`BIRT`, `DEAT`, `MARR`, ...).
    pub tag: String,
    /// Parsed `DATE` child, when present.
    pub date: Option<DateValue>,
    /// `PLAC` child payload, as written.
    pub place: Option<String>,
}

impl EventDetail {
    /// Extracts the detail from an event line.
    #[must_use]
    pub fn from_line(line: &Line) -> EventDetail {
        EventDetail {
            tag: line.tag.clone(),
            date: line.child_value("DATE").map(DateValue::parse),
            place: line.child_value("PLAC").map(str::to_string),
        }
    }

    /// The event's representative year, when its date yields one.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        self.date.as_ref().and_then(DateValue::year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_line() {
        let mut birt = Line::new(1, None, "BIRT", "", 2);
        birt.children.push(Line::new(2, None, "DATE", "1 JAN 1900", 3));
        birt.children.push(Line::new(2, None, "PLAC", "York, England", 4));

        let detail = EventDetail::from_line(&birt);
        assert_eq!(detail.tag, "BIRT");
        assert_eq!(detail.year(), Some(1900));
        assert_eq!(detail.place.as_deref(), Some("York, England"));
    }

    #[test]
    fn test_from_bare_line() {
        let deat = Line::new(1, None, "DEAT", "Y", 2);
        let detail = EventDetail::from_line(&deat);
        assert_eq!(detail.year(), None);
        assert!(detail.place.is_none());
    }
}
