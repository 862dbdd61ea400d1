//! GEDCOM date values and the 5.5.1 date grammar.
//!
//! `DATE` payloads range from exact calendar dates (`1 JAN 1900`) through
//! approximations (`ABT 1800`), bounds (`BEF 1850`), ranges
//! (`BET 1800 AND 1810`) and periods (`FROM 1900 TO 1905`). Parsed values
//! keep the raw text; the structured form drives year extraction, range
//! resolution, and tolerance-based semantic equivalence.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-letter uppercase English month abbreviations, JAN..DEC.
const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// A day/month/year triple as written; only the year is mandatory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDate {
    /// Day of month, 1-31, when given.
    pub day: Option<u8>,
    /// Month 1-12, when given.
    pub month: Option<u8>,
    /// Year; dual years like `1721/22` keep the first year.
    pub year: i32,
}

impl CalendarDate {
    /// Parses `[day] [month] year` from whitespace-separated fields. Every
    /// present field must parse; "WINTER 1812" is a phrase, not a date.
    fn parse(fields: &[&str]) -> Option<CalendarDate> {
        match fields {
            [year] => Some(CalendarDate {
                day: None,
                month: None,
                year: parse_year(year)?,
            }),
            [month, year] => Some(CalendarDate {
                day: None,
                month: Some(parse_month(month)?),
                year: parse_year(year)?,
            }),
            [day, month, year] => Some(CalendarDate {
                day: Some(day.parse::<u8>().ok().filter(|d| (1..=31).contains(d))?),
                month: Some(parse_month(month)?),
                year: parse_year(year)?,
            }),
            _ => None,
        }
    }
}

fn parse_month(field: &str) -> Option<u8> {
    let upper = field.to_uppercase();
    MONTHS
        .iter()
        .position(|m| *m == upper)
        .map(|i| (i + 1) as u8)
}

fn parse_year(field: &str) -> Option<i32> {
    // Dual years ("1721/22") keep the first year; a B.C. suffix is rare
    // enough to treat as unparsed.
    let head = field.split('/').next()?;
    let year: i32 = head.parse().ok()?;
    if (0..=9999).contains(&year) {
        Some(year)
    } else {
        None
    }
}

/// The structured reading of a date payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DateKind {
    /// `[day] [month] year`
    Exact(CalendarDate),
    /// `ABT date`
    About(CalendarDate),
    /// `CAL date`
    Calculated(CalendarDate),
    /// `EST date`
    Estimated(CalendarDate),
    /// `BEF date`
    Before(CalendarDate),
    /// `AFT date`
    After(CalendarDate),
    /// `BET date AND date`
    Between(CalendarDate, CalendarDate),
    /// `FROM date [TO date]` / `TO date`
    Period {
        /// Start of the period, if given.
        from: Option<CalendarDate>,
        /// End of the period, if given.
        to: Option<CalendarDate>,
    },
    /// Anything the grammar does not cover; the raw text is all we have.
    Phrase,
}

/// Slack applied when an approximate or bounded date is resolved to a
/// year range.
const APPROX_SLACK: i32 = 2;
const BOUND_SLACK: i32 = 5;

/// A parsed `DATE` payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DateValue {
    /// The payload exactly as written.
    pub raw: String,
    /// The structured reading.
    pub kind: DateKind,
}

impl DateValue {
    /// Parses a `DATE` payload. Never fails: text outside the grammar
    /// becomes [`DateKind::Phrase`].
    #[must_use]
    pub fn parse(raw: &str) -> DateValue {
        let kind = Self::parse_kind(raw);
        DateValue {
            raw: raw.to_string(),
            kind,
        }
    }

    fn parse_kind(raw: &str) -> DateKind {
        let upper = raw.trim().to_uppercase();
        let fields: Vec<&str> = upper.split_whitespace().collect();
        if fields.is_empty() {
            return DateKind::Phrase;
        }

        match fields[0] {
            "ABT" => Self::tail(&fields[1..]).map_or(DateKind::Phrase, DateKind::About),
            "CAL" => Self::tail(&fields[1..]).map_or(DateKind::Phrase, DateKind::Calculated),
            "EST" => Self::tail(&fields[1..]).map_or(DateKind::Phrase, DateKind::Estimated),
            "BEF" => Self::tail(&fields[1..]).map_or(DateKind::Phrase, DateKind::Before),
            "AFT" => Self::tail(&fields[1..]).map_or(DateKind::Phrase, DateKind::After),
            "BET" => {
                let and = fields.iter().position(|f| *f == "AND");
                match and {
                    Some(and) => {
                        let first = CalendarDate::parse(&fields[1..and]);
                        let second = CalendarDate::parse(&fields[and + 1..]);
                        match (first, second) {
                            (Some(a), Some(b)) => DateKind::Between(a, b),
                            _ => DateKind::Phrase,
                        }
                    }
                    None => DateKind::Phrase,
                }
            }
            "FROM" => {
                let to = fields.iter().position(|f| *f == "TO");
                match to {
                    Some(to_pos) => {
                        let from = CalendarDate::parse(&fields[1..to_pos]);
                        let to = CalendarDate::parse(&fields[to_pos + 1..]);
                        if from.is_none() && to.is_none() {
                            DateKind::Phrase
                        } else {
                            DateKind::Period { from, to }
                        }
                    }
                    None => CalendarDate::parse(&fields[1..])
                        .map_or(DateKind::Phrase, |from| DateKind::Period {
                            from: Some(from),
                            to: None,
                        }),
                }
            }
            "TO" => CalendarDate::parse(&fields[1..]).map_or(DateKind::Phrase, |to| {
                DateKind::Period {
                    from: None,
                    to: Some(to),
                }
            }),
            _ => CalendarDate::parse(&fields).map_or(DateKind::Phrase, DateKind::Exact),
        }
    }

    fn tail(fields: &[&str]) -> Option<CalendarDate> {
        CalendarDate::parse(fields)
    }

    /// True when the payload matched the date grammar.
    #[must_use]
    pub fn is_parsed(&self) -> bool {
        !matches!(self.kind, DateKind::Phrase)
    }

    /// The representative (center) year, when one can be derived.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        self.year_range().map(|(lo, hi)| lo + (hi - lo) / 2)
    }

    /// The day of month, for exact dates that carry one.
    #[must_use]
    pub fn day(&self) -> Option<u8> {
        match &self.kind {
            DateKind::Exact(d)
            | DateKind::About(d)
            | DateKind::Calculated(d)
            | DateKind::Estimated(d) => d.day,
            _ => None,
        }
    }

    /// The month, for exact dates that carry one.
    #[must_use]
    pub fn month(&self) -> Option<u8> {
        match &self.kind {
            DateKind::Exact(d)
            | DateKind::About(d)
            | DateKind::Calculated(d)
            | DateKind::Estimated(d) => d.month,
            _ => None,
        }
    }

    /// Resolves the payload to an inclusive year range. Approximations
    /// widen by ±2 years, open bounds by 5.
    #[must_use]
    pub fn year_range(&self) -> Option<(i32, i32)> {
        match &self.kind {
            DateKind::Exact(d) => Some((d.year, d.year)),
            DateKind::About(d) | DateKind::Calculated(d) | DateKind::Estimated(d) => {
                Some((d.year - APPROX_SLACK, d.year + APPROX_SLACK))
            }
            DateKind::Before(d) => Some((d.year - BOUND_SLACK, d.year)),
            DateKind::After(d) => Some((d.year, d.year + BOUND_SLACK)),
            DateKind::Between(a, b) => Some((a.year.min(b.year), a.year.max(b.year))),
            DateKind::Period { from, to } => match (from, to) {
                (Some(a), Some(b)) => Some((a.year.min(b.year), a.year.max(b.year))),
                (Some(a), None) => Some((a.year, a.year + BOUND_SLACK)),
                (None, Some(b)) => Some((b.year - BOUND_SLACK, b.year)),
                (None, None) => None,
            },
            DateKind::Phrase => None,
        }
    }

    /// Two dates are semantically equivalent when their year ranges
    /// overlap or their centers lie within `tolerance` years.
    #[must_use]
    pub fn semantically_equivalent(&self, other: &DateValue, tolerance: u32) -> bool {
        match (self.year_range(), other.year_range()) {
            (Some((lo_a, hi_a)), Some((lo_b, hi_b))) => {
                if lo_a <= hi_b && lo_b <= hi_a {
                    return true;
                }
                let center_a = lo_a + (hi_a - lo_a) / 2;
                let center_b = lo_b + (hi_b - lo_b) / 2;
                (center_a - center_b).unsigned_abs() <= tolerance
            }
            // Unparsed on either side: fall back to exact text comparison.
            _ => self.raw.trim() == other.raw.trim(),
        }
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
