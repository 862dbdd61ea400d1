//! Severity-tagged diagnostics accumulated during parse and validation.
//!
//! Parse-time and validation-time issues never abort processing; they are
//! collected here and reported in aggregate. Callers decide whether a tree
//! with `Severe` diagnostics is acceptable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a single diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Cosmetic or stylistic observation.
    Hint,
    /// Informational, no action required.
    Info,
    /// Questionable data that was still accepted.
    Warning,
    /// Structural damage; the affected line or record was skipped.
    Severe,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Hint => write!(f, "hint"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Severe => write!(f, "severe"),
        }
    }
}

/// A single diagnostic message with its origin line, when known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// How serious the issue is.
    pub severity: Severity,
    /// Physical line number in the source file, when the issue maps to one.
    pub line: Option<u32>,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {}): {}", self.severity, line, self.message),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}

/// Default cap on retained diagnostics. Counts keep accumulating past the
/// cap; only the messages themselves are dropped.
const DEFAULT_CAPACITY: usize = 10_000;

/// A bounded collector of diagnostics with per-severity counters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiagnosticCollector {
    entries: Vec<Diagnostic>,
    capacity: usize,
    dropped: usize,
    counts: [usize; 4],
}

impl Default for DiagnosticCollector {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl DiagnosticCollector {
    /// Creates a collector retaining at most `capacity` diagnostics.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
            dropped: 0,
            counts: [0; 4],
        }
    }

    /// Records a diagnostic.
    pub fn push(&mut self, severity: Severity, line: Option<u32>, message: impl Into<String>) {
        self.counts[severity as usize] += 1;
        if self.entries.len() < self.capacity {
            self.entries.push(Diagnostic {
                severity,
                line,
                message: message.into(),
            });
        } else {
            self.dropped += 1;
        }
    }

    /// Records a warning diagnostic.
    pub fn warning(&mut self, line: Option<u32>, message: impl Into<String>) {
        self.push(Severity::Warning, line, message);
    }

    /// Records a severe diagnostic.
    pub fn severe(&mut self, line: Option<u32>, message: impl Into<String>) {
        self.push(Severity::Severe, line, message);
    }

    /// Records an informational diagnostic.
    pub fn info(&mut self, line: Option<u32>, message: impl Into<String>) {
        self.push(Severity::Info, line, message);
    }

    /// Records a hint diagnostic.
    pub fn hint(&mut self, line: Option<u32>, message: impl Into<String>) {
        self.push(Severity::Hint, line, message);
    }

    /// The retained diagnostics, in the order they were recorded.
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Total diagnostics recorded at the given severity, including any
    /// whose messages were dropped past the capacity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.counts[severity as usize]
    }

    /// Total diagnostics recorded across all severities.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Number of diagnostics whose messages were dropped due to the cap.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// True if any severe diagnostic was recorded.
    #[must_use]
    pub fn has_severe(&self) -> bool {
        self.count(Severity::Severe) > 0
    }

    /// Merges another collector's entries into this one.
    pub fn extend(&mut self, other: Vec<Diagnostic>) {
        for diag in other {
            self.push(diag.severity, diag.line, diag.message);
        }
    }
}
