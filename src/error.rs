use std::fmt;

/// Represents errors that can occur while parsing, building, or querying
/// GEDCOM data.
#[derive(Debug)]
pub enum GedcomError {
    /// A parsing error, with the line number and a message.
    ParseError {
        /// The line number where the error occurred.
        line: u32,
        /// The error message.
        message: String,
    },
    /// An invalid GEDCOM format error (schema-level).
    InvalidFormat(String),
    /// An I/O error.
    IoError(std::io::Error),
    /// An encoding error.
    EncodingError(String),
    /// A cross-reference identifier that is absent from the tree or graph.
    NotFound(String),
    /// The operation was aborted by a cancellation token or timeout.
    Cancelled,
    /// The hybrid storage backend failed or violated a constraint.
    Backend(String),
    /// A graph integrity invariant was violated during build. The graph
    /// produced by a failed build must be discarded.
    InvariantViolation(String),
    /// The input exceeded the configured file size limit.
    FileSizeLimitExceeded {
        /// Actual input size in bytes.
        size: usize,
        /// Configured maximum in bytes.
        max_size: usize,
    },
}

impl GedcomError {
    /// Wraps any storage-layer error into a [`GedcomError::Backend`].
    pub(crate) fn backend<E: fmt::Display>(err: E) -> Self {
        GedcomError::Backend(err.to_string())
    }
}

impl fmt::Display for GedcomError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GedcomError::ParseError { line, message } => {
                write!(f, "Parse error at line {line}: {message}")
            }
            GedcomError::InvalidFormat(msg) => write!(f, "Invalid GEDCOM format: {msg}"),
            GedcomError::IoError(err) => write!(f, "IO error: {err}"),
            GedcomError::EncodingError(msg) => write!(f, "Encoding error: {msg}"),
            GedcomError::NotFound(xref) => write!(f, "Record not found: {xref}"),
            GedcomError::Cancelled => write!(f, "Operation cancelled"),
            GedcomError::Backend(msg) => write!(f, "Storage backend error: {msg}"),
            GedcomError::InvariantViolation(msg) => {
                write!(f, "Graph invariant violation: {msg}")
            }
            GedcomError::FileSizeLimitExceeded { size, max_size } => {
                write!(
                    f,
                    "File size {size} exceeds the configured limit of {max_size} bytes"
                )
            }
        }
    }
}

impl std::error::Error for GedcomError {}

impl From<std::io::Error> for GedcomError {
    fn from(err: std::io::Error) -> Self {
        GedcomError::IoError(err)
    }
}

impl From<rusqlite::Error> for GedcomError {
    fn from(err: rusqlite::Error) -> Self {
        GedcomError::Backend(err.to_string())
    }
}
