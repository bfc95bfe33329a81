//! FITS Error Types

use derive_more::{Display, Error};

/// A header error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for header operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The stream does not start with a `SIMPLE` card.
    #[display("not a FITS file")]
    NotFits,
    /// The stream ended before the `END` card.
    #[display("truncated header")]
    Truncated,
    /// The header never ends, or holds no primary HDU.
    #[display("malformed header: {_0}")]
    MalformedHeader(#[error(not(source))] String),
    /// A required keyword is not present in the header.
    #[display("missing field: {_0}")]
    MissingField(#[error(not(source))] String),
    /// A keyword is present but its value has the wrong type or format.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The keyword that failed to parse.
        field: String,
        /// The offending value, as found.
        value: String,
    },
    /// Reading the underlying stream failed.
    #[display("I/O error")]
    Io,
}
