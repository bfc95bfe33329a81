//! Ingest Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.
//!
//! Two kinds of failure reach the walker. Problems with one exposure file
//! (unreadable, bad header, no usable WCS) are counted and skipped; problems
//! with the registry or the directory listing end the walk.

use derive_more::{Display, Error};
use skyreg_astro::error::{Error as AstroError, ErrorKind as AstroErrorKind};
use skyreg_fits::error::{Error as FitsError, ErrorKind as FitsErrorKind};

/// An ingest error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for ingest operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq)]
pub enum ErrorKind {
    /// The file could not be opened or read (including corrupt compression).
    #[display("cannot read file")]
    Io,
    /// A required header keyword is absent.
    #[display("missing header field: {_0}")]
    MissingField(#[error(not(source))] String),
    /// A header keyword is present but unusable.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The keyword that failed to parse.
        field: String,
        /// The offending value, as found.
        value: String,
    },
    /// The header itself is not valid FITS.
    #[display("malformed header: {_0}")]
    MalformedHeader(FitsErrorKind),
    /// The header's world coordinates cannot be turned into a sky footprint.
    #[display("cannot place image on the sky: {_0}")]
    Footprint(AstroErrorKind),
    /// The observation time cannot be represented or rendered.
    #[display("invalid observation time: {_0}")]
    Timestamp(AstroErrorKind),
    /// A run directory could not be listed.
    #[display("cannot list run directory: {_0}")]
    Listing(#[error(not(source))] String),
    /// The registry failed; nothing more can be recorded.
    #[display("registry error")]
    Registry,
}

impl ErrorKind {
    /// Convert a header error, keeping the FITS crate's frame as a child in
    /// the error tree. Missing and unparsable keywords keep their own kinds.
    #[track_caller]
    pub fn header(err: FitsError) -> Error {
        let kind = match &*err {
            FitsErrorKind::MissingField(field) => ErrorKind::MissingField(field.clone()),
            FitsErrorKind::ParseError { field, value } => {
                ErrorKind::ParseError { field: field.clone(), value: value.clone() }
            },
            FitsErrorKind::Io => ErrorKind::Io,
            other => ErrorKind::MalformedHeader(other.clone()),
        };
        err.raise(kind)
    }

    #[track_caller]
    pub fn footprint(err: AstroError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Footprint(inner))
    }

    #[track_caller]
    pub fn timestamp(err: AstroError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Timestamp(inner))
    }
}
