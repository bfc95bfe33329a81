//! Registry Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A registry error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// The output path is taken; registries are never overwritten.
    #[display("output registry already exists: {}", _0.display())]
    OutputExists(#[error(not(source))] PathBuf),
    #[display("input registry does not exist: {}", _0.display())]
    InputMissing(#[error(not(source))] PathBuf),
    /// Copying the input registry, or checking either path, failed.
    #[display("filesystem error")]
    Io,
    /// A value cannot be stored, or a stored value cannot be read back.
    #[display("invalid registry data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}
