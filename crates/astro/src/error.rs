//! Astronomy Error Types

use derive_more::{Display, Error};

/// An astronomy error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for astronomy operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An instant falls outside the representable range (roughly 1678-2262).
    #[display("timestamp out of range")]
    OutOfRange,
    /// The timescale name is not one of `tai`, `utc`, `tt`.
    #[display("unknown timescale: {_0}")]
    UnknownTimescale(#[error(not(source))] String),
    /// A header keyword needed to build the WCS is absent or malformed.
    #[display("invalid WCS header")]
    Header,
    /// The header describes a projection other than gnomonic.
    #[display("unsupported projection: {_0}")]
    UnsupportedProjection(#[error(not(source))] String),
    /// The pixel-to-intermediate transform cannot be inverted.
    #[display("singular pixel transform")]
    SingularTransform,
    /// Vertices do not describe a convex polygon smaller than a hemisphere.
    #[display("invalid polygon: {_0}")]
    InvalidPolygon(#[error(not(source))] String),
    /// A pixelization needs at least one tile per face edge.
    #[display("invalid pixelization resolution: {_0}")]
    InvalidResolution(#[error(not(source))] u32),
}
