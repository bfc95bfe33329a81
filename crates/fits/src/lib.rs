//! Typed keyword lookup on FITS primary headers.
//!
//! Card decoding is left to [`fitrs`]. This crate cuts the header blocks out
//! of a stream, which may be decompressing on the fly, and turns keyword
//! lookups into typed results: an absent keyword is
//! [`MissingField`](error::ErrorKind::MissingField), a value of the wrong
//! type is [`ParseError`](error::ErrorKind::ParseError).

pub mod error;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
mod header;

pub use crate::header::{Header, MAX_HEADER_BLOCKS};
pub use fitrs::HeaderValue;

/// Size of one header (or data) block in bytes.
pub const BLOCK_SIZE: usize = 2880;
/// Size of one header card in bytes.
pub const CARD_SIZE: usize = 80;
