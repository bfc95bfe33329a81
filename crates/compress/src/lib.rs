//! Transparent decompression of exposure files.
//!
//! Survey archives ship frames raw (`.fit`), gzipped (`.fit.gz`) or bzipped
//! (`.fit.bz2`). The file name says which, and the first bytes of the file
//! say which again; [`Compression::detect`] trusts the bytes.

pub mod error;
mod stream;

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;

const BZIP2_MAGIC: &[u8] = b"BZh";
const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];

/// How an exposure file is stored on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    #[default]
    None,
    /// `.bz2`
    Bzip2,
    /// `.gz`
    Gzip,
}

impl Compression {
    /// Guess from the final extension of `path`:
    /// `fpC-000094-r1-0011.fit.gz` is gzip, `fpC-000094-r1-0011.fit` is not
    /// compressed.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path.as_ref().extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gz") => Compression::Gzip,
            Some(ext) if ext.eq_ignore_ascii_case("bz2") => Compression::Bzip2,
            _ => Compression::None,
        }
    }

    /// Identify the format from the leading bytes of a stream. Anything
    /// without a known signature is taken to be uncompressed.
    #[must_use]
    pub fn from_magic(bytes: &[u8]) -> Self {
        if bytes.starts_with(GZIP_MAGIC) {
            Compression::Gzip
        } else if bytes.starts_with(BZIP2_MAGIC) {
            Compression::Bzip2
        } else {
            Compression::None
        }
    }

    /// File name suffix, including the dot; empty when uncompressed.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Bzip2 => ".bz2",
            Compression::Gzip => ".gz",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Bzip2 => "bzip2",
            Compression::Gzip => "gzip",
        }
    }
}

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
