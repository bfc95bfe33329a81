use crate::error::{ErrorKind, Result};
use crate::{BLOCK_SIZE, CARD_SIZE};
use exn::{OptionExt, ResultExt};
use fitrs::{Fits, HeaderValue, Hdu};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io::{ErrorKind as IoErrorKind, Read, Write};
use tracing::instrument;

/// Upper bound on header length. SDSS frames use two or three blocks; a
/// stream that goes on for this long without an `END` card isn't a header.
pub const MAX_HEADER_BLOCKS: usize = 64;

const SIMPLE: &[u8] = b"SIMPLE  =";
const END: &[u8] = b"END     ";

/// The primary header of a FITS file.
pub struct Header {
    hdu: Hdu,
}

impl Header {
    /// Read the primary header from the start of a stream.
    ///
    /// Consumes whole blocks only, up to and including the one holding the
    /// `END` card; the pixel data behind it is never read.
    #[instrument(level = "debug", skip(reader), fields(blocks))]
    pub fn read(mut reader: impl Read) -> Result<Self> {
        let blocks = header_blocks(&mut reader)?;
        tracing::Span::current().record("blocks", blocks.len() / BLOCK_SIZE);

        // fitrs only reads from files.
        let mut file = tempfile::NamedTempFile::new().or_raise(|| ErrorKind::Io)?;
        file.write_all(&blocks).or_raise(|| ErrorKind::Io)?;
        file.flush().or_raise(|| ErrorKind::Io)?;
        let fits = Fits::open(file.path()).or_raise(|| ErrorKind::Io)?;
        let hdu = fits.get(0).ok_or_raise(|| ErrorKind::MalformedHeader("no primary HDU".to_string()))?;
        Ok(Self { hdu })
    }

    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        self.hdu.value(keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// Look up a string-valued keyword. Trailing blanks are not significant.
    pub fn string(&self, keyword: &str) -> Result<&str> {
        match self.require(keyword)? {
            HeaderValue::CharacterString(value) => Ok(value.trim_end()),
            other => exn::bail!(mismatch(keyword, other)),
        }
    }

    /// Look up a numeric keyword; integers are widened.
    pub fn float(&self, keyword: &str) -> Result<f64> {
        let value = self.require(keyword)?;
        as_f64(value).ok_or_raise(|| mismatch(keyword, value))
    }

    pub fn integer(&self, keyword: &str) -> Result<i64> {
        match self.require(keyword)? {
            HeaderValue::IntegerNumber(value) => Ok(i64::from(*value)),
            other => exn::bail!(mismatch(keyword, other)),
        }
    }

    /// Like [`float`](Self::float), but an absent keyword is `Ok(None)`.
    /// A present keyword of the wrong type is still an error.
    pub fn optional_float(&self, keyword: &str) -> Result<Option<f64>> {
        match self.get(keyword) {
            None => Ok(None),
            Some(value) => as_f64(value).map(Some).ok_or_raise(|| mismatch(keyword, value)),
        }
    }

    fn require(&self, keyword: &str) -> Result<&HeaderValue> {
        self.get(keyword).ok_or_raise(|| ErrorKind::MissingField(keyword.to_string()))
    }
}

impl Debug for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Header").finish_non_exhaustive()
    }
}

fn as_f64(value: &HeaderValue) -> Option<f64> {
    match value {
        HeaderValue::RealFloatingNumber(value) => Some(*value),
        HeaderValue::IntegerNumber(value) => Some(f64::from(*value)),
        _ => None,
    }
}

fn mismatch(keyword: &str, value: &HeaderValue) -> ErrorKind {
    ErrorKind::ParseError { field: keyword.to_string(), value: format!("{value:?}") }
}

/// Whole blocks from the start of `reader` through the one holding `END`.
fn header_blocks(reader: &mut impl Read) -> Result<Vec<u8>> {
    let mut blocks = Vec::with_capacity(BLOCK_SIZE * 3);
    let mut block = [0u8; BLOCK_SIZE];
    for index in 0..MAX_HEADER_BLOCKS {
        if let Err(err) = reader.read_exact(&mut block) {
            match err.kind() {
                IoErrorKind::UnexpectedEof => exn::bail!(ErrorKind::Truncated),
                _ => return Err(err).or_raise(|| ErrorKind::Io),
            }
        }
        if index == 0 && !block.starts_with(SIMPLE) {
            exn::bail!(ErrorKind::NotFits);
        }
        blocks.extend_from_slice(&block);
        if block.chunks_exact(CARD_SIZE).any(|card| card.starts_with(END)) {
            return Ok(blocks);
        }
    }
    exn::bail!(ErrorKind::MalformedHeader(format!("no END card within {MAX_HEADER_BLOCKS} blocks")))
}
