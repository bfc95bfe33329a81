use crate::Compression;
use crate::error::{ErrorKind, Result};
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use exn::ResultExt;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{BufRead, Read, Write};
use tracing::instrument;

impl Compression {
    /// Peek at the start of `reader` without consuming anything.
    pub fn detect(reader: &mut impl BufRead) -> Result<Self> {
        let head = reader.fill_buf().or_raise(|| ErrorKind::Io)?;
        Ok(Self::from_magic(head))
    }

    /// Decompress lazily as `reader` is read. Reading only a frame's header
    /// inflates only the header blocks.
    ///
    /// ```
    /// use std::io::{Cursor, Read};
    /// use skyreg_compress::Compression;
    ///
    /// let compressed = Compression::Gzip.compress(b"SIMPLE  =                    T").unwrap();
    /// let mut reader = Compression::Gzip.wrap_reader(Cursor::new(compressed));
    /// let mut keyword = [0u8; 6];
    /// reader.read_exact(&mut keyword).unwrap();
    /// assert_eq!(&keyword, b"SIMPLE");
    /// ```
    pub fn wrap_reader<'a, R: Read + 'a>(&self, reader: R) -> Box<dyn Read + 'a> {
        match self {
            Compression::None => Box::new(reader),
            Compression::Bzip2 => Box::new(BzDecoder::new(reader)),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
        }
    }

    /// Compress `input` in memory, at the fastest level.
    #[instrument(level = "trace", skip(input), fields(format = %self, input_size = input.len()))]
    pub fn compress(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 2);
        match self {
            Compression::None => output.extend_from_slice(input),
            Compression::Bzip2 => {
                let mut encoder = BzEncoder::new(&mut output, bzip2::Compression::fast());
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(&mut output, flate2::Compression::fast());
                encoder.write_all(input).or_raise(|| ErrorKind::Io)?;
                encoder.finish().or_raise(|| ErrorKind::Io)?;
            },
        }
        Ok(output)
    }
}
