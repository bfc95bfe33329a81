//! Read what the registry needs from an exposure's primary header.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use skyreg_astro::{DateTime, Timescale, Wcs};
use skyreg_compress::Compression;
use skyreg_fits::Header;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use time::{Date, Month, PrimitiveDateTime, Time};
use tracing::{instrument, warn};

const NANOS_DIGITS: usize = 9;

/// Header-derived facts about one exposure.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// Exposure duration, seconds (`EXPTIME`).
    pub exp_time: f64,
    /// Start of the exposure (`DATE-OBS` + `TAIHMS`, both TAI).
    pub observed: DateTime,
    /// Image width in pixels (`NAXIS1`).
    pub width: u32,
    /// Image height in pixels (`NAXIS2`).
    pub height: u32,
    pub wcs: Wcs,
}

/// Open `path`, decompress as needed and read its primary header. Only the
/// header blocks are ever decompressed.
///
/// `expected` is what the file name claims; the file's own signature wins
/// when the two disagree.
#[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub fn read_metadata(path: impl AsRef<Path>, expected: Compression) -> Result<Metadata> {
    let file = File::open(path.as_ref()).or_raise(|| ErrorKind::Io)?;
    let mut reader = BufReader::new(file);
    let compression = Compression::detect(&mut reader).or_raise(|| ErrorKind::Io)?;
    if compression != expected {
        warn!(%expected, found = %compression, "compression does not match file name");
    }
    let header = Header::read(compression.wrap_reader(reader)).map_err(ErrorKind::header)?;
    Metadata::from_header(&header)
}

impl Metadata {
    pub fn from_header(header: &Header) -> Result<Self> {
        let exp_time = header.float("EXPTIME").map_err(ErrorKind::header)?;
        let date = header.string("DATE-OBS").map_err(ErrorKind::header)?;
        let time = header.string("TAIHMS").map_err(ErrorKind::header)?;
        Ok(Self {
            exp_time,
            observed: observation_time(date, time)?,
            width: dimension(header, "NAXIS1")?,
            height: dimension(header, "NAXIS2")?,
            wcs: Wcs::from_header(header).map_err(ErrorKind::footprint)?,
        })
    }
}

fn dimension(header: &Header, keyword: &str) -> Result<u32> {
    let value = header.integer(keyword).map_err(ErrorKind::header)?;
    u32::try_from(value)
        .ok()
        .filter(|pixels| *pixels > 0)
        .ok_or_raise(|| ErrorKind::ParseError { field: keyword.to_string(), value: value.to_string() })
}

/// The TAI instant for a `YYYY-MM-DD` date and an `HH:MM:SS[.fff…]` time of
/// day. Fractional seconds are kept to the nanosecond; further digits are
/// dropped.
pub(crate) fn observation_time(date: &str, time: &str) -> Result<DateTime> {
    let bad_date = || ErrorKind::ParseError { field: "DATE-OBS".to_string(), value: date.to_string() };
    let bad_time = || ErrorKind::ParseError { field: "TAIHMS".to_string(), value: time.to_string() };

    let mut parts = date.trim().splitn(3, '-');
    let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next()) else {
        exn::bail!(bad_date());
    };
    let year = year.parse::<i32>().or_raise(bad_date)?;
    let month = month.parse::<u8>().ok().and_then(|m| Month::try_from(m).ok()).ok_or_raise(bad_date)?;
    let day = day.parse::<u8>().or_raise(bad_date)?;
    let date = Date::from_calendar_date(year, month, day).or_raise(bad_date)?;

    let mut parts = time.trim().splitn(3, ':');
    let (Some(hour), Some(minute), Some(second)) = (parts.next(), parts.next(), parts.next()) else {
        exn::bail!(bad_time());
    };
    let (whole, fraction) = second.split_once('.').unwrap_or((second, ""));
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        exn::bail!(bad_time());
    }
    let hms = Time::from_hms(
        hour.parse::<u8>().or_raise(bad_time)?,
        minute.parse::<u8>().or_raise(bad_time)?,
        whole.parse::<u8>().or_raise(bad_time)?,
    )
    .or_raise(bad_time)?;
    let nanos = fraction.bytes().chain(std::iter::repeat(b'0')).take(NANOS_DIGITS).fold(0_i64, |acc, digit| {
        acc * 10 + i64::from(digit - b'0')
    });

    DateTime::from_civil(PrimitiveDateTime::new(date, hms), Timescale::Tai)
        .map_err(ErrorKind::timestamp)?
        .checked_add_nanos(nanos)
        .ok_or_raise(|| ErrorKind::Timestamp(skyreg_astro::error::ErrorKind::OutOfRange))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rstest::rstest;
    use skyreg_fits::fixture::{self, Card, Literal};

    pub(crate) const SCALE: f64 = 0.396 / 3600.0;

    /// A plausible fpC primary header centred on `(ra, dec)`, in degrees.
    pub(crate) fn frame_cards(ra: f64, dec: f64) -> Vec<Card> {
        vec![
            Card::new("SIMPLE", Literal::Logical(true)),
            Card::new("BITPIX", Literal::Integer(16)),
            Card::new("NAXIS", Literal::Integer(2)),
            Card::new("NAXIS1", Literal::Integer(2048)),
            Card::new("NAXIS2", Literal::Integer(1489)),
            Card::new("EXPTIME", Literal::Float(53.907456)),
            Card::new("DATE-OBS", Literal::String("1998-09-19".into())),
            Card::new("TAIHMS", Literal::String("05:57:45.21".into())),
            Card::new("CTYPE1", Literal::String("RA---TAN".into())),
            Card::new("CTYPE2", Literal::String("DEC--TAN".into())),
            Card::new("CRVAL1", Literal::Float(ra)),
            Card::new("CRVAL2", Literal::Float(dec)),
            Card::new("CRPIX1", Literal::Float(1024.5)),
            Card::new("CRPIX2", Literal::Float(745.0)),
            Card::new("CD1_1", Literal::Float(0.0)),
            Card::new("CD1_2", Literal::Float(SCALE)),
            Card::new("CD2_1", Literal::Float(SCALE)),
            Card::new("CD2_2", Literal::Float(0.0)),
        ]
    }

    pub(crate) fn without(cards: Vec<Card>, keyword: &str) -> Vec<Card> {
        cards.into_iter().filter(|card| card.keyword != keyword).collect()
    }

    #[test]
    fn test_from_header() {
        let header = fixture::header(&frame_cards(195.0, 2.5));
        let metadata = Metadata::from_header(&header).unwrap();
        assert_eq!(metadata.exp_time, 53.907456);
        assert_eq!((metadata.width, metadata.height), (2048, 1489));
        assert_eq!(metadata.observed.to_civil_string(Timescale::Tai).unwrap(), "1998-09-19T05:57:45.210000000");
        // TAI - UTC was 31 s throughout 1998.
        assert_eq!(metadata.observed.to_civil_string(Timescale::Utc).unwrap(), "1998-09-19T05:57:14.210000000");
        let centre = metadata.wcs.pixel_to_sky(1023.5, 744.0);
        assert!((centre.ra().to_degrees() - 195.0).abs() < 1e-9);
    }

    #[rstest]
    #[case("EXPTIME")]
    #[case("DATE-OBS")]
    #[case("TAIHMS")]
    #[case("NAXIS1")]
    #[case("NAXIS2")]
    fn test_missing_field(#[case] keyword: &str) {
        let header = fixture::header(&without(frame_cards(195.0, 2.5), keyword));
        let err = Metadata::from_header(&header).unwrap_err();
        assert_eq!(*err, ErrorKind::MissingField(keyword.to_string()));
    }

    #[test]
    fn test_missing_wcs() {
        let header = fixture::header(&without(frame_cards(195.0, 2.5), "CRVAL1"));
        let err = Metadata::from_header(&header).unwrap_err();
        assert!(matches!(*err, ErrorKind::Footprint(_)));
    }

    #[test]
    fn test_zero_width() {
        let mut cards = without(frame_cards(195.0, 2.5), "NAXIS1");
        cards.push(Card::new("NAXIS1", Literal::Integer(0)));
        let err = Metadata::from_header(&fixture::header(&cards)).unwrap_err();
        assert_eq!(*err, ErrorKind::ParseError { field: "NAXIS1".into(), value: "0".into() });
    }

    #[rstest]
    #[case("2020-01-01", "12:00:00.5", "2020-01-01T12:00:00.500000000")]
    #[case("2020-01-01", "12:00:00", "2020-01-01T12:00:00.000000000")]
    #[case("1998-09-19", "05:57:45.29", "1998-09-19T05:57:45.290000000")]
    #[case("1998-09-19", "23:59:59.9999999999", "1998-09-19T23:59:59.999999999")]
    #[case("1998-09-19", " 5:07:03.125 ", "1998-09-19T05:07:03.125000000")]
    fn test_observation_time(#[case] date: &str, #[case] time: &str, #[case] expected: &str) {
        let observed = observation_time(date, time).unwrap();
        assert_eq!(observed.to_civil_string(Timescale::Tai).unwrap(), expected);
    }

    #[rstest]
    #[case("2020-01-01", "12:00", "TAIHMS")]
    #[case("2020-01-01", "25:00:00", "TAIHMS")]
    #[case("2020-01-01", "12:00:00.5x", "TAIHMS")]
    #[case("2020-01-01", "12:00:-1", "TAIHMS")]
    #[case("2020-13-01", "12:00:00", "DATE-OBS")]
    #[case("2020-02-30", "12:00:00", "DATE-OBS")]
    #[case("01/01/98", "12:00:00", "DATE-OBS")]
    fn test_observation_time_invalid(#[case] date: &str, #[case] time: &str, #[case] field: &str) {
        let err = observation_time(date, time).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ParseError { field: f, .. } if f == field));
    }

    #[test]
    fn test_read_metadata_from_compressed_file() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = fixture::encode(&frame_cards(195.0, 2.5));
        for compression in [Compression::None, Compression::Gzip, Compression::Bzip2] {
            let path = dir.path().join(format!("frame.fit{}", compression.extension()));
            std::fs::write(&path, compression.compress(&bytes).unwrap()).unwrap();
            let metadata = read_metadata(&path, compression).unwrap();
            assert_eq!(metadata.exp_time, 53.907456);
        }
    }

    #[test]
    fn test_read_metadata_trusts_signature() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = fixture::encode(&frame_cards(195.0, 2.5));
        // Inflated in place but never renamed.
        let path = dir.path().join("frame.fit.gz");
        std::fs::write(&path, &bytes).unwrap();
        assert_eq!(read_metadata(&path, Compression::Gzip).unwrap().width, 2048);
    }

    #[test]
    fn test_read_metadata_failures() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_metadata(dir.path().join("absent.fit.gz"), Compression::Gzip).unwrap_err();
        assert_eq!(*err, ErrorKind::Io);

        let path = dir.path().join("truncated.fit");
        std::fs::write(&path, &fixture::encode(&frame_cards(195.0, 2.5))[..2880 / 2]).unwrap();
        let err = read_metadata(&path, Compression::None).unwrap_err();
        assert_eq!(*err, ErrorKind::MalformedHeader(skyreg_fits::error::ErrorKind::Truncated));

        let path = dir.path().join("cut.fit.gz");
        let compressed = Compression::Gzip.compress(&fixture::encode(&frame_cards(195.0, 2.5))).unwrap();
        std::fs::write(&path, &compressed[..compressed.len() / 2]).unwrap();
        assert!(read_metadata(&path, Compression::Gzip).is_err());

        let path = dir.path().join("garbage.fit.gz");
        std::fs::write(&path, b"definitely not gzip").unwrap();
        let err = read_metadata(&path, Compression::Gzip).unwrap_err();
        assert!(matches!(*err, ErrorKind::MalformedHeader(_)));
    }
}
