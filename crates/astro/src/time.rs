//! Nanosecond-resolution instants on an explicit timescale.
//!
//! A [`DateTime`] is a count of nanoseconds since `1970-01-01T00:00:00` TAI.
//! TAI is uniform, so adding nanoseconds is plain integer arithmetic; the
//! scale only matters when converting to or from a civil (calendar) reading.

use crate::error::{ErrorKind, Result};
use ::time::format_description::BorrowedFormatItem;
use ::time::macros::format_description;
use ::time::{OffsetDateTime, PrimitiveDateTime};
use exn::{OptionExt, ResultExt};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
/// TT − TAI, exactly 32.184 s.
const TT_MINUS_TAI_NANOS: i64 = 32_184_000_000;
/// TAI − UTC before the leap-second era began.
const PRE_1972_OFFSET: i64 = 10;

/// `(UTC instant the offset takes effect, as Unix seconds; TAI − UTC in seconds)`.
const LEAP_SECONDS: [(i64, i64); 28] = [
    (63_072_000, 10),    // 1972-01-01
    (78_796_800, 11),    // 1972-07-01
    (94_694_400, 12),    // 1973-01-01
    (126_230_400, 13),   // 1974-01-01
    (157_766_400, 14),   // 1975-01-01
    (189_302_400, 15),   // 1976-01-01
    (220_924_800, 16),   // 1977-01-01
    (252_460_800, 17),   // 1978-01-01
    (283_996_800, 18),   // 1979-01-01
    (315_532_800, 19),   // 1980-01-01
    (362_793_600, 20),   // 1981-07-01
    (394_329_600, 21),   // 1982-07-01
    (425_865_600, 22),   // 1983-07-01
    (489_024_000, 23),   // 1985-07-01
    (567_993_600, 24),   // 1988-01-01
    (631_152_000, 25),   // 1990-01-01
    (662_688_000, 26),   // 1991-01-01
    (709_948_800, 27),   // 1992-07-01
    (741_484_800, 28),   // 1993-07-01
    (773_020_800, 29),   // 1994-07-01
    (820_454_400, 30),   // 1996-01-01
    (867_715_200, 31),   // 1997-07-01
    (915_148_800, 32),   // 1999-01-01
    (1_136_073_600, 33), // 2006-01-01
    (1_230_768_000, 34), // 2009-01-01
    (1_341_100_800, 35), // 2012-07-01
    (1_435_708_800, 36), // 2015-07-01
    (1_483_228_800, 37), // 2017-01-01
];

const CIVIL_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]");

/// The timescale a civil reading is expressed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Timescale {
    /// International Atomic Time.
    Tai,
    /// Coordinated Universal Time (TAI minus leap seconds).
    #[default]
    Utc,
    /// Terrestrial Time (TAI + 32.184 s).
    Tt,
}

impl Timescale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timescale::Tai => "tai",
            Timescale::Utc => "utc",
            Timescale::Tt => "tt",
        }
    }
}

impl Display for Timescale {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

impl FromStr for Timescale {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tai" => Ok(Timescale::Tai),
            "utc" => Ok(Timescale::Utc),
            "tt" | "tdt" => Ok(Timescale::Tt),
            _ => exn::bail!(ErrorKind::UnknownTimescale(s.to_string())),
        }
    }
}

/// An instant, stored as nanoseconds since 1970-01-01T00:00:00 TAI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    nsecs: i64,
}

impl DateTime {
    pub fn from_nsecs(nsecs: i64) -> Self {
        Self { nsecs }
    }

    /// Interpret a calendar reading on the given timescale.
    ///
    /// ```
    /// use skyreg_astro::{DateTime, Timescale};
    /// use time::macros::datetime;
    ///
    /// let tai = DateTime::from_civil(datetime!(2020-01-01 12:00:00), Timescale::Tai).unwrap();
    /// let utc = DateTime::from_civil(datetime!(2020-01-01 11:59:23), Timescale::Utc).unwrap();
    /// assert_eq!(tai, utc);
    /// ```
    pub fn from_civil(civil: PrimitiveDateTime, scale: Timescale) -> Result<Self> {
        let reading = civil_nanos(civil)?;
        let nsecs = match scale {
            Timescale::Tai => Some(reading),
            Timescale::Tt => reading.checked_sub(TT_MINUS_TAI_NANOS),
            Timescale::Utc => {
                let offset = utc_offset(reading.div_euclid(NANOS_PER_SECOND));
                reading.checked_add(offset * NANOS_PER_SECOND)
            },
        };
        Ok(Self { nsecs: nsecs.ok_or_raise(|| ErrorKind::OutOfRange)? })
    }

    /// Nanoseconds since 1970-01-01T00:00:00 TAI.
    pub fn nsecs(&self) -> i64 {
        self.nsecs
    }

    pub fn checked_add_nanos(&self, nanos: i64) -> Option<Self> {
        self.nsecs.checked_add(nanos).map(Self::from_nsecs)
    }

    /// Calendar reading of this instant on the given timescale.
    ///
    /// Instants inside a positive leap second have no UTC reading of their
    /// own and fold onto the first second of the following day.
    pub fn to_civil(&self, scale: Timescale) -> Result<PrimitiveDateTime> {
        let reading = match scale {
            Timescale::Tai => Some(self.nsecs),
            Timescale::Tt => self.nsecs.checked_add(TT_MINUS_TAI_NANOS),
            Timescale::Utc => self.nsecs.checked_sub(tai_offset(self.nsecs) * NANOS_PER_SECOND),
        };
        let reading = reading.ok_or_raise(|| ErrorKind::OutOfRange)?;
        let civil = OffsetDateTime::from_unix_timestamp_nanos(i128::from(reading)).or_raise(|| ErrorKind::OutOfRange)?;
        Ok(PrimitiveDateTime::new(civil.date(), civil.time()))
    }

    /// `YYYY-MM-DDTHH:MM:SS.nnnnnnnnn`, with no zone or scale marker.
    pub fn to_civil_string(&self, scale: Timescale) -> Result<String> {
        self.to_civil(scale)?.format(CIVIL_FORMAT).or_raise(|| ErrorKind::OutOfRange)
    }
}

impl Display for DateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.to_civil_string(Timescale::Tai) {
            Ok(civil) => write!(f, "{civil} TAI"),
            Err(_) => write!(f, "{}ns TAI", self.nsecs),
        }
    }
}

fn civil_nanos(civil: PrimitiveDateTime) -> Result<i64> {
    i64::try_from(civil.assume_utc().unix_timestamp_nanos()).or_raise(|| ErrorKind::OutOfRange)
}

/// TAI − UTC in effect at a UTC reading (Unix seconds).
fn utc_offset(utc_seconds: i64) -> i64 {
    LEAP_SECONDS
        .iter()
        .rev()
        .find(|(start, _)| utc_seconds >= *start)
        .map(|(_, offset)| *offset)
        .unwrap_or(PRE_1972_OFFSET)
}

/// TAI − UTC in effect at a TAI instant (nanoseconds).
fn tai_offset(tai_nanos: i64) -> i64 {
    let tai_seconds = tai_nanos.div_euclid(NANOS_PER_SECOND);
    LEAP_SECONDS
        .iter()
        .rev()
        .find(|(start, offset)| tai_seconds - offset >= *start)
        .map(|(_, offset)| *offset)
        .unwrap_or(PRE_1972_OFFSET)
}
