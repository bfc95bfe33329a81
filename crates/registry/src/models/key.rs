use crate::error::{Error, ErrorKind};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// SDSS photometric filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    U,
    G,
    R,
    I,
    Z,
}
impl Band {
    pub const ALL: [Band; 5] = [Band::U, Band::G, Band::R, Band::I, Band::Z];

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::U => "u",
            Band::G => "g",
            Band::R => "r",
            Band::I => "i",
            Band::Z => "z",
        }
    }
}
impl FromStr for Band {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "u" => Band::U,
            "g" => Band::G,
            "r" => Band::R,
            "i" => Band::I,
            "z" => Band::Z,
            _ => exn::bail!(ErrorKind::InvalidData("band")),
        })
    }
}
impl Display for Band {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Where an exposure sits in the survey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExposureKey {
    pub run: u32,
    pub rerun: u32,
    pub band: Band,
    /// Camera column, 1 to 6.
    pub camcol: u8,
    pub frame: u32,
}

/// Renders as `{run}_R{rerun}_B{band}_C{camcol}_F{frame}`, e.g. `94_R40_Br_C3_F11`.
impl Display for ExposureKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}_R{}_B{}_C{}_F{}", self.run, self.rerun, self.band, self.camcol, self.frame)
    }
}
