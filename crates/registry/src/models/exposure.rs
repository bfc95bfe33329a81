use crate::error::{Error, ErrorKind};
use crate::models::{Band, ExposureKey};
use exn::ResultExt;

/// One exposure, as recorded in the `raw` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Exposure {
    pub key: ExposureKey,
    /// Start of the exposure, `YYYY-MM-DDTHH:MM:SS.nnnnnnnnn`.
    pub tai_obs: String,
    /// Exposure duration, seconds.
    pub exp_time: f64,
}

/// An exposure read back from the registry, with its row id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredExposure {
    pub id: i64,
    pub exposure: Exposure,
}

#[derive(sqlx::FromRow)]
pub(crate) struct ExposureRow {
    pub(crate) id: i64,
    pub(crate) run: i64,
    pub(crate) rerun: i64,
    pub(crate) band: String,
    pub(crate) camcol: i64,
    pub(crate) frame: i64,
    #[sqlx(rename = "taiObs")]
    pub(crate) tai_obs: String,
    #[sqlx(rename = "expTime")]
    pub(crate) exp_time: f64,
}
impl TryFrom<ExposureRow> for StoredExposure {
    type Error = Error;
    fn try_from(row: ExposureRow) -> Result<Self, Self::Error> {
        let key = ExposureKey {
            run: u32::try_from(row.run).or_raise(|| ErrorKind::InvalidData("run"))?,
            rerun: u32::try_from(row.rerun).or_raise(|| ErrorKind::InvalidData("rerun"))?,
            band: row.band.parse::<Band>()?,
            camcol: u8::try_from(row.camcol).or_raise(|| ErrorKind::InvalidData("camcol"))?,
            frame: u32::try_from(row.frame).or_raise(|| ErrorKind::InvalidData("frame"))?,
        };
        Ok(Self { id: row.id, exposure: Exposure { key, tai_obs: row.tai_obs, exp_time: row.exp_time } })
    }
}
