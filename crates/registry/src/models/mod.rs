mod exposure;
mod key;

pub(crate) use self::exposure::ExposureRow;
pub use self::exposure::{Exposure, StoredExposure};
pub use self::key::{Band, ExposureKey};
