//! Recognise corrected-frame files by their path.

use regex::Regex;
use skyreg_compress::Compression;
use skyreg_registry::{Band, ExposureKey};
use std::path::Path;
use std::sync::LazyLock;

/// `<rerun>/corr/<camcol>/fpC-<run>-<band><camcol>-<frame>.fit[.gz|.bz2]`
///
/// The camera column appears twice; the regex crate has no backreferences,
/// so [`classify`] compares the two captures itself.
static FRAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)/corr/([1-6])/fpC-(\d{6})-([ugriz])([1-6])-(\d{4})\.fit(\.gz|\.bz2)?$").unwrap()
});

/// A path recognised as a corrected frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    pub key: ExposureKey,
    pub compression: Compression,
}

/// Identify the exposure a file holds from its path alone, or `None` if the
/// path does not look like a corrected frame.
pub fn classify(path: impl AsRef<Path>) -> Option<Classified> {
    let path = path.as_ref();
    let captures = FRAME_REGEX.captures(path.to_str()?)?;
    if captures[2] != captures[5] {
        return None;
    }
    let key = ExposureKey {
        run: captures[3].parse().ok()?,
        rerun: captures[1].parse().ok()?,
        band: captures[4].parse::<Band>().ok()?,
        camcol: captures[2].parse().ok()?,
        frame: captures[6].parse().ok()?,
    };
    Some(Classified { key, compression: Compression::from_path(path) })
}
