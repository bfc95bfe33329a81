use crate::error::{ErrorKind, Result};
use skyreg_astro::{QuadSpherePixelization, Wcs, image_to_polygon};
use tracing::{instrument, trace};

/// Sky tiles overlapped by a `width × height` image, grown by `padding`
/// radians on every side. Ids are ascending.
#[instrument(level = "debug", skip(wcs, pixelization))]
pub fn sky_tiles(
    wcs: &Wcs,
    width: u32,
    height: u32,
    padding: f64,
    pixelization: &QuadSpherePixelization,
) -> Result<Vec<u64>> {
    let polygon = image_to_polygon(wcs, width, height, padding).map_err(ErrorKind::footprint)?;
    let tiles = pixelization.intersect(&polygon);
    trace!(?tiles, "resolved footprint");
    Ok(tiles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Metadata;
    use crate::extract::tests::{SCALE, frame_cards};
    use rstest::rstest;
    use skyreg_astro::ARCSEC;
    use skyreg_fits::fixture;

    fn metadata(ra: f64, dec: f64) -> Metadata {
        Metadata::from_header(&fixture::header(&frame_cards(ra, dec))).unwrap()
    }

    #[rstest]
    #[case(195.0, 2.5)]
    #[case(10.0, -60.0)]
    #[case(0.0, 89.9)]
    #[case(45.0, 0.0)]
    fn test_centre_tile_is_included(#[case] ra: f64, #[case] dec: f64) {
        let pixelization = QuadSpherePixelization::new(3).unwrap();
        let metadata = metadata(ra, dec);
        let tiles = sky_tiles(&metadata.wcs, metadata.width, metadata.height, 0.000075, &pixelization).unwrap();
        let centre = metadata.wcs.pixel_to_sky(1023.5, 744.0);
        assert!(tiles.contains(&pixelization.pixel_of(&centre)));
        assert!(tiles.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_padding_reaches_neighbouring_tile() {
        let pixelization = QuadSpherePixelization::new(3).unwrap();
        // Face 1 spans RA ±45°; put the image's far edge just short of RA 45°.
        let half_width = 744.5 * SCALE;
        let metadata = metadata(45.0 - half_width - 5.0 * ARCSEC.to_degrees(), 0.0);
        let bare = sky_tiles(&metadata.wcs, metadata.width, metadata.height, 0.0, &pixelization).unwrap();
        let padded = sky_tiles(&metadata.wcs, metadata.width, metadata.height, 0.000075, &pixelization).unwrap();
        assert_eq!(bare, vec![pixelization.id(1, 2, 1).unwrap()]);
        assert_eq!(padded, vec![pixelization.id(1, 2, 1).unwrap(), pixelization.id(2, 0, 1).unwrap()]);
    }
}
