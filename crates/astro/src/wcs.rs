//! Gnomonic (`TAN`) world coordinate system.
//!
//! Implements the celestial part of the FITS WCS standard for the only
//! projection survey frames use: pixel coordinates go through a linear
//! transform (the `CD` matrix) to intermediate world coordinates, which are
//! deprojected from the plane tangent to the sky at `CRVAL`.

use crate::Vector3;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use skyreg_fits::Header;
use tracing::instrument;

/// Projection codes accepted in `CTYPEi`. SIP distortion terms are ignored:
/// they move a frame's corners by a few pixels, far below tile size.
const TAN_CODES: [&str; 2] = ["TAN", "TAN-SIP"];

/// A `TAN` projection anchored at a reference pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct Wcs {
    /// Reference pixel, 1-based FITS convention.
    crpix: [f64; 2],
    /// Pixel-to-intermediate transform, degrees per pixel.
    cd: [[f64; 2]; 2],
    det: f64,
    /// Tangent point.
    center: Vector3,
    /// Direction of increasing right ascension at the tangent point.
    east: Vector3,
    /// Direction of increasing declination at the tangent point.
    north: Vector3,
}

impl Wcs {
    /// Build from the reference sky position (degrees), the 1-based
    /// reference pixel and the `CD` matrix (degrees per pixel).
    pub fn new(crval: [f64; 2], crpix: [f64; 2], cd: [[f64; 2]; 2]) -> Result<Self> {
        let det = cd[0][0] * cd[1][1] - cd[0][1] * cd[1][0];
        if det == 0.0 || !det.is_finite() {
            exn::bail!(ErrorKind::SingularTransform);
        }
        let (ra, dec) = (crval[0].to_radians(), crval[1].to_radians());
        let (sin_ra, cos_ra) = ra.sin_cos();
        let (sin_dec, cos_dec) = dec.sin_cos();
        Ok(Self {
            crpix,
            cd,
            det,
            center: Vector3::from_radec(ra, dec),
            east: Vector3::new(-sin_ra, cos_ra, 0.0),
            north: Vector3::new(-sin_dec * cos_ra, -sin_dec * sin_ra, cos_dec),
        })
    }

    /// Build from the celestial WCS keywords of a FITS header.
    ///
    /// The linear transform is taken from `CDi_j` if any are present, then
    /// from `CDELTi` with `PCi_j`, then from `CDELTi` with `CROTA2`.
    #[instrument(level = "debug", skip(header))]
    pub fn from_header(header: &Header) -> Result<Self> {
        for (axis, prefix) in [("CTYPE1", "RA--"), ("CTYPE2", "DEC-")] {
            let ctype = header.string(axis).or_raise(|| ErrorKind::Header)?;
            let code = ctype.get(4..).map(|code| code.trim_start_matches('-'));
            if !ctype.starts_with(prefix) || !code.is_some_and(|code| TAN_CODES.contains(&code)) {
                exn::bail!(ErrorKind::UnsupportedProjection(ctype.to_string()));
            }
        }
        let float = |keyword: &str| header.float(keyword).or_raise(|| ErrorKind::Header);
        let optional = |keyword: &str| header.optional_float(keyword).or_raise(|| ErrorKind::Header);

        let crval = [float("CRVAL1")?, float("CRVAL2")?];
        let crpix = [float("CRPIX1")?, float("CRPIX2")?];
        let cd_keys = [["CD1_1", "CD1_2"], ["CD2_1", "CD2_2"]];
        let cd = if cd_keys.iter().flatten().any(|key| header.contains(key)) {
            let mut cd = [[0.0; 2]; 2];
            for (row, keys) in cd.iter_mut().zip(cd_keys) {
                for (cell, key) in row.iter_mut().zip(keys) {
                    *cell = optional(key)?.unwrap_or(0.0);
                }
            }
            cd
        } else {
            let cdelt = [float("CDELT1")?, float("CDELT2")?];
            let pc_keys = [["PC1_1", "PC1_2"], ["PC2_1", "PC2_2"]];
            if pc_keys.iter().flatten().any(|key| header.contains(key)) {
                let mut cd = [[0.0; 2]; 2];
                for (i, keys) in pc_keys.into_iter().enumerate() {
                    for (j, key) in keys.into_iter().enumerate() {
                        let identity = if i == j { 1.0 } else { 0.0 };
                        cd[i][j] = cdelt[i] * optional(key)?.unwrap_or(identity);
                    }
                }
                cd
            } else {
                let (sin, cos) = optional("CROTA2")?.unwrap_or(0.0).to_radians().sin_cos();
                [[cdelt[0] * cos, -cdelt[1] * sin], [cdelt[0] * sin, cdelt[1] * cos]]
            }
        };
        Self::new(crval, crpix, cd)
    }

    /// Sky position of a 0-based pixel coordinate (the centre of the first
    /// pixel is `(0, 0)`).
    pub fn pixel_to_sky(&self, x: f64, y: f64) -> Vector3 {
        let dx = x + 1.0 - self.crpix[0];
        let dy = y + 1.0 - self.crpix[1];
        let xi = (self.cd[0][0] * dx + self.cd[0][1] * dy).to_radians();
        let eta = (self.cd[1][0] * dx + self.cd[1][1] * dy).to_radians();
        let point = self.center + self.east * xi + self.north * eta;
        // The tangent point has unit length, so the sum is never zero.
        point * (1.0 / point.norm())
    }

    /// 0-based pixel coordinate of a sky position, or `None` if it lies on
    /// the far side of the tangent plane.
    pub fn sky_to_pixel(&self, sky: &Vector3) -> Option<(f64, f64)> {
        let depth = sky.dot(&self.center);
        if depth <= 0.0 {
            return None;
        }
        let xi = (sky.dot(&self.east) / depth).to_degrees();
        let eta = (sky.dot(&self.north) / depth).to_degrees();
        let dx = (self.cd[1][1] * xi - self.cd[0][1] * eta) / self.det;
        let dy = (self.cd[0][0] * eta - self.cd[1][0] * xi) / self.det;
        Some((dx + self.crpix[0] - 1.0, dy + self.crpix[1] - 1.0))
    }

    /// Pixel scale at the tangent point, radians per pixel.
    pub fn pixel_scale(&self) -> f64 {
        self.det.abs().sqrt().to_radians()
    }

    /// Sky position of the tangent point.
    pub fn center(&self) -> Vector3 {
        self.center
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ARCSEC;
    use rstest::rstest;
    use skyreg_fits::fixture::{self, Card, Literal};

    const SCALE: f64 = 0.396 / 3600.0;

    fn frame_cards(extra: Vec<Card>) -> Vec<Card> {
        let mut cards = vec![
            Card::new("SIMPLE", Literal::Logical(true)),
            Card::new("CTYPE1", Literal::String("RA---TAN".into())),
            Card::new("CTYPE2", Literal::String("DEC--TAN".into())),
            Card::new("CRVAL1", Literal::Float(195.0)),
            Card::new("CRVAL2", Literal::Float(2.5)),
            Card::new("CRPIX1", Literal::Float(1024.5)),
            Card::new("CRPIX2", Literal::Float(745.0)),
        ];
        cards.extend(extra);
        cards
    }

    fn frame_header(extra: Vec<Card>) -> Header {
        fixture::header(&frame_cards(extra))
    }

    fn cd_cards() -> Vec<Card> {
        vec![
            Card::new("CD1_1", Literal::Float(-SCALE)),
            Card::new("CD1_2", Literal::Float(0.0)),
            Card::new("CD2_1", Literal::Float(0.0)),
            Card::new("CD2_2", Literal::Float(SCALE)),
        ]
    }

    #[test]
    fn test_reference_pixel_maps_to_crval() {
        let wcs = Wcs::from_header(&frame_header(cd_cards())).unwrap();
        let sky = wcs.pixel_to_sky(1023.5, 744.0);
        assert!((sky.ra().to_degrees() - 195.0).abs() < 1e-10);
        assert!((sky.dec().to_degrees() - 2.5).abs() < 1e-10);
        assert!((wcs.pixel_scale() / ARCSEC - 0.396).abs() < 1e-9);
    }

    #[test]
    fn test_axes_orientation() {
        let wcs = Wcs::from_header(&frame_header(cd_cards())).unwrap();
        let origin = wcs.pixel_to_sky(1023.5, 744.0);
        // Negative CD1_1: moving right in x decreases right ascension.
        assert!(wcs.pixel_to_sky(1123.5, 744.0).ra() < origin.ra());
        assert!(wcs.pixel_to_sky(1023.5, 844.0).dec() > origin.dec());
        let step = origin.angle_to(&wcs.pixel_to_sky(1024.5, 744.0));
        assert!((step / ARCSEC - 0.396).abs() < 1e-6);
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(2047.0, 1488.0)]
    #[case(-30.5, 1500.25)]
    fn test_round_trip(#[case] x: f64, #[case] y: f64) {
        let wcs = Wcs::new([10.0, -60.0], [1024.5, 745.0], [[-SCALE, 1e-6], [2e-6, SCALE]]).unwrap();
        let (u, v) = wcs.sky_to_pixel(&wcs.pixel_to_sky(x, y)).unwrap();
        assert!((u - x).abs() < 1e-6 && (v - y).abs() < 1e-6);
    }

    #[test]
    fn test_far_side_has_no_pixel() {
        let wcs = Wcs::from_header(&frame_header(cd_cards())).unwrap();
        assert_eq!(wcs.sky_to_pixel(&-wcs.center()), None);
    }

    #[test]
    fn test_cdelt_crota_matches_cd() {
        let rotated = frame_header(vec![
            Card::new("CDELT1", Literal::Float(-SCALE)),
            Card::new("CDELT2", Literal::Float(SCALE)),
            Card::new("CROTA2", Literal::Float(0.0)),
        ]);
        let from_crota = Wcs::from_header(&rotated).unwrap();
        let from_cd = Wcs::from_header(&frame_header(cd_cards())).unwrap();
        assert_eq!(from_crota.cd, from_cd.cd);
    }

    #[test]
    fn test_cdelt_pc() {
        let header = frame_header(vec![
            Card::new("CDELT1", Literal::Float(-SCALE)),
            Card::new("CDELT2", Literal::Float(SCALE)),
            Card::new("PC1_2", Literal::Float(0.5)),
        ]);
        let wcs = Wcs::from_header(&header).unwrap();
        assert_eq!(wcs.cd, [[-SCALE, -SCALE * 0.5], [0.0, SCALE]]);
    }

    #[rstest]
    #[case("RA---SIN", "DEC--SIN")]
    #[case("GLON-TAN", "GLAT-TAN")]
    #[case("RA---TAN", "DEC--ZEA")]
    fn test_unsupported_projection(#[case] ctype1: &str, #[case] ctype2: &str) {
        let mut header = vec![
            Card::new("SIMPLE", Literal::Logical(true)),
            Card::new("CTYPE1", Literal::String(ctype1.into())),
            Card::new("CTYPE2", Literal::String(ctype2.into())),
        ];
        header.extend(cd_cards());
        let err = Wcs::from_header(&fixture::header(&header)).unwrap_err();
        assert!(matches!(*err, ErrorKind::UnsupportedProjection(_)));
    }

    #[test]
    fn test_tan_sip_accepted() {
        let mut cards = frame_cards(cd_cards());
        cards[1] = Card::new("CTYPE1", Literal::String("RA---TAN-SIP".into()));
        cards[2] = Card::new("CTYPE2", Literal::String("DEC--TAN-SIP".into()));
        assert!(Wcs::from_header(&fixture::header(&cards)).is_ok());
    }

    #[test]
    fn test_missing_keyword() {
        let err = Wcs::from_header(&frame_header(vec![])).unwrap_err();
        assert_eq!(*err, ErrorKind::Header);
    }

    #[test]
    fn test_singular() {
        let err = Wcs::new([0.0, 0.0], [1.0, 1.0], [[1.0, 2.0], [2.0, 4.0]]).unwrap_err();
        assert_eq!(*err, ErrorKind::SingularTransform);
    }
}
