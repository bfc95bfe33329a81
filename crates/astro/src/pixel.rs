//! Quad-sphere sky tiling.
//!
//! The sphere is projected onto the six faces of a circumscribed cube and
//! each face is split into an `R × R` grid. Grid lines are spaced evenly in
//! angle rather than in cube-face coordinates, which keeps tile areas within
//! a few tens of percent of each other. Every grid line is a great circle, so
//! each tile is a spherical convex quadrilateral.

use crate::error::{ErrorKind, Result};
use crate::{ConvexPolygon, Vector3};
use std::f64::consts::FRAC_PI_4;
use tracing::instrument;

/// Cube faces as `(centre, u, v)` with `u × v = centre`: the north cap, the
/// four equatorial faces at right ascension 0°, 90°, 180° and 270°, then the
/// south cap.
static FACES: [(Vector3, Vector3, Vector3); 6] = [
    (Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 1.0, 0.0), Vector3::new(-1.0, 0.0, 0.0)),
    (Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, 0.0, 1.0)),
    (Vector3::new(0.0, 1.0, 0.0), Vector3::new(-1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0)),
    (Vector3::new(-1.0, 0.0, 0.0), Vector3::new(0.0, -1.0, 0.0), Vector3::new(0.0, 0.0, 1.0)),
    (Vector3::new(0.0, -1.0, 0.0), Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0)),
    (Vector3::new(0.0, 0.0, -1.0), Vector3::new(0.0, 1.0, 0.0), Vector3::new(1.0, 0.0, 0.0)),
];

/// Tiles are precomputed; this bounds the table at about 400k polygons.
pub const MAX_RESOLUTION: u32 = 256;

/// A quad-sphere tessellation with `6 × R²` tiles.
///
/// Tile ids are `face · R² + row · R + col`, with `col` running along the
/// face's `u` axis and `row` along its `v` axis.
#[derive(Debug, Clone)]
pub struct QuadSpherePixelization {
    resolution: u32,
    faces: Vec<ConvexPolygon>,
    tiles: Vec<ConvexPolygon>,
}

impl QuadSpherePixelization {
    #[instrument(level = "debug")]
    pub fn new(resolution: u32) -> Result<Self> {
        if resolution == 0 || resolution > MAX_RESOLUTION {
            exn::bail!(ErrorKind::InvalidResolution(resolution));
        }
        let step = 2.0 * FRAC_PI_4 / f64::from(resolution);
        let edges = (0..=resolution).map(|k| (f64::from(k) * step - FRAC_PI_4).tan()).collect::<Vec<_>>();
        // Face outlines reuse the outer grid lines so they match their tiles exactly.
        let (first, last) = (edges[0], edges[edges.len() - 1]);

        let mut faces = Vec::with_capacity(FACES.len());
        let mut tiles = Vec::with_capacity(FACES.len() * (resolution as usize).pow(2));
        for face in &FACES {
            faces.push(quad(face, (first, last), (first, last))?);
            for rows in edges.windows(2) {
                for cols in edges.windows(2) {
                    tiles.push(quad(face, (cols[0], cols[1]), (rows[0], rows[1]))?);
                }
            }
        }
        Ok(Self { resolution, faces, tiles })
    }

    /// Total number of tiles, `6 × R²`.
    pub fn len(&self) -> u64 {
        self.tiles.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Id of a tile, or `None` if any coordinate is out of range.
    pub fn id(&self, face: u32, col: u32, row: u32) -> Option<u64> {
        let r = u64::from(self.resolution);
        (face < 6 && col < self.resolution && row < self.resolution)
            .then(|| u64::from(face) * r * r + u64::from(row) * r + u64::from(col))
    }

    /// `(face, col, row)` of a tile id.
    pub fn coords(&self, id: u64) -> Option<(u32, u32, u32)> {
        if id >= self.len() {
            return None;
        }
        let r = u64::from(self.resolution);
        let (face, rest) = (id / (r * r), id % (r * r));
        // Every component is below 6 or R, both of which fit in u32.
        Some((face as u32, (rest % r) as u32, (rest / r) as u32))
    }

    /// Boundary of a tile.
    pub fn pixel(&self, id: u64) -> Option<&ConvexPolygon> {
        usize::try_from(id).ok().and_then(|index| self.tiles.get(index))
    }

    /// The tile containing a point. Points on a shared boundary go to the
    /// lower face and the higher grid cell.
    pub fn pixel_of(&self, point: &Vector3) -> u64 {
        let (face, (centre, u, v)) = FACES
            .iter()
            .enumerate()
            .fold((0, &FACES[0]), |best, candidate| {
                if candidate.1.0.dot(point) > best.1.0.dot(point) { candidate } else { best }
            });
        let depth = point.dot(centre);
        let cell = |along: &Vector3| {
            let angle = (point.dot(along) / depth).atan() + FRAC_PI_4;
            let index = (angle / (2.0 * FRAC_PI_4) * f64::from(self.resolution)).floor();
            // Saturating cast, then clamp the far edge into the last cell.
            (index.max(0.0) as u32).min(self.resolution - 1)
        };
        let (col, row) = (cell(u), cell(v));
        let r = u64::from(self.resolution);
        face as u64 * r * r + u64::from(row) * r + u64::from(col)
    }

    /// Ids of every tile sharing area with `polygon`, ascending.
    #[instrument(level = "trace", skip_all, fields(resolution = self.resolution))]
    pub fn intersect(&self, polygon: &ConvexPolygon) -> Vec<u64> {
        let per_face = self.tiles.len() / self.faces.len();
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, face)| face.intersects(polygon))
            .flat_map(|(face, _)| face * per_face..(face + 1) * per_face)
            .filter(|index| self.tiles[*index].intersects(polygon))
            .map(|index| index as u64)
            .collect()
    }
}

/// The spherical quadrilateral spanning `s` along `u` and `t` along `v`.
fn quad(face: &(Vector3, Vector3, Vector3), s: (f64, f64), t: (f64, f64)) -> Result<ConvexPolygon> {
    let (centre, u, v) = *face;
    let corner = |s: f64, t: f64| centre + u * s + v * t;
    ConvexPolygon::new([corner(s.0, t.0), corner(s.1, t.0), corner(s.1, t.1), corner(s.0, t.1)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample_points() -> impl Iterator<Item = Vector3> {
        (-9..=9).flat_map(|dec| {
            (0..36).map(move |ra| Vector3::from_radec_degrees(f64::from(ra) * 10.0 + 3.0, f64::from(dec) * 9.9))
        })
    }

    #[rstest]
    #[case(0)]
    #[case(MAX_RESOLUTION + 1)]
    fn test_invalid_resolution(#[case] resolution: u32) {
        let err = QuadSpherePixelization::new(resolution).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidResolution(resolution));
    }

    #[rstest]
    #[case(1, 6)]
    #[case(3, 54)]
    #[case(8, 384)]
    fn test_len(#[case] resolution: u32, #[case] expected: u64) {
        let pixelization = QuadSpherePixelization::new(resolution).unwrap();
        assert_eq!(pixelization.len(), expected);
    }

    #[test]
    fn test_id_coords() {
        let pixelization = QuadSpherePixelization::new(3).unwrap();
        assert_eq!(pixelization.id(2, 1, 2), Some(2 * 9 + 2 * 3 + 1));
        assert_eq!(pixelization.coords(25), Some((2, 1, 2)));
        assert_eq!(pixelization.id(6, 0, 0), None);
        assert_eq!(pixelization.id(0, 3, 0), None);
        assert_eq!(pixelization.coords(54), None);
        assert!(pixelization.pixel(54).is_none());
        for id in 0..pixelization.len() {
            let (face, col, row) = pixelization.coords(id).unwrap();
            assert_eq!(pixelization.id(face, col, row), Some(id));
        }
    }

    #[rstest]
    #[case(Vector3::Z, 4)]
    #[case(Vector3::X, 13)]
    #[case(Vector3::Y, 22)]
    #[case(-Vector3::X, 31)]
    #[case(-Vector3::Y, 40)]
    #[case(-Vector3::Z, 49)]
    fn test_face_centres(#[case] point: Vector3, #[case] expected: u64) {
        let pixelization = QuadSpherePixelization::new(3).unwrap();
        assert_eq!(pixelization.pixel_of(&point), expected);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(7)]
    fn test_pixel_of_is_contained(#[case] resolution: u32) {
        let pixelization = QuadSpherePixelization::new(resolution).unwrap();
        for point in sample_points() {
            let id = pixelization.pixel_of(&point);
            assert!(pixelization.pixel(id).unwrap().contains(&point), "{point:?} not in tile {id}");
        }
    }

    #[test]
    fn test_intersect_small_polygon() {
        let pixelization = QuadSpherePixelization::new(3).unwrap();
        let centre = Vector3::from_radec_degrees(10.0, 10.0);
        let polygon = ConvexPolygon::new([
            Vector3::from_radec_degrees(9.9, 9.9),
            Vector3::from_radec_degrees(10.1, 9.9),
            Vector3::from_radec_degrees(10.1, 10.1),
            Vector3::from_radec_degrees(9.9, 10.1),
        ])
        .unwrap();
        assert_eq!(pixelization.intersect(&polygon), vec![pixelization.pixel_of(&centre)]);
    }

    #[test]
    fn test_intersect_across_faces() {
        let pixelization = QuadSpherePixelization::new(3).unwrap();
        // Straddles the boundary between the RA 0° and RA 90° faces.
        let polygon = ConvexPolygon::new([
            Vector3::from_radec_degrees(44.0, -1.0),
            Vector3::from_radec_degrees(46.0, -1.0),
            Vector3::from_radec_degrees(46.0, 1.0),
            Vector3::from_radec_degrees(44.0, 1.0),
        ])
        .unwrap();
        let tiles = pixelization.intersect(&polygon);
        assert_eq!(tiles, vec![pixelization.id(1, 2, 1).unwrap(), pixelization.id(2, 0, 1).unwrap()]);
        assert!(tiles.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_intersect_covers_every_vertex() {
        let pixelization = QuadSpherePixelization::new(5).unwrap();
        let polygon = ConvexPolygon::new([
            Vector3::from_radec_degrees(100.0, 20.0),
            Vector3::from_radec_degrees(130.0, 20.0),
            Vector3::from_radec_degrees(130.0, 50.0),
            Vector3::from_radec_degrees(100.0, 50.0),
        ])
        .unwrap();
        let tiles = pixelization.intersect(&polygon);
        for vertex in polygon.vertices() {
            assert!(tiles.contains(&pixelization.pixel_of(vertex)));
        }
    }
}
