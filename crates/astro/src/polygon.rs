//! Spherical convex polygons.

use crate::error::{ErrorKind, Result};
use crate::{Vector3, Wcs};
use exn::OptionExt;
use tracing::instrument;

/// Slack for points lying on an edge plane.
const EPSILON: f64 = 1e-12;

/// A convex polygon on the unit sphere, smaller than a hemisphere, whose
/// edges are great-circle arcs.
///
/// Vertices are stored counter-clockwise as seen from outside the sphere,
/// so every edge plane normal points into the polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolygon {
    vertices: Vec<Vector3>,
    edges: Vec<Vector3>,
}

impl ConvexPolygon {
    /// Build from vertices given in either winding order.
    pub fn new(vertices: impl IntoIterator<Item = Vector3>) -> Result<Self> {
        let mut vertices = vertices
            .into_iter()
            .map(|v| v.normalize())
            .collect::<Option<Vec<_>>>()
            .ok_or_raise(|| ErrorKind::InvalidPolygon("zero-length vertex".to_string()))?;
        if vertices.len() < 3 {
            exn::bail!(ErrorKind::InvalidPolygon(format!("{} vertices", vertices.len())));
        }
        let centroid = vertices
            .iter()
            .fold(Vector3::default(), |sum, v| sum + *v)
            .normalize()
            .ok_or_raise(|| ErrorKind::InvalidPolygon("vertices surround the origin".to_string()))?;
        let turns = Self::edge_planes(&vertices).map(|n| n.dot(&centroid)).collect::<Vec<_>>();
        if turns.iter().all(|t| *t < 0.0) {
            vertices.reverse();
        } else if !turns.iter().all(|t| *t > 0.0) {
            exn::bail!(ErrorKind::InvalidPolygon("vertices are not in convex order".to_string()));
        }
        let edges = Self::edge_planes(&vertices)
            .map(|n| n.normalize())
            .collect::<Option<Vec<_>>>()
            .ok_or_raise(|| ErrorKind::InvalidPolygon("repeated vertex".to_string()))?;
        let polygon = Self { vertices, edges };
        // Every vertex must be inside every edge plane, or the winding is not convex.
        if !polygon.vertices.iter().all(|v| polygon.contains(v)) {
            exn::bail!(ErrorKind::InvalidPolygon("polygon is not convex".to_string()));
        }
        Ok(polygon)
    }

    fn edge_planes(vertices: &[Vector3]) -> impl Iterator<Item = Vector3> + '_ {
        vertices.iter().zip(vertices.iter().cycle().skip(1)).map(|(a, b)| a.cross(b))
    }

    pub fn vertices(&self) -> &[Vector3] {
        &self.vertices
    }

    /// `true` if `point` is inside or on the boundary.
    pub fn contains(&self, point: &Vector3) -> bool {
        self.edges.iter().all(|n| n.dot(point) >= -EPSILON)
    }

    /// `true` if the polygons share any area.
    ///
    /// Two convex polygons are disjoint exactly when some great circle
    /// separates them, and such a circle can always be found among the edge
    /// planes of either polygon or the planes through one vertex of each.
    /// Polygons that only touch along a boundary count as disjoint.
    pub fn intersects(&self, other: &ConvexPolygon) -> bool {
        let outside = |normal: &Vector3, polygon: &ConvexPolygon| {
            polygon.vertices.iter().all(|v| normal.dot(v) <= EPSILON)
        };
        if self.edges.iter().any(|n| outside(n, other)) || other.edges.iter().any(|n| outside(n, self)) {
            return false;
        }
        for a in &self.vertices {
            for b in &other.vertices {
                let Some(normal) = a.cross(b).normalize() else { continue };
                for normal in [normal, -normal] {
                    if outside(&-normal, self) && outside(&normal, other) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

/// The sky footprint of a `width × height` image, grown outwards by `pad`
/// radians on every side.
///
/// Corners sit on pixel edges, not pixel centres: the first pixel spans
/// `[-0.5, 0.5]` in each axis.
#[instrument(level = "trace", skip(wcs))]
pub fn image_to_polygon(wcs: &Wcs, width: u32, height: u32, pad: f64) -> Result<ConvexPolygon> {
    let pad = pad / wcs.pixel_scale();
    let (left, bottom) = (-0.5 - pad, -0.5 - pad);
    let right = f64::from(width) - 0.5 + pad;
    let top = f64::from(height) - 0.5 + pad;
    let corners = [(left, bottom), (right, bottom), (right, top), (left, top)];
    ConvexPolygon::new(corners.map(|(x, y)| wcs.pixel_to_sky(x, y)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ARCSEC;
    use rstest::rstest;

    fn square(ra: f64, dec: f64, half: f64) -> ConvexPolygon {
        ConvexPolygon::new([
            Vector3::from_radec_degrees(ra - half, dec - half),
            Vector3::from_radec_degrees(ra + half, dec - half),
            Vector3::from_radec_degrees(ra + half, dec + half),
            Vector3::from_radec_degrees(ra - half, dec + half),
        ])
        .unwrap()
    }

    #[test]
    fn test_winding_is_normalized() {
        let ccw = square(30.0, 10.0, 1.0);
        let mut reversed = ccw.vertices().to_vec();
        reversed.reverse();
        let cw = ConvexPolygon::new(reversed).unwrap();
        assert!(cw.contains(&Vector3::from_radec_degrees(30.0, 10.0)));
        assert!(!cw.contains(&Vector3::from_radec_degrees(32.0, 10.0)));
    }

    #[rstest]
    #[case(vec![Vector3::X, Vector3::Y])]
    #[case(vec![Vector3::X, Vector3::Y, Vector3::default()])]
    #[case(vec![Vector3::X, Vector3::X, Vector3::Y])]
    // A bow-tie: the middle two vertices swapped.
    #[case(vec![
        Vector3::from_radec_degrees(0.0, 0.0),
        Vector3::from_radec_degrees(1.0, 1.0),
        Vector3::from_radec_degrees(1.0, 0.0),
        Vector3::from_radec_degrees(0.0, 1.0),
    ])]
    fn test_invalid(#[case] vertices: Vec<Vector3>) {
        let err = ConvexPolygon::new(vertices).unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidPolygon(_)));
    }

    #[rstest]
    #[case(square(30.0, 10.0, 1.0), square(30.5, 10.5, 1.0), true)]
    #[case(square(30.0, 10.0, 1.0), square(30.0, 10.0, 0.1), true)]
    #[case(square(30.0, 10.0, 0.1), square(30.0, 10.0, 1.0), true)]
    #[case(square(30.0, 10.0, 1.0), square(33.0, 10.0, 1.0), false)]
    #[case(square(30.0, 10.0, 1.0), square(210.0, -10.0, 1.0), false)]
    fn test_intersects(#[case] a: ConvexPolygon, #[case] b: ConvexPolygon, #[case] expected: bool) {
        assert_eq!(a.intersects(&b), expected);
        assert_eq!(b.intersects(&a), expected);
    }

    #[test]
    fn test_crossing_without_contained_vertices() {
        // A plus sign: neither polygon has a vertex inside the other.
        let wide = ConvexPolygon::new([
            Vector3::from_radec_degrees(-3.0, -0.5),
            Vector3::from_radec_degrees(3.0, -0.5),
            Vector3::from_radec_degrees(3.0, 0.5),
            Vector3::from_radec_degrees(-3.0, 0.5),
        ])
        .unwrap();
        let tall = ConvexPolygon::new([
            Vector3::from_radec_degrees(-0.5, -3.0),
            Vector3::from_radec_degrees(0.5, -3.0),
            Vector3::from_radec_degrees(0.5, 3.0),
            Vector3::from_radec_degrees(-0.5, 3.0),
        ])
        .unwrap();
        assert!(!wide.vertices().iter().any(|v| tall.contains(v)));
        assert!(wide.intersects(&tall));
    }

    #[test]
    fn test_image_to_polygon_padding() {
        let scale = 0.396 / 3600.0;
        let wcs = Wcs::new([195.0, 2.5], [1024.5, 745.0], [[-scale, 0.0], [0.0, scale]]).unwrap();
        let bare = image_to_polygon(&wcs, 2048, 1489, 0.0).unwrap();
        let padded = image_to_polygon(&wcs, 2048, 1489, 15.0 * ARCSEC).unwrap();
        let corner = wcs.pixel_to_sky(-0.5, -0.5);
        assert!(bare.contains(&corner));
        assert!(padded.contains(&wcs.pixel_to_sky(-10.0, -10.0)));
        assert!(!bare.contains(&wcs.pixel_to_sky(-10.0, -10.0)));
        let grown = corner.angle_to(&padded.vertices()[0]) / ARCSEC;
        // Diagonal of a 15" pad.
        assert!((grown - 15.0 * std::f64::consts::SQRT_2).abs() < 0.01);
    }
}
