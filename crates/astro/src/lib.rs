//! Astronomy primitives needed to register an exposure.
//!
//! - [`time`]: nanosecond-resolution instants with explicit [`Timescale`]s
//!   (TAI, UTC, TT).
//! - [`Vector3`]: unit vectors on the celestial sphere.
//! - [`Wcs`]: the gnomonic (`TAN`) pixel-to-sky mapping described by a FITS
//!   header.
//! - [`ConvexPolygon`]: spherical convex polygons, with containment and
//!   intersection tests; [`image_to_polygon`] builds the padded footprint of
//!   an image.
//! - [`QuadSpherePixelization`]: a fixed tessellation of the sphere into
//!   `6 × R²` tiles, used to index sky coverage.

pub mod error;
mod pixel;
mod polygon;
pub mod time;
mod vector;
mod wcs;

pub use crate::pixel::{MAX_RESOLUTION, QuadSpherePixelization};
pub use crate::polygon::{ConvexPolygon, image_to_polygon};
pub use crate::time::{DateTime, Timescale};
pub use crate::vector::Vector3;
pub use crate::wcs::Wcs;

/// Radians per arcsecond.
pub const ARCSEC: f64 = std::f64::consts::PI / (180.0 * 3600.0);
