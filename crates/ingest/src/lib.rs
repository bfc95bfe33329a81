//! Turns run directories of corrected frames into registry rows.
//!
//! For every candidate file the [`Walker`] classifies the path, skips
//! exposures already registered, reads the primary header for the exposure
//! time, observation time and world coordinates, and records the sky tiles
//! the padded image footprint overlaps.

mod classify;
pub mod error;
mod extract;
mod footprint;
mod walk;

pub use crate::classify::{Classified, classify};
pub use crate::extract::{Metadata, read_metadata};
pub use crate::footprint::sky_tiles;
pub use crate::walk::{RunSummary, WalkSummary, Walker};
