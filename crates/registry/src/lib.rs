//! SQLite registry of survey exposures.
//!
//! The registry holds two tables: `raw`, one row per exposure, and
//! `raw_skyTile`, one row per (exposure, sky tile) pair the exposure
//! overlaps. A registry is written once: either created empty or copied from
//! an earlier registry and extended, but never overwritten in place.
//!
//! # Identity
//! An exposure is identified by its [`ExposureKey`] (run, rerun, band, camera
//! column and frame), which a unique index enforces. Inserting an exposure
//! that is already present is a no-op, so re-running over the same data is
//! safe.

mod db;
pub mod error;
mod models;
mod registry;

pub use crate::db::Database;
pub use crate::models::{Band, Exposure, ExposureKey, StoredExposure};
pub use crate::registry::Registry;
