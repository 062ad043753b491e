//! Shared utilities for the field tracking workspace.
//!
//! This crate has no I/O and is used by every other crate:
//! - Geometry (haversine distance, polygon containment, edge distance)
//! - Validation rules for fixes and zone polygons

pub mod geo;
pub mod validation;

pub use geo::{distance_meters, point_in_polygon, LatLng};
