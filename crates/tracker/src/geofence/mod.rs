//! Zone catalog and geofence transition detection.

pub mod catalog;
pub mod detector;

pub use catalog::{ZoneCatalog, ZoneSnapshot};
pub use detector::GeofenceDetector;
