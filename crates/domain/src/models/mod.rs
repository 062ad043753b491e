//! Domain models for field tracking.

pub mod asset;
pub mod coordinate;
pub mod geofence_event;
pub mod location_update;
pub mod tracking_session;
pub mod zone;

pub use asset::Asset;
pub use coordinate::{Coordinate, DeviceTelemetry, PositionFix};
pub use geofence_event::{GeofenceEvent, GeofenceTransitionType};
pub use location_update::{CaptureMetadata, LocationUpdate};
pub use tracking_session::{SessionChange, SessionChangeKind, TrackingSession};
pub use zone::{Zone, ZoneMetadata};
