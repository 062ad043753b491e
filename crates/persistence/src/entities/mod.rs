//! Database entity definitions.
//!
//! Entities map directly to database rows and are converted into domain
//! models before leaving this crate.

pub mod asset;
pub mod tracking_session;
pub mod zone;

pub use asset::AssetEntity;
pub use tracking_session::TrackingSessionEntity;
pub use zone::ZoneEntity;
