//! Collaborator interfaces consumed by the tracking engine.
//!
//! Each trait has an in-memory implementation used by tests and local
//! simulation; production implementations live in `persistence`.

pub mod asset_catalog;
pub mod error;
pub mod positioning;
pub mod telemetry_sink;
pub mod zone_store;

pub use asset_catalog::{AssetCatalog, InMemoryAssetCatalog};
pub use error::CollaboratorError;
pub use positioning::{FixStream, MockPositionSource, PermissionState, PositionSource, WatchOptions};
pub use telemetry_sink::{RecordingTelemetrySink, TelemetrySink};
pub use zone_store::{InMemoryZoneStore, ZoneStore};
