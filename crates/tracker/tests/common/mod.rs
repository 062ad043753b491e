//! Common fixtures for tracking engine integration tests.
//!
//! Builds a `TrackingSessionManager` over in-memory collaborators and
//! provides zones, assets and fixes around a small test farm.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fake::faker::lorem::en::Word;
use fake::Fake;

use domain::models::{Asset, Coordinate, DeviceTelemetry, PositionFix, Zone, ZoneMetadata};
use domain::services::{
    InMemoryAssetCatalog, InMemoryZoneStore, MockPositionSource, RecordingTelemetrySink,
};
use field_tracker::config::Config;
use field_tracker::{TrackingDeps, TrackingSessionManager};
use shared::geo::LatLng;

pub const FARM_ID: &str = "farm-1";
pub const USER_ID: &str = "worker-1";

/// Handles to every collaborator so tests can steer and inspect them.
pub struct Harness {
    pub manager: Arc<TrackingSessionManager>,
    pub zones: Arc<InMemoryZoneStore>,
    pub assets: Arc<InMemoryAssetCatalog>,
    pub sink: Arc<RecordingTelemetrySink>,
    pub source: Arc<MockPositionSource>,
}

/// Configuration tuned for tests: no boundary buffer, no stale check.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.tracking.geofence_boundary_buffer_meters = 0.0;
    config.tracking.max_fix_age_ms = 0;
    config.upload.sink_timeout_ms = 1_000;
    config.catalog.fetch_timeout_ms = 1_000;
    config.metrics.prometheus_port = 0;
    config
}

pub fn harness() -> Harness {
    harness_with(test_config(), MockPositionSource::new(), vec![block_a(), block_b()])
}

pub fn harness_with(config: Config, source: MockPositionSource, zones: Vec<Zone>) -> Harness {
    let zones = Arc::new(InMemoryZoneStore::with_zones(zones));
    let assets = Arc::new(InMemoryAssetCatalog::new(Vec::new()));
    let sink = Arc::new(RecordingTelemetrySink::new());
    let source = Arc::new(source);

    let manager = TrackingSessionManager::new(
        &config,
        TrackingDeps {
            zone_store: zones.clone(),
            asset_catalog: assets.clone(),
            sink: sink.clone(),
            position_source: source.clone(),
        },
    );

    Harness {
        manager,
        zones,
        assets,
        sink,
        source,
    }
}

/// Axis-aligned square zone of `size` degrees with its south-west corner at
/// (`lat`, `lng`).
pub fn square_zone(id: &str, lat: f64, lng: f64, size: f64) -> Zone {
    Zone {
        id: id.to_string(),
        name: format!("{} {}", Word().fake::<String>(), id),
        farm_id: FARM_ID.to_string(),
        polygon: vec![
            LatLng::new(lat, lng),
            LatLng::new(lat, lng + size),
            LatLng::new(lat + size, lng + size),
            LatLng::new(lat + size, lng),
        ],
        is_active: true,
        alert_on_entry: true,
        alert_on_exit: true,
        allowed_user_ids: None,
        metadata: ZoneMetadata::default(),
        updated_at: None,
    }
}

/// Block A: 10.000..10.001 N, 106.000..106.001 E.
pub fn block_a() -> Zone {
    square_zone("zone-a", 10.000, 106.000, 0.001)
}

/// Block B: directly east of block A.
pub fn block_b() -> Zone {
    square_zone("zone-b", 10.000, 106.001, 0.001)
}

pub fn tree(id: &str, lat: f64, lng: f64) -> Asset {
    Asset {
        id: id.to_string(),
        farm_id: FARM_ID.to_string(),
        latitude: lat,
        longitude: lng,
        label: Some(format!("Tree {}", id)),
    }
}

pub fn fix(lat: f64, lng: f64, accuracy: f64) -> PositionFix {
    PositionFix::new(Coordinate::new(lat, lng, accuracy, Utc::now()))
}

pub fn fix_with_telemetry(lat: f64, lng: f64, battery: i32, network: &str) -> PositionFix {
    fix(lat, lng, 5.0).with_telemetry(DeviceTelemetry {
        battery_level: Some(battery),
        is_charging: Some(false),
        network_type: Some(network.to_string()),
    })
}

/// Poll `check` until it returns true or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
