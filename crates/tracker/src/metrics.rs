//! Tracking engine metrics.
//!
//! Recorded through the `metrics` facade; the binary installs a Prometheus
//! exporter, library users may install any recorder or none.

use metrics::{counter, gauge};

use domain::models::GeofenceTransitionType;

/// Count a processed fix by outcome (`accepted`, `inaccurate`, `too_close`, ...).
pub fn record_fix(outcome: &'static str) {
    counter!("tracking_fixes_total", "outcome" => outcome).increment(1);
}

pub fn record_geofence_event(event_type: GeofenceTransitionType) {
    counter!("geofence_events_total", "event_type" => event_type.as_str()).increment(1);
}

/// Count an upload batch attempt (`success`, `failure`).
pub fn record_upload_batch(result: &'static str) {
    counter!("upload_batches_total", "result" => result).increment(1);
}

pub fn record_upload_dropped(count: usize) {
    counter!("upload_records_dropped_total").increment(count as u64);
}

pub fn set_upload_queue_depth(depth: usize) {
    gauge!("upload_queue_depth").set(depth as f64);
}

/// Count a zone catalog reload and publish the resulting catalog size.
pub fn record_catalog_reload(result: &'static str, size: usize) {
    counter!("zone_catalog_reloads_total", "result" => result).increment(1);
    gauge!("zone_catalog_size").set(size as f64);
}
