//! Per-fix location record queued for upload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coordinate::{Coordinate, DeviceTelemetry};

/// Derived record for one accepted fix. Write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: String,
    pub farm_id: String,
    pub coordinate: Coordinate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    pub is_in_zone: bool,
    pub nearby_asset_ids: Vec<String>,
    pub telemetry: DeviceTelemetry,
    pub metadata: CaptureMetadata,
    pub recorded_at: DateTime<Utc>,
}

/// How and when a fix was captured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureMetadata {
    /// 1-based position of the fix among the session's accepted fixes.
    pub sequence: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub distance_from_previous_meters: f64,
    /// Captured while the device reported no connectivity.
    pub captured_offline: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_update_serialization() {
        let update = LocationUpdate {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            farm_id: "farm-1".to_string(),
            coordinate: Coordinate::new(10.0005, 106.0005, 4.0, Utc::now()),
            zone_id: None,
            zone_name: None,
            is_in_zone: false,
            nearby_asset_ids: vec!["tree-7".to_string()],
            telemetry: DeviceTelemetry {
                battery_level: Some(81),
                is_charging: None,
                network_type: Some("4g".to_string()),
            },
            metadata: CaptureMetadata {
                sequence: 1,
                ..Default::default()
            },
            recorded_at: Utc::now(),
        };

        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"isInZone\":false"));
        assert!(json.contains("\"nearbyAssetIds\":[\"tree-7\"]"));
        assert!(json.contains("\"batteryLevel\":81"));
        assert!(!json.contains("zoneId"));
    }
}
