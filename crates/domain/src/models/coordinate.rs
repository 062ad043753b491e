//! Position fix domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::geo::LatLng;
use validator::Validate;

/// A single position reading. Immutable once captured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    /// Horizontal accuracy radius in meters.
    #[validate(custom(function = "shared::validation::validate_accuracy"))]
    pub accuracy: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude_accuracy: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "shared::validation::validate_heading"))]
    pub heading: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "shared::validation::validate_speed"))]
    pub speed: Option<f64>,

    pub timestamp: DateTime<Utc>,
}

impl Coordinate {
    /// Creates a coordinate with only the mandatory fields set.
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            altitude: None,
            altitude_accuracy: None,
            heading: None,
            speed: None,
            timestamp,
        }
    }

    pub fn lat_lng(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    /// Great-circle distance to another coordinate in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        shared::geo::distance_meters(self.lat_lng(), other.lat_lng())
    }
}

/// Device state reported alongside a fix.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTelemetry {
    #[validate(custom(function = "shared::validation::validate_battery_level"))]
    pub battery_level: Option<i32>,

    pub is_charging: Option<bool>,

    /// Connection type reported by the device (wifi, 4g, offline, ...).
    pub network_type: Option<String>,
}

/// A raw fix as delivered by a positioning source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PositionFix {
    #[validate(nested)]
    pub coordinate: Coordinate,

    #[serde(default)]
    #[validate(nested)]
    pub telemetry: DeviceTelemetry,

    /// Positioning provider (gps, network, fused).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl PositionFix {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            telemetry: DeviceTelemetry::default(),
            provider: None,
        }
    }

    pub fn with_telemetry(mut self, telemetry: DeviceTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_deserialization_minimal() {
        let json = r#"{
            "latitude": 10.0005,
            "longitude": 106.0005,
            "accuracy": 8.5,
            "timestamp": "2024-03-01T06:30:00Z"
        }"#;

        let coord: Coordinate = serde_json::from_str(json).unwrap();
        assert_eq!(coord.latitude, 10.0005);
        assert_eq!(coord.accuracy, 8.5);
        assert!(coord.heading.is_none());
        assert!(coord.validate().is_ok());
    }

    #[test]
    fn test_coordinate_serialization_skips_absent_optionals() {
        let coord = Coordinate::new(10.0, 106.0, 5.0, Utc::now());
        let json = serde_json::to_string(&coord).unwrap();
        assert!(json.contains("\"accuracy\":5"));
        assert!(!json.contains("altitudeAccuracy"));
        assert!(!json.contains("heading"));
    }

    #[test]
    fn test_coordinate_validation_rejects_out_of_range() {
        let mut coord = Coordinate::new(91.0, 106.0, 5.0, Utc::now());
        assert!(coord.validate().is_err());

        coord.latitude = 10.0;
        coord.accuracy = -3.0;
        assert!(coord.validate().is_err());

        coord.accuracy = 3.0;
        coord.heading = Some(400.0);
        assert!(coord.validate().is_err());
    }

    #[test]
    fn test_distance_to() {
        let now = Utc::now();
        let a = Coordinate::new(10.000, 106.000, 5.0, now);
        let b = Coordinate::new(10.001, 106.000, 5.0, now);
        assert!((a.distance_to(&b) - 111.19).abs() < 0.5);
    }

    #[test]
    fn test_position_fix_default_telemetry() {
        let json = r#"{
            "coordinate": {
                "latitude": 10.0,
                "longitude": 106.0,
                "accuracy": 12.0,
                "timestamp": "2024-03-01T06:30:00Z"
            },
            "provider": "gps"
        }"#;

        let fix: PositionFix = serde_json::from_str(json).unwrap();
        assert_eq!(fix.provider.as_deref(), Some("gps"));
        assert_eq!(fix.telemetry, DeviceTelemetry::default());
    }

    #[test]
    fn test_position_fix_validates_battery() {
        let fix = PositionFix::new(Coordinate::new(10.0, 106.0, 5.0, Utc::now())).with_telemetry(
            DeviceTelemetry {
                battery_level: Some(140),
                ..Default::default()
            },
        );
        assert!(fix.validate().is_err());
    }
}
