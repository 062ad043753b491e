//! Farm zone (polygon geofence) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::geo::{self, LatLng};
use validator::ValidationError;

use super::geofence_event::GeofenceTransitionType;

/// A named polygon scoped to a farm.
///
/// Zones are edited elsewhere; the tracking engine only reads active ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub farm_id: String,
    /// Ordered ring of vertices. The first vertex is not repeated at the end.
    pub polygon: Vec<LatLng>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub alert_on_entry: bool,
    #[serde(default)]
    pub alert_on_exit: bool,
    /// Users allowed in this zone. `None` means unrestricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_user_ids: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: ZoneMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Descriptive attributes carried with a zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_hectares: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perimeter_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_ph: Option<f64>,
}

fn default_active() -> bool {
    true
}

impl Zone {
    /// Even-odd containment against the zone ring.
    pub fn contains(&self, point: LatLng) -> bool {
        geo::point_in_polygon(point, &self.polygon)
    }

    /// Approximate distance in meters from a point to the zone boundary.
    pub fn boundary_distance_meters(&self, point: LatLng) -> f64 {
        geo::distance_to_ring_meters(point, &self.polygon)
    }

    /// Checks the ring has at least three valid vertices.
    pub fn validate_geometry(&self) -> Result<(), ValidationError> {
        shared::validation::validate_polygon(&self.polygon)
    }

    /// Whether a transition of the given type should raise an alert.
    ///
    /// Dwell alerts follow the entry flag.
    pub fn alerts_on(&self, event_type: GeofenceTransitionType) -> bool {
        match event_type {
            GeofenceTransitionType::Enter | GeofenceTransitionType::Dwell => self.alert_on_entry,
            GeofenceTransitionType::Exit => self.alert_on_exit,
        }
    }

    /// Whether the user is on the zone's allow-list (or the zone has none).
    pub fn permits(&self, user_id: &str) -> bool {
        self.allowed_user_ids
            .as_ref()
            .map_or(true, |ids| ids.iter().any(|id| id == user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_a() -> Zone {
        Zone {
            id: "zone-a".to_string(),
            name: "Block A".to_string(),
            farm_id: "farm-1".to_string(),
            polygon: vec![
                LatLng::new(10.000, 106.000),
                LatLng::new(10.000, 106.001),
                LatLng::new(10.001, 106.001),
                LatLng::new(10.001, 106.000),
            ],
            is_active: true,
            alert_on_entry: true,
            alert_on_exit: false,
            allowed_user_ids: None,
            metadata: ZoneMetadata::default(),
            updated_at: None,
        }
    }

    #[test]
    fn test_zone_contains() {
        let zone = block_a();
        assert!(zone.contains(LatLng::new(10.0005, 106.0005)));
        assert!(!zone.contains(LatLng::new(10.002, 106.002)));
    }

    #[test]
    fn test_zone_deserialization_defaults() {
        let json = r#"{
            "id": "z1",
            "name": "Durian North",
            "farmId": "farm-1",
            "polygon": [
                {"latitude": 10.0, "longitude": 106.0},
                {"latitude": 10.0, "longitude": 106.001},
                {"latitude": 10.001, "longitude": 106.001}
            ]
        }"#;

        let zone: Zone = serde_json::from_str(json).unwrap();
        assert!(zone.is_active);
        assert!(!zone.alert_on_entry);
        assert!(zone.allowed_user_ids.is_none());
        assert!(zone.validate_geometry().is_ok());
    }

    #[test]
    fn test_zone_metadata_round_trip_fields() {
        let json = r#"{"areaHectares": 2.5, "soilType": "basalt", "soilPh": 5.8}"#;
        let metadata: ZoneMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata.area_hectares, Some(2.5));
        assert_eq!(metadata.soil_type.as_deref(), Some("basalt"));
        assert!(metadata.perimeter_meters.is_none());
    }

    #[test]
    fn test_validate_geometry_rejects_short_ring() {
        let mut zone = block_a();
        zone.polygon.truncate(2);
        assert!(zone.validate_geometry().is_err());
    }

    #[test]
    fn test_alerts_on() {
        let zone = block_a();
        assert!(zone.alerts_on(GeofenceTransitionType::Enter));
        assert!(zone.alerts_on(GeofenceTransitionType::Dwell));
        assert!(!zone.alerts_on(GeofenceTransitionType::Exit));
    }

    #[test]
    fn test_permits() {
        let mut zone = block_a();
        assert!(zone.permits("anyone"));

        zone.allowed_user_ids = Some(vec!["u1".to_string()]);
        assert!(zone.permits("u1"));
        assert!(!zone.permits("u2"));
    }
}
