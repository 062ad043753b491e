//! Geofence transition events produced by the tracking engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coordinate::Coordinate;

/// Kind of zone transition. Dwell fires once per stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeofenceTransitionType {
    Enter,
    Exit,
    Dwell,
}

impl GeofenceTransitionType {
    /// Label used for the `event_type` column and metric tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Exit => "exit",
            Self::Dwell => "dwell",
        }
    }

}

impl std::fmt::Display for GeofenceTransitionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A zone membership change for one user. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceEvent {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: String,
    pub farm_id: String,
    pub zone_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    pub event_type: GeofenceTransitionType,
    pub timestamp: DateTime<Utc>,
    pub coordinate: Coordinate,
    /// Time spent in the zone, set on dwell events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    /// Whether the zone's alert flags ask for this transition to be surfaced.
    #[serde(default)]
    pub notify: bool,
}
