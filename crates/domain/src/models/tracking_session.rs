//! Tracking session domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One continuous tracking interval for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSession {
    pub id: Uuid,
    pub user_id: String,
    pub farm_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_distance_meters: f64,
    pub average_accuracy_meters: f64,
    pub location_count: u64,
    /// Distinct zone ids in first-visit order.
    pub zones_visited: Vec<String>,
    pub is_active: bool,
}

impl TrackingSession {
    /// Opens a fresh session with a new id.
    pub fn start(user_id: impl Into<String>, farm_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            farm_id: farm_id.into(),
            start_time: now,
            end_time: None,
            total_distance_meters: 0.0,
            average_accuracy_meters: 0.0,
            location_count: 0,
            zones_visited: Vec::new(),
            is_active: true,
        }
    }

    /// Folds one accepted fix into the aggregates.
    ///
    /// The average accuracy is an incremental mean over every accepted fix.
    pub fn record_fix(&mut self, accuracy: f64, distance_increment: f64, zone_id: Option<&str>) {
        self.location_count += 1;
        self.average_accuracy_meters +=
            (accuracy - self.average_accuracy_meters) / self.location_count as f64;
        self.total_distance_meters += distance_increment;

        if let Some(zone_id) = zone_id {
            if !self.zones_visited.iter().any(|z| z == zone_id) {
                self.zones_visited.push(zone_id.to_string());
            }
        }
    }

    /// Closes the session. Aggregates are left as they are.
    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.end_time = Some(now);
        self.is_active = false;
    }

    /// Elapsed time, up to `now` while still active.
    pub fn duration(&self, now: DateTime<Utc>) -> chrono::Duration {
        self.end_time.unwrap_or(now) - self.start_time
    }
}

/// Kind of session lifecycle change published to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionChangeKind {
    Started,
    Stopped,
}

/// Session lifecycle notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionChange {
    pub kind: SessionChangeKind,
    pub session: TrackingSession,
}
