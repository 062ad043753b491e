//! Tracking session entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::TrackingSession;

/// Database row mapping for the tracking_sessions table.
#[derive(Debug, Clone, FromRow)]
pub struct TrackingSessionEntity {
    pub session_id: Uuid,
    pub user_id: String,
    pub farm_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub total_distance_meters: f64,
    pub average_accuracy_meters: f64,
    pub location_count: i64,
    pub zones_visited: Vec<String>,
    pub is_active: bool,
}

impl From<TrackingSessionEntity> for TrackingSession {
    fn from(entity: TrackingSessionEntity) -> Self {
        Self {
            id: entity.session_id,
            user_id: entity.user_id,
            farm_id: entity.farm_id,
            start_time: entity.start_time,
            end_time: entity.end_time,
            total_distance_meters: entity.total_distance_meters,
            average_accuracy_meters: entity.average_accuracy_meters,
            location_count: entity.location_count.max(0) as u64,
            zones_visited: entity.zones_visited,
            is_active: entity.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_entity_to_domain() {
        let entity = TrackingSessionEntity {
            session_id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            farm_id: "farm-1".to_string(),
            start_time: Utc::now(),
            end_time: None,
            total_distance_meters: 1520.4,
            average_accuracy_meters: 7.9,
            location_count: 212,
            zones_visited: vec!["zone-a".to_string()],
            is_active: true,
        };

        let session: TrackingSession = entity.clone().into();
        assert_eq!(session.id, entity.session_id);
        assert_eq!(session.location_count, 212);
        assert_eq!(session.zones_visited, vec!["zone-a".to_string()]);
        assert!(session.is_active);
    }
}
