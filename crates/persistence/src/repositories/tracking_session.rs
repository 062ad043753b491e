//! Tracking session repository for database operations.

use sqlx::PgPool;

use domain::models::TrackingSession;

use crate::entities::TrackingSessionEntity;
use crate::metrics::QueryTimer;

/// Repository for tracking session records.
#[derive(Clone)]
pub struct TrackingSessionRepository {
    pool: PgPool,
}

impl TrackingSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a session or overwrite its aggregates.
    pub async fn upsert(&self, session: &TrackingSession) -> Result<TrackingSessionEntity, sqlx::Error> {
        let timer = QueryTimer::new("upsert_tracking_session");

        let result = sqlx::query_as::<_, TrackingSessionEntity>(
            r#"
            INSERT INTO tracking_sessions (
                session_id, user_id, farm_id, start_time, end_time, total_distance_meters,
                average_accuracy_meters, location_count, zones_visited, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (session_id) DO UPDATE SET
                end_time = EXCLUDED.end_time,
                total_distance_meters = EXCLUDED.total_distance_meters,
                average_accuracy_meters = EXCLUDED.average_accuracy_meters,
                location_count = EXCLUDED.location_count,
                zones_visited = EXCLUDED.zones_visited,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            RETURNING session_id, user_id, farm_id, start_time, end_time, total_distance_meters,
                      average_accuracy_meters, location_count, zones_visited, is_active
            "#,
        )
        .bind(session.id)
        .bind(&session.user_id)
        .bind(&session.farm_id)
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.total_distance_meters)
        .bind(session.average_accuracy_meters)
        .bind(i64::try_from(session.location_count).unwrap_or(i64::MAX))
        .bind(&session.zones_visited)
        .bind(session.is_active)
        .fetch_one(&self.pool)
        .await;

        timer.record();
        result
    }
}
