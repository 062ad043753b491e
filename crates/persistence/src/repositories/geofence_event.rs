//! Geofence event repository for database operations.

use sqlx::PgPool;

use domain::models::GeofenceEvent;

use crate::metrics::QueryTimer;

/// Repository for geofence event records.
#[derive(Clone)]
pub struct GeofenceEventRepository {
    pool: PgPool,
}

impl GeofenceEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an event. Re-inserting the same event id is a no-op.
    pub async fn insert(&self, event: &GeofenceEvent) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("insert_geofence_event");

        let result = sqlx::query(
            r#"
            INSERT INTO geofence_events (
                event_id, session_id, user_id, farm_id, zone_id, event_type,
                timestamp, latitude, longitude, accuracy, duration_ms
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event.id)
        .bind(event.session_id)
        .bind(&event.user_id)
        .bind(&event.farm_id)
        .bind(&event.zone_id)
        .bind(event.event_type.as_str())
        .bind(event.timestamp)
        .bind(event.coordinate.latitude)
        .bind(event.coordinate.longitude)
        .bind(event.coordinate.accuracy)
        .bind(event.duration_ms)
        .execute(&self.pool)
        .await;

        timer.record();
        Ok(result?.rows_affected() > 0)
    }
}
