//! Location update repository for database operations.

use sqlx::PgPool;

use domain::models::LocationUpdate;

use crate::metrics::QueryTimer;

/// Repository for location update records.
#[derive(Clone)]
pub struct LocationUpdateRepository {
    pool: PgPool,
}

impl LocationUpdateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of updates in one transaction.
    ///
    /// Rows already present (same update id) are skipped, so a batch that
    /// is retried after a lost acknowledgement does not duplicate.
    pub async fn insert_batch(&self, updates: &[LocationUpdate]) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("insert_location_updates_batch");
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for update in updates {
            let c = &update.coordinate;
            let result = sqlx::query(
                r#"
                INSERT INTO location_updates (
                    update_id, session_id, user_id, farm_id, latitude, longitude, accuracy,
                    altitude, heading, speed, captured_at, zone_id, is_in_zone,
                    nearby_asset_ids, battery_level, network_type, sequence,
                    captured_offline, recorded_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
                ON CONFLICT (update_id) DO NOTHING
                "#,
            )
            .bind(update.id)
            .bind(update.session_id)
            .bind(&update.user_id)
            .bind(&update.farm_id)
            .bind(c.latitude)
            .bind(c.longitude)
            .bind(c.accuracy)
            .bind(c.altitude)
            .bind(c.heading)
            .bind(c.speed)
            .bind(c.timestamp)
            .bind(&update.zone_id)
            .bind(update.is_in_zone)
            .bind(&update.nearby_asset_ids)
            .bind(update.telemetry.battery_level)
            .bind(&update.telemetry.network_type)
            .bind(i64::try_from(update.metadata.sequence).unwrap_or(i64::MAX))
            .bind(update.metadata.captured_offline)
            .bind(update.recorded_at)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;
        timer.record();
        Ok(inserted)
    }
}
