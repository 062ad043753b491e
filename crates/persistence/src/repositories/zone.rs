//! Zone repository for database operations.

use sqlx::PgPool;
use tracing::warn;

use domain::models::Zone;
use domain::services::{CollaboratorError, ZoneStore};

use super::to_collaborator_error;
use crate::entities::ZoneEntity;
use crate::metrics::QueryTimer;

/// Repository for zone read operations.
#[derive(Clone)]
pub struct ZoneRepository {
    pool: PgPool,
}

impl ZoneRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Active zones of a farm in creation order.
    pub async fn find_active_by_farm(&self, farm_id: &str) -> Result<Vec<ZoneEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_zones_by_farm");

        let result = sqlx::query_as::<_, ZoneEntity>(
            r#"
            SELECT id, zone_id, farm_id, name, polygon, is_active, alert_on_entry,
                   alert_on_exit, allowed_user_ids, metadata, created_at, updated_at
            FROM zones
            WHERE farm_id = $1 AND is_active = TRUE
            ORDER BY id ASC
            "#,
        )
        .bind(farm_id)
        .fetch_all(&self.pool)
        .await;

        timer.record();
        result
    }
}

#[async_trait::async_trait]
impl ZoneStore for ZoneRepository {
    async fn list_active_zones(&self, farm_id: &str) -> Result<Vec<Zone>, CollaboratorError> {
        let entities = self
            .find_active_by_farm(farm_id)
            .await
            .map_err(to_collaborator_error)?;

        let mut zones = Vec::with_capacity(entities.len());
        for entity in entities {
            let zone_id = entity.zone_id.clone();
            match Zone::try_from(entity) {
                Ok(zone) => match zone.validate_geometry() {
                    Ok(()) => zones.push(zone),
                    Err(e) => warn!(zone_id = %zone_id, error = %e, "Skipping zone with invalid polygon"),
                },
                Err(e) => warn!(zone_id = %zone_id, error = %e, "Skipping zone with malformed row"),
            }
        }
        Ok(zones)
    }
}
