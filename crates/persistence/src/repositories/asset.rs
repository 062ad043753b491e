//! Asset repository for database operations.

use sqlx::PgPool;

use domain::models::Asset;
use domain::services::{AssetCatalog, CollaboratorError};

use super::to_collaborator_error;
use crate::entities::AssetEntity;
use crate::metrics::QueryTimer;

/// Repository for asset read operations.
#[derive(Clone)]
pub struct AssetRepository {
    pool: PgPool,
}

impl AssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A page of a farm's assets.
    pub async fn find_by_farm(&self, farm_id: &str, limit: i64) -> Result<Vec<AssetEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_assets_by_farm");

        let result = sqlx::query_as::<_, AssetEntity>(
            r#"
            SELECT asset_id, farm_id, label, latitude, longitude
            FROM assets
            WHERE farm_id = $1
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(farm_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;

        timer.record();
        result
    }
}

#[async_trait::async_trait]
impl AssetCatalog for AssetRepository {
    async fn list_assets_near(
        &self,
        farm_id: &str,
        limit: usize,
    ) -> Result<Vec<Asset>, CollaboratorError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let entities = self
            .find_by_farm(farm_id, limit)
            .await
            .map_err(to_collaborator_error)?;
        Ok(entities.into_iter().map(Asset::from).collect())
    }
}
