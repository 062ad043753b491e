//! Zone entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::{Zone, ZoneMetadata};

/// Database row mapping for the zones table.
#[derive(Debug, Clone, FromRow)]
pub struct ZoneEntity {
    pub id: i64,
    pub zone_id: String,
    pub farm_id: String,
    pub name: String,
    /// JSON array of `{latitude, longitude}` vertices.
    pub polygon: serde_json::Value,
    pub is_active: bool,
    pub alert_on_entry: bool,
    pub alert_on_exit: bool,
    pub allowed_user_ids: Option<Vec<String>>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ZoneEntity> for Zone {
    type Error = serde_json::Error;

    fn try_from(entity: ZoneEntity) -> Result<Self, Self::Error> {
        let metadata = match entity.metadata {
            Some(value) => serde_json::from_value(value)?,
            None => ZoneMetadata::default(),
        };

        Ok(Self {
            id: entity.zone_id,
            name: entity.name,
            farm_id: entity.farm_id,
            polygon: serde_json::from_value(entity.polygon)?,
            is_active: entity.is_active,
            alert_on_entry: entity.alert_on_entry,
            alert_on_exit: entity.alert_on_exit,
            allowed_user_ids: entity.allowed_user_ids,
            metadata,
            updated_at: Some(entity.updated_at),
        })
    }
}
