//! Asset entity (database row mapping).

use sqlx::FromRow;

use domain::models::Asset;

/// Database row mapping for the assets table.
#[derive(Debug, Clone, FromRow)]
pub struct AssetEntity {
    pub asset_id: String,
    pub farm_id: String,
    pub label: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<AssetEntity> for Asset {
    fn from(entity: AssetEntity) -> Self {
        Self {
            id: entity.asset_id,
            farm_id: entity.farm_id,
            latitude: entity.latitude,
            longitude: entity.longitude,
            label: entity.label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_entity_to_domain() {
        let entity = AssetEntity {
            asset_id: "tree-42".to_string(),
            farm_id: "farm-1".to_string(),
            label: Some("Durian Ri6 #42".to_string()),
            latitude: 10.0004,
            longitude: 106.0003,
        };

        let asset: Asset = entity.into();
        assert_eq!(asset.id, "tree-42");
        assert_eq!(asset.position().latitude, 10.0004);
        assert_eq!(asset.label.as_deref(), Some("Durian Ri6 #42"));
    }
}
