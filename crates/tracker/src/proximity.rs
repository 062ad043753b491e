//! Nearby asset lookup.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use domain::services::{AssetCatalog, CollaboratorError};
use shared::geo::{distance_meters, LatLng};

/// Finds catalog assets within a radius of a point.
///
/// The catalog returns one page of the farm's assets; the radius filter is
/// applied here. Lookup failures degrade to an empty result.
pub struct ProximityIndex {
    catalog: Arc<dyn AssetCatalog>,
    page_size: usize,
    timeout: Duration,
}

impl ProximityIndex {
    pub fn new(catalog: Arc<dyn AssetCatalog>, page_size: usize, timeout: Duration) -> Self {
        Self {
            catalog,
            page_size,
            timeout,
        }
    }

    /// Ids of assets within `radius_meters`, nearest first.
    pub async fn find_nearby(&self, farm_id: &str, point: LatLng, radius_meters: f64) -> Vec<String> {
        let fetched = tokio::time::timeout(self.timeout, self.catalog.list_assets_near(farm_id, self.page_size))
            .await
            .unwrap_or_else(|_| Err(CollaboratorError::Timeout(self.timeout.as_millis() as u64)));

        let assets = match fetched {
            Ok(assets) => assets,
            Err(e) => {
                warn!(farm_id = %farm_id, error = %e, "Asset lookup failed, reporting no nearby assets");
                return Vec::new();
            }
        };

        let mut nearby: Vec<(f64, String)> = assets
            .into_iter()
            .filter_map(|asset| {
                let distance = distance_meters(point, asset.position());
                (distance <= radius_meters).then_some((distance, asset.id))
            })
            .collect();

        nearby.sort_by(|a, b| a.0.total_cmp(&b.0));
        nearby.into_iter().map(|(_, id)| id).collect()
    }
}
