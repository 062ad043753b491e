//! Zone store interface.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio::sync::RwLock;

use super::error::CollaboratorError;
use crate::models::Zone;

/// Read-only source of farm zones.
#[async_trait::async_trait]
pub trait ZoneStore: Send + Sync {
    /// List every zone flagged active for the farm, in catalog order.
    async fn list_active_zones(&self, farm_id: &str) -> Result<Vec<Zone>, CollaboratorError>;
}

/// In-memory zone store for development and testing.
#[derive(Debug, Default)]
pub struct InMemoryZoneStore {
    zones: RwLock<HashMap<String, Vec<Zone>>>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl InMemoryZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with zones, grouped by their farm id.
    pub fn with_zones(zones: Vec<Zone>) -> Self {
        let mut by_farm: HashMap<String, Vec<Zone>> = HashMap::new();
        for zone in zones {
            by_farm.entry(zone.farm_id.clone()).or_default().push(zone);
        }
        Self {
            zones: RwLock::new(by_farm),
            ..Self::default()
        }
    }

    /// Replace the zones of one farm.
    pub async fn set_zones(&self, farm_id: &str, zones: Vec<Zone>) {
        self.zones.write().await.insert(farm_id.to_string(), zones);
    }

    /// Make subsequent calls fail with `Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Number of `list_active_zones` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ZoneStore for InMemoryZoneStore {
    async fn list_active_zones(&self, farm_id: &str) -> Result<Vec<Zone>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("zone store offline".into()));
        }

        Ok(self
            .zones
            .read()
            .await
            .get(farm_id)
            .map(|zones| zones.iter().filter(|z| z.is_active).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ZoneMetadata;
    use fake::faker::lorem::en::Word;
    use fake::Fake;
    use shared::geo::LatLng;

    fn zone(id: &str, farm_id: &str, active: bool) -> Zone {
        Zone {
            id: id.to_string(),
            name: Word().fake(),
            farm_id: farm_id.to_string(),
            polygon: vec![
                LatLng::new(10.0, 106.0),
                LatLng::new(10.0, 106.001),
                LatLng::new(10.001, 106.001),
            ],
            is_active: active,
            alert_on_entry: false,
            alert_on_exit: false,
            allowed_user_ids: None,
            metadata: ZoneMetadata::default(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_lists_only_active_zones_of_farm_in_order() {
        let store = InMemoryZoneStore::with_zones(vec![
            zone("b", "farm-1", true),
            zone("x", "farm-2", true),
            zone("c", "farm-1", false),
            zone("a", "farm-1", true),
        ]);

        let ids: Vec<String> = store
            .list_active_zones("farm-1")
            .await
            .unwrap()
            .into_iter()
            .map(|z| z.id)
            .collect();
        assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
        assert!(store.list_active_zones("farm-3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_store() {
        let store = InMemoryZoneStore::new();
        store.set_failing(true);
        assert!(store.list_active_zones("farm-1").await.is_err());
        assert_eq!(store.call_count(), 1);
    }
}
