//! In-memory zone catalog.
//!
//! Holds the active zones of one farm as an immutable snapshot. Reloads
//! build a new snapshot and swap it in, so readers never see a partially
//! replaced catalog. A failed reload keeps the previous snapshot when it
//! belongs to the same farm; zones of another farm are never kept.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use domain::models::Zone;
use domain::services::{CollaboratorError, ZoneStore};
use shared::geo::LatLng;

use crate::error::TrackingError;
use crate::metrics;

/// Zones of one farm as loaded at a point in time.
#[derive(Debug, Clone, Default)]
pub struct ZoneSnapshot {
    pub farm_id: Option<String>,
    /// Active zones in store order.
    pub zones: Vec<Zone>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl ZoneSnapshot {
    fn unloaded(farm_id: &str) -> Self {
        Self {
            farm_id: Some(farm_id.to_string()),
            zones: Vec::new(),
            loaded_at: None,
        }
    }

    /// Whether these zones were loaded for the farm.
    pub fn is_for_farm(&self, farm_id: &str) -> bool {
        self.farm_id.as_deref() == Some(farm_id)
    }

    /// First zone, in catalog order, containing the point.
    ///
    /// Zones restricted to other users are skipped.
    pub fn find_containing(&self, point: LatLng, user_id: &str) -> Option<&Zone> {
        self.zones
            .iter()
            .find(|zone| zone.permits(user_id) && zone.contains(point))
    }

    pub fn get(&self, zone_id: &str) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.id == zone_id)
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

pub struct ZoneCatalog {
    store: Arc<dyn ZoneStore>,
    fetch_timeout: Duration,
    snapshot: RwLock<Arc<ZoneSnapshot>>,
}

impl ZoneCatalog {
    pub fn new(store: Arc<dyn ZoneStore>, fetch_timeout: Duration) -> Self {
        Self {
            store,
            fetch_timeout,
            snapshot: RwLock::new(Arc::new(ZoneSnapshot::default())),
        }
    }

    /// Fetch the farm's active zones and replace the snapshot.
    ///
    /// Returns the number of zones loaded. On failure `CatalogUnavailable`
    /// is returned; the previous snapshot stays in place if it is for the
    /// same farm, otherwise the catalog is emptied for `farm_id`.
    pub async fn reload(&self, farm_id: &str) -> Result<usize, TrackingError> {
        let fetched = tokio::time::timeout(self.fetch_timeout, self.store.list_active_zones(farm_id))
            .await
            .unwrap_or_else(|_| Err(CollaboratorError::Timeout(self.fetch_timeout.as_millis() as u64)));

        let zones = match fetched {
            Ok(zones) => zones,
            Err(e) => {
                let previous = self.snapshot();
                if previous.is_for_farm(farm_id) {
                    warn!(
                        farm_id = %farm_id,
                        error = %e,
                        kept_zones = previous.len(),
                        "Zone catalog reload failed, keeping previous zones"
                    );
                    metrics::record_catalog_reload("failure", previous.len());
                } else {
                    warn!(
                        farm_id = %farm_id,
                        previous_farm_id = ?previous.farm_id,
                        error = %e,
                        "Zone catalog reload failed for a new farm, no zones loaded"
                    );
                    self.replace(ZoneSnapshot::unloaded(farm_id));
                    metrics::record_catalog_reload("failure", 0);
                }
                return Err(TrackingError::CatalogUnavailable(e));
            }
        };

        let zones: Vec<Zone> = zones
            .into_iter()
            .filter(|zone| zone.is_active && zone.farm_id == farm_id)
            .filter(|zone| match zone.validate_geometry() {
                Ok(()) => true,
                Err(e) => {
                    warn!(zone_id = %zone.id, error = %e, "Skipping zone with invalid polygon");
                    false
                }
            })
            .collect();

        let count = zones.len();
        self.replace(ZoneSnapshot {
            farm_id: Some(farm_id.to_string()),
            zones,
            loaded_at: Some(Utc::now()),
        });

        info!(farm_id = %farm_id, zones = count, "Zone catalog reloaded");
        metrics::record_catalog_reload("success", count);
        Ok(count)
    }

    /// Current snapshot. Cheap; callers may hold it across awaits.
    pub fn snapshot(&self) -> Arc<ZoneSnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// First zone containing the point that the user may enter.
    pub fn find_containing(&self, point: LatLng, user_id: &str) -> Option<Zone> {
        self.snapshot().find_containing(point, user_id).cloned()
    }

    /// Farm of the loaded snapshot, if any reload succeeded.
    pub fn farm_id(&self) -> Option<String> {
        self.snapshot().farm_id.clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn replace(&self, snapshot: ZoneSnapshot) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(snapshot);
    }
}
