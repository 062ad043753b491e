//! Asset (tree) catalog interface.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;

use super::error::CollaboratorError;
use crate::models::Asset;

/// Source of located assets for proximity lookups.
///
/// Implementations are expected to pre-filter by farm; callers apply their
/// own radius filter on the returned page.
#[async_trait::async_trait]
pub trait AssetCatalog: Send + Sync {
    /// Return up to `limit` assets of the farm.
    async fn list_assets_near(
        &self,
        farm_id: &str,
        limit: usize,
    ) -> Result<Vec<Asset>, CollaboratorError>;
}

/// In-memory asset catalog for development and testing.
#[derive(Debug, Default)]
pub struct InMemoryAssetCatalog {
    assets: RwLock<Vec<Asset>>,
    fail: AtomicBool,
    delay_ms: AtomicU64,
}

impl InMemoryAssetCatalog {
    pub fn new(assets: Vec<Asset>) -> Self {
        Self {
            assets: RwLock::new(assets),
            fail: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
        }
    }

    pub async fn insert(&self, asset: Asset) {
        self.assets.write().await.push(asset);
    }

    /// Make subsequent calls fail with `Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Delay every lookup, simulating a slow catalog.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl AssetCatalog for InMemoryAssetCatalog {
    async fn list_assets_near(
        &self,
        farm_id: &str,
        limit: usize,
    ) -> Result<Vec<Asset>, CollaboratorError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("asset catalog offline".into()));
        }

        Ok(self
            .assets
            .read()
            .await
            .iter()
            .filter(|a| a.farm_id == farm_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
