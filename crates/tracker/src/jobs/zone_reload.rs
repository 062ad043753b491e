//! Periodic zone catalog refresh.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::scheduler::Job;
use crate::error::TrackingError;
use crate::session::TrackingSessionManager;

/// Reloads the zone catalog so edits in the zone store reach the detector.
pub struct ZoneReloadJob {
    manager: Arc<TrackingSessionManager>,
    interval: Duration,
}

impl ZoneReloadJob {
    pub fn new(manager: Arc<TrackingSessionManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }
}

#[async_trait::async_trait]
impl Job for ZoneReloadJob {
    fn name(&self) -> &'static str {
        "zone_reload"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> Result<(), TrackingError> {
        match self.manager.reload_zones().await? {
            Some(count) => debug!(zones = count, "Zones refreshed"),
            None => debug!("No farm loaded, skipping zone refresh"),
        }
        Ok(())
    }
}
