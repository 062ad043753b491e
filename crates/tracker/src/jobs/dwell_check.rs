//! Periodic dwell detection.

use std::sync::Arc;
use std::time::Duration;

use super::scheduler::Job;
use crate::error::TrackingError;
use crate::session::TrackingSessionManager;

/// Emits dwell events for users who stay in a zone past the threshold.
///
/// Dwell needs a clock rather than a fix, so it runs on a timer instead of
/// in the fix path.
pub struct DwellCheckJob {
    manager: Arc<TrackingSessionManager>,
    interval: Duration,
}

impl DwellCheckJob {
    pub fn new(manager: Arc<TrackingSessionManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }
}

#[async_trait::async_trait]
impl Job for DwellCheckJob {
    fn name(&self) -> &'static str {
        "dwell_check"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> Result<(), TrackingError> {
        self.manager.check_dwell().await;
        Ok(())
    }
}
