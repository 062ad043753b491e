//! Timed retry of pending uploads.

use std::sync::Arc;
use std::time::Duration;

use domain::services::CollaboratorError;

use super::scheduler::Job;
use crate::error::TrackingError;
use crate::session::TrackingSessionManager;

/// Flushes the upload buffer when it holds anything.
///
/// Covers a queue that stays below the batch size after a failed flush,
/// which would otherwise wait for the next threshold or connectivity signal.
pub struct UploadRetryJob {
    manager: Arc<TrackingSessionManager>,
    interval: Duration,
}

impl UploadRetryJob {
    pub fn new(manager: Arc<TrackingSessionManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }
}

#[async_trait::async_trait]
impl Job for UploadRetryJob {
    fn name(&self) -> &'static str {
        "upload_retry"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> Result<(), TrackingError> {
        let buffer = self.manager.upload_buffer();
        if buffer.is_empty() && buffer.pending_event_count() == 0 {
            return Ok(());
        }

        let outcome = self.manager.flush_uploads().await;
        if outcome.failed {
            return Err(TrackingError::SinkUnavailable(CollaboratorError::Unavailable(
                format!("{} updates still queued", outcome.remaining),
            )));
        }
        Ok(())
    }
}
