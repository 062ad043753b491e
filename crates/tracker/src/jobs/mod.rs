//! Background jobs: zone refresh, dwell detection and upload retry.

mod dwell_check;
mod scheduler;
mod upload_retry;
mod zone_reload;

pub use dwell_check::DwellCheckJob;
pub use scheduler::{Job, JobScheduler};
pub use upload_retry::UploadRetryJob;
pub use zone_reload::ZoneReloadJob;

use std::sync::Arc;

use crate::config::Config;
use crate::session::TrackingSessionManager;

/// Scheduler with the engine's standard jobs registered but not started.
pub fn standard_jobs(config: &Config, manager: &Arc<TrackingSessionManager>) -> JobScheduler {
    let mut scheduler = JobScheduler::new();
    scheduler.register(ZoneReloadJob::new(
        Arc::clone(manager),
        config.catalog.reload_interval(),
    ));
    scheduler.register(UploadRetryJob::new(
        Arc::clone(manager),
        config.upload.retry_interval(),
    ));
    if config.tracking.dwell_detection_enabled {
        scheduler.register(DwellCheckJob::new(
            Arc::clone(manager),
            config.tracking.dwell_check_interval(),
        ));
    }
    scheduler
}
