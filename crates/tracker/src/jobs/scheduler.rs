//! Periodic task runner for the tracking engine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::TrackingError;

/// A task run at a fixed interval.
#[async_trait::async_trait]
pub trait Job: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// Run once. Errors are logged; the job keeps its schedule.
    async fn execute(&self) -> Result<(), TrackingError>;
}

pub struct JobScheduler {
    registered: Vec<Arc<dyn Job>>,
    stop: CancellationToken,
    running: JoinSet<()>,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self {
            registered: Vec::new(),
            stop: CancellationToken::new(),
            running: JoinSet::new(),
        }
    }

    pub fn register<J: Job + 'static>(&mut self, job: J) {
        self.registered.push(Arc::new(job));
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    /// Spawn one task per registered job. The first run happens one
    /// interval after start.
    pub fn start(&mut self) {
        info!(jobs = self.registered.len(), "Starting background jobs");
        for job in &self.registered {
            self.running
                .spawn(run_periodically(Arc::clone(job), self.stop.child_token()));
        }
    }

    /// Signal every job to stop. Returns immediately.
    pub fn shutdown(&self) {
        info!("Stopping background jobs");
        self.stop.cancel();
    }

    /// Wait for all jobs to finish, giving up after `timeout`.
    pub async fn wait_for_shutdown(mut self, timeout: Duration) {
        let drain = async {
            while let Some(joined) = self.running.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "Background job panicked");
                }
            }
        };

        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!(timeout_ms = timeout.as_millis() as u64, "Background jobs did not stop in time");
            self.running.abort_all();
        } else {
            info!("Background jobs stopped");
        }
    }
}

impl Default for JobScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_periodically(job: Arc<dyn Job>, stop: CancellationToken) {
    let name = job.name();
    let period = job.interval();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    debug!(job = name, interval_ms = period.as_millis() as u64, "Job scheduled");

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let started = Instant::now();
        let result = job.execute().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(()) => debug!(job = name, elapsed_ms, "Job run finished"),
            Err(e) => warn!(job = name, elapsed_ms, error = %e, code = e.code(), "Job run failed"),
        }
    }

    debug!(job = name, "Job stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::CollaboratorError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingJob {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    impl CountingJob {
        fn new(fail: bool) -> (Self, Arc<AtomicUsize>) {
            let runs = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    runs: Arc::clone(&runs),
                    fail,
                },
                runs,
            )
        }
    }

    #[async_trait::async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn interval(&self) -> Duration {
            Duration::from_millis(20)
        }

        async fn execute(&self) -> Result<(), TrackingError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TrackingError::SinkUnavailable(CollaboratorError::Unavailable(
                    "offline".into(),
                )));
            }
            Ok(())
        }
    }

    #[test]
    fn test_register_counts_jobs() {
        let mut scheduler = JobScheduler::default();
        assert!(scheduler.is_empty());
        scheduler.register(CountingJob::new(false).0);
        assert_eq!(scheduler.len(), 1);
    }

    #[tokio::test]
    async fn test_jobs_run_repeatedly_until_shutdown() {
        let mut scheduler = JobScheduler::new();
        let (job, runs) = CountingJob::new(false);
        scheduler.register(job);
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.shutdown();
        scheduler.wait_for_shutdown(Duration::from_secs(2)).await;

        let seen = runs.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected repeated runs, got {}", seen);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_failing_job_keeps_schedule() {
        let mut scheduler = JobScheduler::new();
        let (job, runs) = CountingJob::new(true);
        scheduler.register(job);
        scheduler.start();

        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.shutdown();
        scheduler.wait_for_shutdown(Duration::from_secs(2)).await;

        assert!(runs.load(Ordering::SeqCst) >= 2);
    }
}
