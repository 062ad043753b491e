//! Durable sink interface for tracking output.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use super::error::CollaboratorError;
use crate::models::{GeofenceEvent, LocationUpdate, TrackingSession};

/// Durable destination for location updates, geofence events and sessions.
#[async_trait::async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Persist a batch of location updates atomically.
    async fn persist_batch(&self, updates: &[LocationUpdate]) -> Result<(), CollaboratorError>;

    /// Persist a single geofence event.
    async fn persist_event(&self, event: &GeofenceEvent) -> Result<(), CollaboratorError>;

    /// Create or update a session record.
    async fn persist_session(&self, session: &TrackingSession) -> Result<(), CollaboratorError>;
}

/// Sink that keeps everything in memory.
///
/// Records every attempt so tests can assert on flush behaviour. Can be
/// switched into a failing mode and given an artificial latency.
#[derive(Debug, Default)]
pub struct RecordingTelemetrySink {
    batches: Mutex<Vec<Vec<LocationUpdate>>>,
    events: Mutex<Vec<GeofenceEvent>>,
    sessions: Mutex<Vec<TrackingSession>>,
    fail: AtomicBool,
    delay_ms: AtomicU64,
    batch_attempts: AtomicUsize,
    event_attempts: AtomicUsize,
}

impl RecordingTelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail with `Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Delay every call by the given duration before answering.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Successfully persisted batches, in order.
    pub async fn batches(&self) -> Vec<Vec<LocationUpdate>> {
        self.batches.lock().await.clone()
    }

    /// Successfully persisted updates, flattened in order.
    pub async fn updates(&self) -> Vec<LocationUpdate> {
        self.batches.lock().await.iter().flatten().cloned().collect()
    }

    pub async fn events(&self) -> Vec<GeofenceEvent> {
        self.events.lock().await.clone()
    }

    /// Every session write, in order. The last entry is the latest state.
    pub async fn sessions(&self) -> Vec<TrackingSession> {
        self.sessions.lock().await.clone()
    }

    /// Number of `persist_batch` calls, successful or not.
    pub fn batch_attempts(&self) -> usize {
        self.batch_attempts.load(Ordering::SeqCst)
    }

    /// Number of `persist_event` calls, successful or not.
    pub fn event_attempts(&self) -> usize {
        self.event_attempts.load(Ordering::SeqCst)
    }

    async fn simulate(&self) -> Result<(), CollaboratorError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("sink offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TelemetrySink for RecordingTelemetrySink {
    async fn persist_batch(&self, updates: &[LocationUpdate]) -> Result<(), CollaboratorError> {
        self.batch_attempts.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        self.batches.lock().await.push(updates.to_vec());
        Ok(())
    }

    async fn persist_event(&self, event: &GeofenceEvent) -> Result<(), CollaboratorError> {
        self.event_attempts.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        self.events.lock().await.push(event.clone());
        Ok(())
    }

    async fn persist_session(&self, session: &TrackingSession) -> Result<(), CollaboratorError> {
        self.simulate().await?;
        self.sessions.lock().await.push(session.clone());
        Ok(())
    }
}
