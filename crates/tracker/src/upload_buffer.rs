//! Offline upload buffer.
//!
//! Location updates are queued in memory and written to the telemetry sink
//! in fixed-size batches. A failed batch goes back to the front of the queue
//! so upload order always matches capture order. Geofence events that could
//! not be persisted immediately are parked here too and retried before the
//! next location batch.
//!
//! Appends never wait for a flush: the queue lock is only held to push,
//! slice off a batch, or put a failed batch back.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use domain::models::{GeofenceEvent, LocationUpdate};
use domain::services::{CollaboratorError, TelemetrySink};

use crate::config::UploadConfig;
use crate::metrics;

/// Result of one flush pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Location updates written by this pass.
    pub uploaded: usize,
    /// Parked geofence events written by this pass.
    pub events_uploaded: usize,
    /// Location updates still queued afterwards.
    pub remaining: usize,
    /// Whether the pass stopped on a sink failure.
    pub failed: bool,
}

pub struct UploadBuffer {
    sink: Arc<dyn TelemetrySink>,
    batch_size: usize,
    max_queue_size: usize,
    sink_timeout: Duration,
    queue: Mutex<VecDeque<LocationUpdate>>,
    pending_events: Mutex<VecDeque<GeofenceEvent>>,
    flush_lock: tokio::sync::Mutex<()>,
    dropped: AtomicU64,
}

impl UploadBuffer {
    pub fn new(sink: Arc<dyn TelemetrySink>, config: &UploadConfig) -> Self {
        let batch_size = config.batch_size.max(1);
        Self {
            sink,
            batch_size,
            max_queue_size: config.max_queue_size.max(batch_size),
            sink_timeout: config.sink_timeout(),
            queue: Mutex::new(VecDeque::new()),
            pending_events: Mutex::new(VecDeque::new()),
            flush_lock: tokio::sync::Mutex::new(()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Append an update. Returns true once a full batch is waiting.
    ///
    /// When the queue is at capacity the oldest update is dropped.
    pub fn enqueue(&self, update: LocationUpdate) -> bool {
        let mut queue = self.lock_queue();
        queue.push_back(update);
        let evicted = self.enforce_capacity(&mut queue);
        let depth = queue.len();
        drop(queue);

        if evicted > 0 {
            warn!(dropped = evicted, "Upload queue full, dropped oldest location updates");
        }
        metrics::set_upload_queue_depth(depth);
        depth >= self.batch_size
    }

    /// Write a geofence event now, parking it for retry if the sink fails.
    pub async fn persist_event(&self, event: GeofenceEvent) -> bool {
        match self.call_sink_event(&event).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    error = %e,
                    "Failed to persist geofence event, will retry"
                );
                self.park_event(event);
                false
            }
        }
    }

    /// Keep an event for the next flush.
    pub fn park_event(&self, event: GeofenceEvent) {
        self.lock_events().push_back(event);
    }

    /// Flush everything queued at the time the flush starts.
    ///
    /// Waits for a flush already in progress to finish first.
    pub async fn flush(&self) -> FlushOutcome {
        let _guard = self.flush_lock.lock().await;
        self.flush_locked().await
    }

    /// Like `flush`, but returns `None` instead of waiting when another flush
    /// is running.
    pub async fn flush_if_idle(&self) -> Option<FlushOutcome> {
        let _guard = self.flush_lock.try_lock().ok()?;
        Some(self.flush_locked().await)
    }

    pub fn len(&self) -> usize {
        self.lock_queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_queue().is_empty()
    }

    pub fn pending_event_count(&self) -> usize {
        self.lock_events().len()
    }

    /// Updates discarded because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Snapshot of the queued updates, oldest first.
    pub fn queued(&self) -> Vec<LocationUpdate> {
        self.lock_queue().iter().cloned().collect()
    }

    async fn flush_locked(&self) -> FlushOutcome {
        let mut outcome = FlushOutcome::default();

        if !self.flush_events(&mut outcome).await {
            outcome.failed = true;
            outcome.remaining = self.len();
            return outcome;
        }

        // Items appended while this pass runs wait for the next one.
        let mut eligible = self.len();

        while eligible > 0 {
            let batch: Vec<LocationUpdate> = {
                let mut queue = self.lock_queue();
                let take = self.batch_size.min(eligible).min(queue.len());
                queue.drain(..take).collect()
            };
            if batch.is_empty() {
                break;
            }
            eligible -= batch.len();

            match self.call_sink_batch(&batch).await {
                Ok(()) => {
                    debug!(count = batch.len(), "Uploaded location batch");
                    metrics::record_upload_batch("success");
                    outcome.uploaded += batch.len();
                }
                Err(e) => {
                    warn!(count = batch.len(), error = %e, "Location batch upload failed, re-queued");
                    metrics::record_upload_batch("failure");
                    self.requeue_front(batch);
                    outcome.failed = true;
                    break;
                }
            }
        }

        outcome.remaining = self.len();
        metrics::set_upload_queue_depth(outcome.remaining);
        if outcome.uploaded > 0 || outcome.events_uploaded > 0 {
            info!(
                uploaded = outcome.uploaded,
                events = outcome.events_uploaded,
                remaining = outcome.remaining,
                "Upload buffer flushed"
            );
        }
        outcome
    }

    /// Retry parked events in order. Returns false if one failed again.
    async fn flush_events(&self, outcome: &mut FlushOutcome) -> bool {
        let parked: Vec<GeofenceEvent> = self.lock_events().drain(..).collect();
        let mut parked = parked.into_iter();

        while let Some(event) = parked.next() {
            if let Err(e) = self.call_sink_event(&event).await {
                warn!(event_id = %event.id, error = %e, "Geofence event retry failed");
                let mut events = self.lock_events();
                // Events parked during this pass are newer; keep them behind.
                let newer: Vec<GeofenceEvent> = events.drain(..).collect();
                events.push_back(event);
                events.extend(parked);
                events.extend(newer);
                return false;
            }
            outcome.events_uploaded += 1;
        }
        true
    }

    fn requeue_front(&self, batch: Vec<LocationUpdate>) {
        let mut queue = self.lock_queue();
        for update in batch.into_iter().rev() {
            queue.push_front(update);
        }
        let evicted = self.enforce_capacity(&mut queue);
        if evicted > 0 {
            warn!(dropped = evicted, "Upload queue full, dropped oldest location updates");
        }
    }

    fn enforce_capacity(&self, queue: &mut VecDeque<LocationUpdate>) -> usize {
        let mut evicted = 0;
        while queue.len() > self.max_queue_size {
            queue.pop_front();
            evicted += 1;
        }
        if evicted > 0 {
            self.dropped.fetch_add(evicted as u64, Ordering::Relaxed);
            metrics::record_upload_dropped(evicted);
        }
        evicted
    }

    async fn call_sink_batch(&self, batch: &[LocationUpdate]) -> Result<(), CollaboratorError> {
        tokio::time::timeout(self.sink_timeout, self.sink.persist_batch(batch))
            .await
            .unwrap_or_else(|_| Err(CollaboratorError::Timeout(self.sink_timeout.as_millis() as u64)))
    }

    async fn call_sink_event(&self, event: &GeofenceEvent) -> Result<(), CollaboratorError> {
        tokio::time::timeout(self.sink_timeout, self.sink.persist_event(event))
            .await
            .unwrap_or_else(|_| Err(CollaboratorError::Timeout(self.sink_timeout.as_millis() as u64)))
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<LocationUpdate>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_events(&self) -> std::sync::MutexGuard<'_, VecDeque<GeofenceEvent>> {
        self.pending_events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
