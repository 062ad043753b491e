//! Tracking session lifecycle and fix processing.
//!
//! `TrackingSessionManager` owns at most one active session. Starting a
//! session checks positioning capability and permission, loads the farm's
//! zones, subscribes to the positioning source and spawns an ingest task
//! that feeds every fix through `on_fix_received`. Stopping cancels the
//! subscription first, waits for the ingest task, then finalizes the
//! session and flushes pending uploads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use domain::models::{
    CaptureMetadata, GeofenceEvent, LocationUpdate, PositionFix, SessionChange, SessionChangeKind,
    TrackingSession,
};
use domain::services::{
    AssetCatalog, CollaboratorError, FixStream, PermissionState, PositionSource, TelemetrySink,
    WatchOptions, ZoneStore,
};

use crate::config::{Config, TrackingConfig};
use crate::error::TrackingError;
use crate::geofence::{GeofenceDetector, ZoneCatalog, ZoneSnapshot};
use crate::listeners::Listeners;
use crate::metrics;
use crate::pipeline::{FixRejection, SamplePipeline};
use crate::proximity::ProximityIndex;
use crate::upload_buffer::{FlushOutcome, UploadBuffer};

/// External collaborators the engine depends on.
#[derive(Clone)]
pub struct TrackingDeps {
    pub zone_store: Arc<dyn ZoneStore>,
    pub asset_catalog: Arc<dyn AssetCatalog>,
    pub sink: Arc<dyn TelemetrySink>,
    pub position_source: Arc<dyn PositionSource>,
}

/// What happened to one fix.
#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    Accepted {
        update: LocationUpdate,
        events: Vec<GeofenceEvent>,
    },
    Rejected(FixRejection),
}

impl FixOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FixOutcome::Accepted { .. })
    }
}

struct ActiveSession {
    session: TrackingSession,
    pipeline: SamplePipeline,
    detector: GeofenceDetector,
    cancel: CancellationToken,
    ingest: Option<JoinHandle<()>>,
}

enum TrackingState {
    Idle,
    Active(Box<ActiveSession>),
    Stopped(TrackingSession),
}

pub struct TrackingSessionManager {
    config: TrackingConfig,
    catalog: Arc<ZoneCatalog>,
    proximity: ProximityIndex,
    buffer: Arc<UploadBuffer>,
    sink: Arc<dyn TelemetrySink>,
    source: Arc<dyn PositionSource>,
    sink_timeout: std::time::Duration,
    listeners: Listeners,
    state: Mutex<TrackingState>,
    online: AtomicBool,
    source_closed: Notify,
}

impl TrackingSessionManager {
    pub fn new(config: &Config, deps: TrackingDeps) -> Arc<Self> {
        let fetch_timeout = config.catalog.fetch_timeout();
        Arc::new(Self {
            config: config.tracking.clone(),
            catalog: Arc::new(ZoneCatalog::new(deps.zone_store, fetch_timeout)),
            proximity: ProximityIndex::new(
                deps.asset_catalog,
                config.catalog.asset_page_size,
                fetch_timeout,
            ),
            buffer: Arc::new(UploadBuffer::new(Arc::clone(&deps.sink), &config.upload)),
            sink: deps.sink,
            source: deps.position_source,
            sink_timeout: config.upload.sink_timeout(),
            listeners: Listeners::new(),
            state: Mutex::new(TrackingState::Idle),
            online: AtomicBool::new(true),
            source_closed: Notify::new(),
        })
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn catalog(&self) -> &Arc<ZoneCatalog> {
        &self.catalog
    }

    pub fn upload_buffer(&self) -> &Arc<UploadBuffer> {
        &self.buffer
    }

    /// The active session, if any.
    pub async fn current_session(&self) -> Option<TrackingSession> {
        match &*self.state.lock().await {
            TrackingState::Active(active) => Some(active.session.clone()),
            _ => None,
        }
    }

    /// The most recently stopped session, until a new one starts.
    pub async fn last_session(&self) -> Option<TrackingSession> {
        match &*self.state.lock().await {
            TrackingState::Stopped(session) => Some(session.clone()),
            _ => None,
        }
    }

    pub async fn is_tracking(&self) -> bool {
        matches!(&*self.state.lock().await, TrackingState::Active(_))
    }

    /// Zone the active session is currently in.
    pub async fn current_zone_id(&self) -> Option<String> {
        match &*self.state.lock().await {
            TrackingState::Active(active) => active.detector.last_known_zone_id().map(str::to_string),
            _ => None,
        }
    }

    /// Start a new session for the user on the farm.
    ///
    /// Fails with `SessionAlreadyActive` while a session runs. Zone catalog
    /// and sink failures are logged and do not prevent the start.
    pub async fn start_tracking(
        self: &Arc<Self>,
        user_id: &str,
        farm_id: &str,
    ) -> Result<TrackingSession, TrackingError> {
        if !self.source.is_available() {
            return Err(TrackingError::UnsupportedEnvironment);
        }
        self.ensure_idle().await?;

        if self.source.request_permission().await == PermissionState::Denied {
            warn!(user_id = %user_id, "Location permission denied");
            return Err(TrackingError::PermissionDenied);
        }

        if let Err(e) = self.catalog.reload(farm_id).await {
            warn!(farm_id = %farm_id, error = %e, "Starting without a fresh zone catalog");
        }

        let mut state = self.state.lock().await;
        if let TrackingState::Active(active) = &*state {
            return Err(TrackingError::SessionAlreadyActive(active.session.id));
        }

        let session = TrackingSession::start(user_id, farm_id, Utc::now());
        let options = WatchOptions {
            timeout: self.config.fix_timeout(),
            ..WatchOptions::default()
        };
        let stream = self
            .source
            .subscribe(options)
            .await
            .map_err(TrackingError::Position)?;

        let cancel = CancellationToken::new();
        let ingest = tokio::spawn(Self::run_ingest(
            Arc::clone(self),
            stream,
            cancel.clone(),
            session.id,
        ));

        *state = TrackingState::Active(Box::new(ActiveSession {
            session: session.clone(),
            pipeline: SamplePipeline::new(&self.config),
            detector: GeofenceDetector::new(
                self.config.geofence_boundary_buffer_meters,
                self.config.dwell_threshold(),
            ),
            cancel,
            ingest: Some(ingest),
        }));
        drop(state);

        info!(
            session_id = %session.id,
            user_id = %session.user_id,
            farm_id = %session.farm_id,
            zones = self.catalog.len(),
            "Tracking session started"
        );

        self.persist_session(&session).await;
        self.listeners.session.notify(&SessionChange {
            kind: SessionChangeKind::Started,
            session: session.clone(),
        });

        Ok(session)
    }

    /// Process one raw fix for the active session.
    ///
    /// Rejected fixes leave the session untouched. Accepted fixes update the
    /// aggregates, may produce geofence events, are queued for upload and
    /// are published to listeners.
    pub async fn on_fix_received(&self, fix: PositionFix) -> Result<FixOutcome, TrackingError> {
        let mut state = self.state.lock().await;
        let active = match &mut *state {
            TrackingState::Active(active) if !active.cancel.is_cancelled() => active,
            _ => return Err(TrackingError::SessionNotActive),
        };

        let accepted = match active.pipeline.accept(&fix, Utc::now()) {
            Ok(accepted) => accepted,
            Err(rejection) => {
                debug!(session_id = %active.session.id, reason = %rejection, "Fix rejected");
                metrics::record_fix(rejection.as_str());
                return Ok(FixOutcome::Rejected(rejection));
            }
        };
        metrics::record_fix("accepted");

        let loaded = self.catalog.snapshot();
        let zones = if loaded.is_for_farm(&active.session.farm_id) {
            loaded
        } else {
            debug!(
                session_id = %active.session.id,
                catalog_farm_id = ?loaded.farm_id,
                "Zone catalog holds another farm, evaluating without zones"
            );
            Arc::new(ZoneSnapshot::default())
        };
        let events = active
            .detector
            .evaluate(&accepted.coordinate, &zones, &active.session);

        let zone = active.detector.current_zone();
        let zone_id = zone.map(|z| z.id.clone());
        let zone_name = zone.map(|z| z.name.clone());

        active.session.record_fix(
            accepted.coordinate.accuracy,
            accepted.distance_from_previous,
            zone_id.as_deref(),
        );

        let session = &active.session;
        let mut update = LocationUpdate {
            id: Uuid::new_v4(),
            session_id: session.id,
            user_id: session.user_id.clone(),
            farm_id: session.farm_id.clone(),
            coordinate: accepted.coordinate,
            is_in_zone: zone_id.is_some(),
            zone_id,
            zone_name,
            nearby_asset_ids: Vec::new(),
            telemetry: fix.telemetry,
            metadata: CaptureMetadata {
                sequence: session.location_count,
                provider: fix.provider,
                distance_from_previous_meters: accepted.distance_from_previous,
                captured_offline: !self.online.load(Ordering::SeqCst),
            },
            recorded_at: Utc::now(),
        };
        drop(state);

        // Asset lookups may wait on the catalog; the session lock is released.
        update.nearby_asset_ids = self
            .proximity
            .find_nearby(
                &update.farm_id,
                update.coordinate.lat_lng(),
                self.config.proximity_radius_meters,
            )
            .await;

        if self.buffer.enqueue(update.clone()) {
            let buffer = Arc::clone(&self.buffer);
            tokio::spawn(async move {
                buffer.flush_if_idle().await;
            });
        }

        for event in &events {
            info!(
                session_id = %event.session_id,
                zone_id = %event.zone_id,
                event_type = %event.event_type,
                "Geofence transition"
            );
            metrics::record_geofence_event(event.event_type);
            self.spawn_event_persist(event.clone());
        }

        self.listeners.location.notify(&update);
        for event in &events {
            self.listeners.geofence.notify(event);
        }

        Ok(FixOutcome::Accepted { update, events })
    }

    /// Stop the active session and return its final state.
    ///
    /// Returns `SessionNotActive` when nothing is running.
    pub async fn stop_tracking(&self) -> Result<TrackingSession, TrackingError> {
        let (cancel, ingest) = match &mut *self.state.lock().await {
            TrackingState::Active(active) => (active.cancel.clone(), active.ingest.take()),
            _ => return Err(TrackingError::SessionNotActive),
        };

        cancel.cancel();
        self.source.unsubscribe().await;
        if let Some(ingest) = ingest {
            if let Err(e) = ingest.await {
                warn!(error = %e, "Fix ingest task ended abnormally");
            }
        }

        let session = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, TrackingState::Idle) {
                TrackingState::Active(active) => {
                    let mut session = active.session;
                    session.finish(Utc::now());
                    *state = TrackingState::Stopped(session.clone());
                    session
                }
                other => {
                    // A concurrent stop finished first.
                    *state = other;
                    return Err(TrackingError::SessionNotActive);
                }
            }
        };

        let outcome = self.buffer.flush().await;
        if outcome.failed {
            warn!(
                session_id = %session.id,
                remaining = outcome.remaining,
                "Final upload incomplete, updates stay queued"
            );
        }

        self.persist_session(&session).await;

        info!(
            session_id = %session.id,
            locations = session.location_count,
            distance_meters = session.total_distance_meters,
            zones_visited = session.zones_visited.len(),
            "Tracking session stopped"
        );
        self.listeners.session.notify(&SessionChange {
            kind: SessionChangeKind::Stopped,
            session: session.clone(),
        });

        Ok(session)
    }

    /// Emit a dwell event if the user has stayed in the current zone long
    /// enough.
    pub async fn check_dwell(&self) -> Option<GeofenceEvent> {
        if !self.config.dwell_detection_enabled {
            return None;
        }

        let event = match &mut *self.state.lock().await {
            TrackingState::Active(active) => active.detector.check_dwell(Utc::now(), &active.session)?,
            _ => return None,
        };

        info!(
            session_id = %event.session_id,
            zone_id = %event.zone_id,
            duration_ms = ?event.duration_ms,
            "Dwell detected"
        );
        metrics::record_geofence_event(event.event_type);
        self.spawn_event_persist(event.clone());
        self.listeners.geofence.notify(&event);
        Some(event)
    }

    /// Reload zones for the active session's farm, or the last loaded farm.
    ///
    /// Returns `Ok(None)` when there is no farm to load.
    pub async fn reload_zones(&self) -> Result<Option<usize>, TrackingError> {
        let farm_id = match self.current_session().await {
            Some(session) => Some(session.farm_id),
            None => self.catalog.farm_id(),
        };
        match farm_id {
            Some(farm_id) => self.catalog.reload(&farm_id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Flush queued updates and parked events now.
    pub async fn flush_uploads(&self) -> FlushOutcome {
        self.buffer.flush().await
    }

    /// Connectivity came back: flush regardless of queue length.
    pub async fn on_connectivity_restored(&self) -> FlushOutcome {
        self.online.store(true, Ordering::SeqCst);
        info!(queued = self.buffer.len(), "Connectivity restored, flushing uploads");
        self.buffer.flush().await
    }

    /// Connectivity lost: subsequent updates are marked as captured offline.
    pub fn on_connectivity_lost(&self) {
        self.online.store(false, Ordering::SeqCst);
        info!("Connectivity lost, buffering uploads");
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Resolves once the positioning stream of a session has ended on its
    /// own, e.g. when a replay runs out of fixes.
    pub async fn source_closed(&self) {
        self.source_closed.notified().await;
    }

    async fn ensure_idle(&self) -> Result<(), TrackingError> {
        match &*self.state.lock().await {
            TrackingState::Active(active) => Err(TrackingError::SessionAlreadyActive(active.session.id)),
            _ => Ok(()),
        }
    }

    async fn run_ingest(
        manager: Arc<Self>,
        mut stream: FixStream,
        cancel: CancellationToken,
        session_id: Uuid,
    ) {
        let fix_timeout = manager.config.fix_timeout();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = tokio::time::timeout(fix_timeout, stream.recv()) => match next {
                    Ok(Some(fix)) => {
                        if let Err(e) = manager.on_fix_received(fix).await {
                            debug!(session_id = %session_id, error = %e, "Fix dropped");
                            if matches!(e, TrackingError::SessionNotActive) {
                                break;
                            }
                        }
                    }
                    Ok(None) => {
                        info!(session_id = %session_id, "Position stream closed");
                        manager.source_closed.notify_one();
                        break;
                    }
                    Err(_) => {
                        warn!(
                            session_id = %session_id,
                            timeout_ms = fix_timeout.as_millis() as u64,
                            "No position fix received within timeout"
                        );
                    }
                },
            }
        }
    }

    fn spawn_event_persist(&self, event: GeofenceEvent) {
        let buffer = Arc::clone(&self.buffer);
        tokio::spawn(async move {
            buffer.persist_event(event).await;
        });
    }

    async fn persist_session(&self, session: &TrackingSession) {
        let result = tokio::time::timeout(self.sink_timeout, self.sink.persist_session(session))
            .await
            .unwrap_or_else(|_| Err(CollaboratorError::Timeout(self.sink_timeout.as_millis() as u64)));

        if let Err(e) = result {
            warn!(session_id = %session.id, error = %e, "Failed to persist tracking session");
        }
    }
}
