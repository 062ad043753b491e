//! PostgreSQL-backed telemetry sink.

use sqlx::PgPool;

use domain::models::{GeofenceEvent, LocationUpdate, TrackingSession};
use domain::services::{CollaboratorError, TelemetrySink};

use crate::repositories::{
    to_collaborator_error, GeofenceEventRepository, LocationUpdateRepository,
    TrackingSessionRepository,
};

/// Durable sink writing tracking output to PostgreSQL.
#[derive(Clone)]
pub struct PgTelemetrySink {
    locations: LocationUpdateRepository,
    events: GeofenceEventRepository,
    sessions: TrackingSessionRepository,
}

impl PgTelemetrySink {
    pub fn new(pool: PgPool) -> Self {
        Self {
            locations: LocationUpdateRepository::new(pool.clone()),
            events: GeofenceEventRepository::new(pool.clone()),
            sessions: TrackingSessionRepository::new(pool),
        }
    }
}

#[async_trait::async_trait]
impl TelemetrySink for PgTelemetrySink {
    async fn persist_batch(&self, updates: &[LocationUpdate]) -> Result<(), CollaboratorError> {
        self.locations
            .insert_batch(updates)
            .await
            .map(|_| ())
            .map_err(to_collaborator_error)
    }

    async fn persist_event(&self, event: &GeofenceEvent) -> Result<(), CollaboratorError> {
        self.events
            .insert(event)
            .await
            .map(|_| ())
            .map_err(to_collaborator_error)
    }

    async fn persist_session(&self, session: &TrackingSession) -> Result<(), CollaboratorError> {
        self.sessions
            .upsert(session)
            .await
            .map(|_| ())
            .map_err(to_collaborator_error)
    }
}
