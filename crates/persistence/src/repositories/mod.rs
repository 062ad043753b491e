//! Repository implementations for database operations.

pub mod asset;
pub mod geofence_event;
pub mod location_update;
pub mod tracking_session;
pub mod zone;

pub use asset::AssetRepository;
pub use geofence_event::GeofenceEventRepository;
pub use location_update::LocationUpdateRepository;
pub use tracking_session::TrackingSessionRepository;
pub use zone::ZoneRepository;

use domain::services::CollaboratorError;

/// Maps a database failure onto the collaborator taxonomy.
///
/// Pool exhaustion and I/O problems are transient; anything else means the
/// database refused the statement.
pub(crate) fn to_collaborator_error(err: sqlx::Error) -> CollaboratorError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            CollaboratorError::Unavailable(err.to_string())
        }
        other => CollaboratorError::Rejected(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_unavailable() {
        assert!(matches!(
            to_collaborator_error(sqlx::Error::PoolTimedOut),
            CollaboratorError::Unavailable(_)
        ));
    }

    #[test]
    fn test_row_not_found_is_rejected() {
        assert!(matches!(
            to_collaborator_error(sqlx::Error::RowNotFound),
            CollaboratorError::Rejected(_)
        ));
    }
}
