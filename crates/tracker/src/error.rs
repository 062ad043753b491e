use thiserror::Error;
use uuid::Uuid;

use domain::services::CollaboratorError;

/// Errors surfaced by the tracking engine's public operations.
///
/// Only `PermissionDenied`, `UnsupportedEnvironment` and
/// `SessionAlreadyActive` abort `start_tracking`; collaborator failures are
/// logged and absorbed wherever the engine can keep going.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Positioning is not supported in this environment")]
    UnsupportedEnvironment,

    #[error("Tracking session {0} is already active")]
    SessionAlreadyActive(Uuid),

    #[error("No active tracking session")]
    SessionNotActive,

    #[error("Zone catalog unavailable: {0}")]
    CatalogUnavailable(#[source] CollaboratorError),

    #[error("Telemetry sink unavailable: {0}")]
    SinkUnavailable(#[source] CollaboratorError),

    #[error("Position subscription failed: {0}")]
    Position(#[source] CollaboratorError),
}

impl TrackingError {
    /// Stable identifier for logs and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            TrackingError::PermissionDenied => "permission_denied",
            TrackingError::UnsupportedEnvironment => "unsupported_environment",
            TrackingError::SessionAlreadyActive(_) => "session_already_active",
            TrackingError::SessionNotActive => "session_not_active",
            TrackingError::CatalogUnavailable(_) => "catalog_unavailable",
            TrackingError::SinkUnavailable(_) => "sink_unavailable",
            TrackingError::Position(_) => "position_unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            TrackingError::PermissionDenied.to_string(),
            "Location permission denied"
        );
        let err = TrackingError::SinkUnavailable(CollaboratorError::Timeout(500));
        assert_eq!(
            err.to_string(),
            "Telemetry sink unavailable: Collaborator call timed out after 500ms"
        );
    }

    #[test]
    fn test_error_source_is_collaborator_error() {
        use std::error::Error as _;

        let err = TrackingError::CatalogUnavailable(CollaboratorError::Unavailable("down".into()));
        assert!(err.source().is_some());
        assert!(TrackingError::SessionNotActive.source().is_none());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(TrackingError::SessionAlreadyActive(Uuid::nil()).code(), "session_already_active");
        assert_eq!(TrackingError::UnsupportedEnvironment.code(), "unsupported_environment");
    }
}
