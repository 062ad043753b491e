//! Errors reported by external collaborators.

use thiserror::Error;

/// Failure of a zone store, asset catalog, sink or positioning source call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("Collaborator call timed out after {0}ms")]
    Timeout(u64),

    #[error("Collaborator rejected the request: {0}")]
    Rejected(String),
}
