use thiserror::Error;

/// Unified result type for the area warden crate.
pub type Result<T> = std::result::Result<T, WardenError>;

/// Errors surfaced by the region registry, tracker, and edit sessions.
///
/// Every variant is recoverable: callers report the condition back to the
/// initiating user or collaborator and carry on.
#[derive(Debug, Error)]
pub enum WardenError {
    #[error("area `{0}` not found")]
    NotFound(String),
    #[error("area `{0}` already exists")]
    AlreadyExists(String),
    #[error("domain `{0}` is not loaded")]
    DomainNotLoaded(String),
    #[error("invalid session state: {0}")]
    InvalidSessionState(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
