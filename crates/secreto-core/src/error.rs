use thiserror::Error;

/// Failures raised at the storage boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend was busy or locked. Safe to retry.
    #[error("storage temporarily unavailable: {0}")]
    Transient(String),
    /// A uniqueness constraint rejected the write.
    #[error("duplicate record: {0}")]
    Conflict(String),
    #[error("storage failure: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum SecretoError {
    #[error("at least 2 active participants are required for a draw, found {found}")]
    InsufficientParticipants { found: usize },
    #[error("a draw has already been completed; reset it before drawing again")]
    DrawAlreadyCompleted,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    /// The engine produced a mapping that is not a derangement. Never written.
    #[error("invalid assignment set: {0}")]
    InvalidAssignment(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, SecretoError>;
