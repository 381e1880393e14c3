//! Error taxonomy shared across the workspace

use thiserror::Error;

/// Why a mention failed fast or slow validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Source is empty")]
    EmptySource,

    #[error("Target is empty")]
    EmptyTarget,

    #[error("Source and target must be different")]
    SameSourceTarget,

    #[error("Target is not a valid URL: {0}")]
    InvalidTarget(String),

    #[error("Wrong target host: expected {expected}, got {actual}")]
    WrongHost { expected: String, actual: String },

    #[error("Wrong target scheme: expected {expected}, got {actual}")]
    WrongScheme { expected: String, actual: String },

    #[error("Source {source_url} does not link to {target}")]
    TargetNotLinked { source_url: String, target: String },
}

/// Errors from the persistent store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Transaction conflict on {0}")]
    Conflict(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Top-level error for mention operations
#[derive(Debug, Error)]
pub enum MentionError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Image encoding error: {0}")]
    Encoding(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,
}

impl From<StoreError> for MentionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(key) => MentionError::TransactionConflict(key),
            StoreError::NotFound(key) => MentionError::NotFound(key),
            other => MentionError::Store(other),
        }
    }
}

pub type Result<T, E = MentionError> = std::result::Result<T, E>;
