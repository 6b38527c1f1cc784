//! Metadata store and counter service error types.

use thiserror::Error;

/// Metadata store operation errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MetadataError {
    /// Whether the failure means the store itself could not be reached,
    /// as opposed to a statement failing on a healthy connection.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Database(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            Self::Io(_) => true,
            _ => false,
        }
    }

    /// Whether the failure is a primary-key or unique-constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = std::result::Result<T, MetadataError>;

/// Failures surfaced by the quota counter service.
///
/// None of these is ever replaced with a default count or limit.
#[derive(Debug, Error)]
pub enum CounterError {
    /// Storage was unreachable when the call was made.
    #[error("counter storage is unavailable")]
    StorageUnavailable,

    /// The singleton counter record does not exist.
    #[error("registration counter record is missing")]
    RecordMissing,

    /// Business-rule rejection; nothing was written.
    #[error("registration quota exceeded ({count}/{limit} seats taken)")]
    QuotaExceeded { count: i64, limit: i64 },

    /// A transaction failed and was rolled back.
    #[error("counter storage error: {0}")]
    Storage(#[source] MetadataError),

    /// Caller input rejected before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<MetadataError> for CounterError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::NotFound(_) => Self::RecordMissing,
            other => Self::Storage(other),
        }
    }
}

impl From<portal_core::Error> for CounterError {
    fn from(err: portal_core::Error) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

/// Result type for counter service operations.
pub type CounterResult<T> = std::result::Result<T, CounterError>;
