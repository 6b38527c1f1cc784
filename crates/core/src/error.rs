//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid seat limit: {0}")]
    InvalidLimit(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("invalid email domain: {0}")]
    InvalidEmailDomain(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
