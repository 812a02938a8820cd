//! Error types for database operations.

use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Native DB error.
    #[error("Database error: {0}")]
    Database(String),

    /// A stored row could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Core error.
    #[error("{0}")]
    Core(#[from] mrcs_core::Error),
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<native_db::db_type::Error> for Error {
    fn from(err: native_db::db_type::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<Error> for mrcs_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(inner) => inner,
            other => mrcs_core::Error::Persistence(other.to_string()),
        }
    }
}
