//! Error types for mrcs-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A token or string does not have the expected shape
    #[error("Format error: {0}")]
    Format(String),

    /// A type token that is not one of the known equipment types
    #[error("Unknown equipment type: {0}")]
    UnknownType(String),

    /// A value violates the constraints of its variant (e.g. a wildcard in an identifier)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An argument is outside its permitted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A clock transition was requested before any configuration exists
    #[error("{0} - no clock configuration exists")]
    NotConfigured(&'static str),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A configuration store failed to load or save
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
