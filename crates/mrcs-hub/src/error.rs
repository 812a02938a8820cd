//! Error types for mrcs-hub

use thiserror::Error;

/// Result type for mrcs-hub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mrcs-hub
#[derive(Debug, Error)]
pub enum Error {
    /// No queue of that name is declared on the exchange
    #[error("queue {0:?} not found")]
    QueueNotFound(String),

    /// A queue of that name is already declared
    #[error("queue {0:?} already declared")]
    DuplicateQueue(String),

    /// A subscription was requested without any routing keys
    #[error("subscribe: no routing keys")]
    NoRoutingKeys,

    /// Configuration could not be parsed
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] mrcs_core::Error),
}

// Compile-time check that Error is Send + Sync for thread-safe error propagation.
fn _assert_error_send_sync<T: Send + Sync>() {}
fn _error_is_send_sync() {
    _assert_error_send_sync::<Error>();
}
