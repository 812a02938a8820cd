//! MRCS DB - Durable storage using native_db
//!
//! Provides persistent storage for:
//! - The model clock configuration (as a `ConfStore`)
//! - Recorded bus traffic (as a `MessageLog`)

mod error;
mod models;
mod store;

pub use error::{Error, Result};
pub use store::Store;
