//! Database models for persistent storage.

mod conf;
mod message;

pub use conf::*;
pub use message::*;
