//! Configuration models for database storage.

use chrono::{DateTime, Utc};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Stored configuration value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct StoredConf {
    /// Primary key - configuration name, e.g. `clock_conf`.
    #[primary_key]
    pub key: String,
    /// Serialized value.
    pub value: String,
    /// Last write, milliseconds since the Unix epoch.
    pub modified: i64,
}

impl StoredConf {
    pub fn new(key: &str, value: &str, modified: DateTime<Utc>) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            modified: modified.timestamp_millis(),
        }
    }

    /// The last write instant, if representable.
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.modified)
    }
}
