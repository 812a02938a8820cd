//! Message log models for database storage.

use crate::error::{Error, Result};
use chrono::DateTime;
use mrcs_core::{Message, MessageRecord};
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};

/// Stored message record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct StoredMessage {
    /// Primary key - sequence number.
    #[primary_key]
    pub uid: u64,
    /// Publication routing key, source first, so prefix scans select by sender.
    #[secondary_key]
    pub routing: String,
    /// Receipt instant, milliseconds since the Unix epoch.
    pub rec: i64,
    /// Origin tag of the sending process.
    pub origin: String,
    /// JSON-encoded body.
    pub body: String,
}

impl StoredMessage {
    /// Create from a recorded message.
    pub fn from_record(record: &MessageRecord) -> Result<Self> {
        Ok(Self {
            uid: record.uid,
            routing: record.message.topic(),
            rec: record.rec.timestamp_millis(),
            origin: record.message.origin().to_string(),
            body: serde_json::to_string(record.message.body())?,
        })
    }

    /// Convert back to a recorded message.
    pub fn to_record(&self) -> Result<MessageRecord> {
        let routing = self.routing.parse()?;
        let body: serde_json::Value = serde_json::from_str(&self.body)?;
        let rec = DateTime::from_timestamp_millis(self.rec)
            .ok_or_else(|| Error::Serialization(format!("rec out of range: {}", self.rec)))?;
        Ok(MessageRecord {
            uid: self.uid,
            rec,
            message: Message::new(routing, body).with_origin(self.origin.clone()),
        })
    }
}
