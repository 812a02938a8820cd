//! Recorded messages
//!
//! The message recorder stamps every message it sees with the true time of
//! receipt and hands it to a [`MessageLog`]. Recording follows true time, not
//! model time.

use crate::message::Message;
use crate::{iso, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};

/// A message as stored by a log
///
/// ```json
/// {"uid": 1, "rec": "2026-01-03T12:27:51.002+00:00",
///  "origin": "1f0c2a9e-47b1", "routing": "TST.001.002.MPU.001.100", "body": "hello"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Sequence number assigned by the log
    pub uid: u64,
    /// True instant of receipt
    #[serde(with = "iso::millis")]
    pub rec: DateTime<Utc>,
    #[serde(flatten)]
    pub message: Message,
}

/// Sink and query interface for recorded messages
pub trait MessageLog: Send + Sync {
    /// Store a message received at `rec`
    fn record(&self, rec: DateTime<Utc>, message: &Message) -> Result<MessageRecord>;

    /// The most recent records, newest first
    fn find_latest(&self, limit: usize) -> Result<Vec<MessageRecord>>;

    /// Drop every record
    fn clear(&self) -> Result<()>;
}

/// In-memory message log
#[derive(Debug, Default)]
pub struct MemoryMessageLog {
    records: Mutex<Vec<MessageRecord>>,
}

impl MemoryMessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MessageLog for MemoryMessageLog {
    fn record(&self, rec: DateTime<Utc>, message: &Message) -> Result<MessageRecord> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let uid = records.last().map_or(1, |r| r.uid + 1);
        let record = MessageRecord {
            uid,
            rec,
            message: message.clone(),
        };
        records.push(record.clone());
        Ok(record)
    }

    fn find_latest(&self, limit: usize) -> Result<Vec<MessageRecord>> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(records.iter().rev().take(limit).cloned().collect())
    }

    fn clear(&self) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}
