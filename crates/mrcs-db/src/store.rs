//! Database store wrapper.

use crate::error::{Error, Result};
use crate::models::*;
use chrono::{DateTime, Utc};
use mrcs_core::{ConfStore, Message, MessageLog, MessageRecord, TimeSource, WallClock};
use native_db::*;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use tracing::debug;

// Static models for the database
static MODELS: LazyLock<Models> = LazyLock::new(|| {
    let mut models = Models::new();
    models.define::<StoredConf>().unwrap();
    models.define::<StoredMessage>().unwrap();
    models
});

/// Durable store for clock configuration and recorded messages.
pub struct Store {
    pub(crate) db: Database<'static>,
    source: Arc<dyn TimeSource>,
    last_uid: AtomicU64,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Builder::new()
            .create(&MODELS, path.as_ref())
            .map_err(|e| Error::Database(e.to_string()))?;
        debug!(path = %path.as_ref().display(), "store opened");
        Self::from_db(db)
    }

    /// Create an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Builder::new()
            .create_in_memory(&MODELS)
            .map_err(|e| Error::Database(e.to_string()))?;
        Self::from_db(db)
    }

    fn from_db(db: Database<'static>) -> Result<Self> {
        let last_uid = {
            let r = db.r_transaction()?;
            let scan = r.scan().primary::<StoredMessage>()?;
            let mut last = 0;
            for stored in scan.all()? {
                let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
                last = last.max(stored.uid);
            }
            last
        };
        Ok(Self {
            db,
            source: Arc::new(WallClock),
            last_uid: AtomicU64::new(last_uid),
        })
    }

    /// Stamp configuration writes with `source` instead of the system clock.
    pub fn with_source(mut self, source: impl TimeSource + 'static) -> Self {
        self.source = Arc::new(source);
        self
    }

    /// Load a configuration value and its last write instant.
    pub fn load_conf(&self, key: &str) -> Result<Option<(String, DateTime<Utc>)>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredConf> = r.get().primary(key.to_string())?;
        stored
            .map(|s| {
                let modified = s.modified_at().ok_or_else(|| {
                    Error::Serialization(format!("modified out of range: {}", s.modified))
                })?;
                Ok((s.value, modified))
            })
            .transpose()
    }

    /// Write a configuration value.
    pub fn save_conf(&self, key: &str, value: &str) -> Result<()> {
        let stored = StoredConf::new(key, value, self.source.now());
        let rw = self.db.rw_transaction()?;
        rw.upsert(stored)?;
        rw.commit()?;
        debug!(key, "configuration saved");
        Ok(())
    }

    /// Delete a configuration value.
    pub fn delete_conf(&self, key: &str) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        let stored: Option<StoredConf> = rw.get().primary(key.to_string())?;
        match stored {
            Some(s) => {
                rw.remove(s)?;
                rw.commit()?;
                Ok(())
            }
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    /// Append a message received at `rec`.
    pub fn record_message(&self, rec: DateTime<Utc>, message: &Message) -> Result<MessageRecord> {
        let record = MessageRecord {
            uid: self.last_uid.fetch_add(1, Ordering::SeqCst) + 1,
            rec,
            message: message.clone(),
        };
        let rw = self.db.rw_transaction()?;
        rw.insert(StoredMessage::from_record(&record)?)?;
        rw.commit()?;
        Ok(record)
    }

    /// Load a recorded message by sequence number.
    pub fn load_message(&self, uid: u64) -> Result<Option<MessageRecord>> {
        let r = self.db.r_transaction()?;
        let stored: Option<StoredMessage> = r.get().primary(uid)?;
        stored.map(|s| s.to_record()).transpose()
    }

    /// All recorded messages, newest first.
    pub fn all_messages(&self) -> Result<Vec<MessageRecord>> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredMessage>()?;
        let iter = scan.all()?;
        let stored: std::result::Result<Vec<StoredMessage>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        newest_first(stored)
    }

    /// The most recent `limit` messages, newest first.
    pub fn latest_messages(&self, limit: usize) -> Result<Vec<MessageRecord>> {
        let mut all = self.all_messages()?;
        all.truncate(limit);
        Ok(all)
    }

    /// Messages whose routing key starts with `prefix`, newest first.
    ///
    /// Routing keys lead with the source, so `"SIG.001"` selects everything
    /// sent by signals in sector 1.
    pub fn find_by_source(&self, prefix: &str) -> Result<Vec<MessageRecord>> {
        let r = self.db.r_transaction()?;
        let scan = r
            .scan()
            .secondary::<StoredMessage>(StoredMessageKey::routing)?;
        let iter = scan.start_with(prefix)?;
        let stored: std::result::Result<Vec<StoredMessage>, _> = iter.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        newest_first(stored)
    }

    /// Number of recorded messages.
    pub fn count_messages(&self) -> Result<usize> {
        let r = self.db.r_transaction()?;
        let scan = r.scan().primary::<StoredMessage>()?;
        Ok(scan.all()?.count())
    }

    /// Delete every recorded message.
    pub fn clear_messages(&self) -> Result<()> {
        let rw = self.db.rw_transaction()?;
        let stored: std::result::Result<Vec<StoredMessage>, _> =
            rw.scan().primary::<StoredMessage>()?.all()?.collect();
        let stored = stored.map_err(|e| Error::Database(e.to_string()))?;
        let removed = stored.len();
        for s in stored {
            rw.remove(s)?;
        }
        rw.commit()?;
        debug!(removed, "message log cleared");
        Ok(())
    }
}

fn newest_first(mut stored: Vec<StoredMessage>) -> Result<Vec<MessageRecord>> {
    stored.sort_by(|a, b| b.uid.cmp(&a.uid));
    stored.iter().map(StoredMessage::to_record).collect()
}

impl ConfStore for Store {
    fn load(&self, key: &str) -> mrcs_core::Result<Option<(String, DateTime<Utc>)>> {
        Ok(self.load_conf(key)?)
    }

    fn save(&self, value: &str, key: &str) -> mrcs_core::Result<()> {
        Ok(self.save_conf(key, value)?)
    }
}

impl MessageLog for Store {
    fn record(&self, rec: DateTime<Utc>, message: &Message) -> mrcs_core::Result<MessageRecord> {
        Ok(self.record_message(rec, message)?)
    }

    fn find_latest(&self, limit: usize) -> mrcs_core::Result<Vec<MessageRecord>> {
        Ok(self.latest_messages(limit)?)
    }

    fn clear(&self) -> mrcs_core::Result<()> {
        Ok(self.clear_messages()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use mrcs_core::{ClockState, ManualTime, ModelClock, PublicationRoutingKey};
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap()
    }

    fn message(routing: &str, body: serde_json::Value) -> Message {
        let key: PublicationRoutingKey = routing.parse().unwrap();
        Message::new(key, body).with_origin("abc")
    }

    #[test]
    fn test_conf_round_trip() {
        let time = ManualTime::new(t0());
        let store = Store::in_memory().unwrap().with_source(time.clone());

        assert!(store.load_conf("clock_conf").unwrap().is_none());
        store.save_conf("clock_conf", "{}").unwrap();
        time.advance(Duration::seconds(5));
        store.save_conf("other", "1").unwrap();

        assert_eq!(
            store.load_conf("clock_conf").unwrap(),
            Some(("{}".to_string(), t0()))
        );

        store.delete_conf("other").unwrap();
        assert!(store.load_conf("other").unwrap().is_none());
        assert!(matches!(store.delete_conf("other"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_clock_persists_through_store() {
        let time = ManualTime::new(t0());
        let store = Store::in_memory().unwrap().with_source(time.clone());
        let model = Utc.with_ymd_and_hms(1930, 1, 3, 6, 0, 0).unwrap();

        let mut clock = ModelClock::new(time.clone());
        clock.set(4.0, model).unwrap();
        clock.run().unwrap();
        time.advance(Duration::seconds(10));
        clock.save(&store).unwrap();

        time.advance(Duration::seconds(60));
        let reloaded = ModelClock::load(&store, time.clone()).unwrap();
        assert_eq!(reloaded.state(), ClockState::Paused);
        assert_eq!(reloaded.speed(), 4.0);
        assert_eq!(reloaded.model_now(), model + Duration::seconds(40));
    }

    #[test]
    fn test_message_log() {
        let store = Store::in_memory().unwrap();
        let first = store
            .record_message(t0(), &message("SIG.001.002.MPU.001.001", json!("red")))
            .unwrap();
        let second = store
            .record_message(
                t0() + Duration::milliseconds(250),
                &message("PNT.001.001.MPU.001.001", json!({"set": "left"})),
            )
            .unwrap();
        assert_eq!((first.uid, second.uid), (1, 2));
        assert_eq!(store.count_messages().unwrap(), 2);

        let latest = store.latest_messages(1).unwrap();
        assert_eq!(latest, vec![second.clone()]);
        assert_eq!(store.load_message(1).unwrap(), Some(first.clone()));
        assert_eq!(store.load_message(9).unwrap(), None);

        let from_signals = store.find_by_source("SIG.001").unwrap();
        assert_eq!(from_signals, vec![first]);

        store.clear_messages().unwrap();
        assert_eq!(store.count_messages().unwrap(), 0);
        assert!(store.find_by_source("").unwrap().is_empty());
    }

    #[test]
    fn test_as_message_log() {
        let store = Store::in_memory().unwrap();
        let log: &dyn MessageLog = &store;
        for body in ["a", "b", "c"] {
            log.record(t0(), &message("TST.001.002.MPU.001.100", json!(body)))
                .unwrap();
        }
        let uids: Vec<u64> = log.find_latest(5).unwrap().iter().map(|r| r.uid).collect();
        assert_eq!(uids, vec![3, 2, 1]);
        log.clear().unwrap();
        assert!(log.find_latest(5).unwrap().is_empty());
    }
}
