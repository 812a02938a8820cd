//! Configuration store seam
//!
//! The clock persists its configuration through a [`ConfStore`]. The
//! database crate provides the durable implementation; [`MemoryConfStore`]
//! keeps everything in process.

use crate::clock::TimeSource;
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Keyed storage for serialized configuration values
pub trait ConfStore {
    /// Load a value and the instant it was last written
    fn load(&self, key: &str) -> Result<Option<(String, DateTime<Utc>)>>;

    /// Write a value, replacing any previous one
    fn save(&self, value: &str, key: &str) -> Result<()>;
}

/// In-memory configuration store
pub struct MemoryConfStore {
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
    source: Arc<dyn TimeSource>,
}

impl MemoryConfStore {
    /// Create an empty store that stamps writes with `source`
    pub fn new(source: impl TimeSource + 'static) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            source: Arc::new(source),
        }
    }

    /// Remove a value
    pub fn remove(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }
}

impl ConfStore for MemoryConfStore {
    fn load(&self, key: &str) -> Result<Option<(String, DateTime<Utc>)>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn save(&self, value: &str, key: &str) -> Result<()> {
        let modified = self.source.now();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), (value.to_string(), modified));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTime;
    use chrono::TimeZone;

    #[test]
    fn test_memory_store() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap();
        let time = ManualTime::new(t0);
        let store = MemoryConfStore::new(time.clone());

        assert_eq!(store.load("k").unwrap(), None);

        store.save("v1", "k").unwrap();
        time.advance(chrono::Duration::seconds(5));
        store.save("v2", "k").unwrap();

        let (value, modified) = store.load("k").unwrap().unwrap();
        assert_eq!(value, "v2");
        assert_eq!(modified, t0 + chrono::Duration::seconds(5));

        assert!(store.remove("k"));
        assert!(!store.remove("k"));
    }
}
