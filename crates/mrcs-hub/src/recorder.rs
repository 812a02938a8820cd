//! Message recorder
//!
//! Listens to everything on the exchange and writes each message to a
//! [`MessageLog`], stamped with the true instant it was received.

use crate::error::Result;
use crate::exchange::Exchange;
use mrcs_core::{
    EquipmentIdentifier, EquipmentType, Message, MessageLog, MessageRecord,
    SubscriptionRoutingKey, TimeSource, WallClock,
};
use std::sync::Arc;
use tracing::{trace, warn};

/// Records every message on the bus
#[derive(Clone)]
pub struct MessageRecorder {
    identity: EquipmentIdentifier,
    log: Arc<dyn MessageLog>,
    source: Arc<dyn TimeSource>,
}

impl MessageRecorder {
    /// Create a recorder writing to `log`, stamped with the system clock
    pub fn new(log: Arc<dyn MessageLog>) -> Self {
        Self::with_source(log, WallClock)
    }

    /// Create a recorder stamped with `source`
    pub fn with_source(log: Arc<dyn MessageLog>, source: impl TimeSource + 'static) -> Self {
        Self {
            identity: EquipmentIdentifier::unscoped(EquipmentType::MessageLogger),
            log,
            source: Arc::new(source),
        }
    }

    pub fn identity(&self) -> &EquipmentIdentifier {
        &self.identity
    }

    /// Record one message
    pub fn record(&self, message: &Message) -> mrcs_core::Result<MessageRecord> {
        let record = self.log.record(self.source.now(), message)?;
        trace!(uid = record.uid, routing = %message.routing_key(), "recorded");
        Ok(record)
    }

    /// A delivery callback that records each message
    ///
    /// Failures are logged and the message is dropped.
    pub fn callback(&self) -> impl FnMut(&Message) + Send + 'static {
        let recorder = self.clone();
        move |message: &Message| {
            if let Err(err) = recorder.record(message) {
                warn!(routing = %message.routing_key(), error = %err, "failed to record message");
            }
        }
    }

    /// Subscribe to all traffic on `exchange`; returns the queue name
    pub fn subscribe(&self, exchange: &mut Exchange) -> Result<String> {
        exchange.subscribe(
            self.identity,
            vec![SubscriptionRoutingKey::all()],
            self.callback(),
        )
    }

    /// The most recent records, newest first
    pub fn find_latest(&self, limit: usize) -> mrcs_core::Result<Vec<MessageRecord>> {
        self.log.find_latest(limit)
    }

    /// Drop every record
    pub fn clean(&self) -> mrcs_core::Result<()> {
        self.log.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Publisher;
    use chrono::{Duration, TimeZone, Utc};
    use mrcs_core::{ManualTime, MemoryMessageLog};

    #[test]
    fn test_records_all_traffic_with_true_time() {
        let start = Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap();
        let time = ManualTime::new(start);
        let log = Arc::new(MemoryMessageLog::new());
        let recorder = MessageRecorder::with_source(log.clone(), time.clone());

        let mut exchange = Exchange::new("mrcs.test");
        let queue = recorder.subscribe(&mut exchange).unwrap();
        assert_eq!(queue, "mrcs.test.MLG.*.001");

        let signal = Publisher::new("SIG.001.002".parse().unwrap());
        let engine: EquipmentIdentifier = "MPU.001.001".parse().unwrap();
        signal.publish(&mut exchange, engine, "first").unwrap();
        time.advance(Duration::milliseconds(1500));
        signal.publish(&mut exchange, engine, "second").unwrap();

        assert_eq!(log.len(), 2);
        let latest = recorder.find_latest(10).unwrap();
        assert_eq!(latest[0].message.body(), "second");
        assert_eq!(latest[0].rec, start + Duration::milliseconds(1500));
        assert_eq!(latest[1].message.body(), "first");
        assert_eq!(latest[1].rec, start);

        recorder.clean().unwrap();
        assert!(recorder.find_latest(10).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_subscription() {
        let recorder = MessageRecorder::new(Arc::new(MemoryMessageLog::new()));
        let mut exchange = Exchange::new("mrcs.test");
        recorder.subscribe(&mut exchange).unwrap();
        assert!(recorder.subscribe(&mut exchange).is_err());
    }
}
