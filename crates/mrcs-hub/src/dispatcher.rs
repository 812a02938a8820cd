//! Cron dispatcher - fires scheduled events in model time
//!
//! The dispatcher owns a [`CronTable`] and a handle to the shared model
//! clock. Each `poll` takes every job that has fallen due and publishes it
//! to the job's target:
//!
//! ```json
//! {"event_id": "abc", "on": "1930-01-03T06:00:00.000+00:00"}
//! ```

use crate::error::Result;
use crate::exchange::Transport;
use crate::publisher::Publisher;
use mrcs_core::{
    iso, ClockState, CronTable, Cronjob, EquipmentIdentifier, EquipmentType, SharedClock,
};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Publishes cron jobs as they fall due
#[derive(Debug)]
pub struct CronDispatcher {
    publisher: Publisher,
    table: CronTable,
    clock: SharedClock,
}

impl CronDispatcher {
    /// Create a dispatcher speaking as `SCH.*.001`
    pub fn new(clock: SharedClock) -> Self {
        Self::with_identity(
            EquipmentIdentifier::unscoped(EquipmentType::ScheduleController),
            clock,
        )
    }

    /// Create a dispatcher speaking as `identity`
    pub fn with_identity(identity: EquipmentIdentifier, clock: SharedClock) -> Self {
        Self {
            publisher: Publisher::new(identity),
            table: CronTable::new(),
            clock,
        }
    }

    pub fn identity(&self) -> &EquipmentIdentifier {
        self.publisher.identity()
    }

    /// Add a job; returns false if an identical job is already pending
    pub fn schedule(&mut self, job: Cronjob) -> bool {
        debug!(job = %job, "cron job scheduled");
        self.table.schedule(job)
    }

    /// Remove a pending job
    pub fn cancel(&mut self, job: &Cronjob) -> bool {
        self.table.cancel(job)
    }

    /// Pending jobs
    pub fn pending(&self) -> &CronTable {
        &self.table
    }

    /// Publish every job due at the current model instant
    ///
    /// Returns the jobs fired, in firing order. If publishing fails, the
    /// failed job and those after it stay pending.
    pub fn poll<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<Vec<Cronjob>> {
        let now = self.clock.model_now();
        let mut due = self.table.take_due(now).into_iter();
        let mut fired = Vec::new();

        while let Some(job) = due.next() {
            let body = json!({
                "event_id": job.event_id(),
                "on": iso::format(&job.fire_at()),
            });
            if let Err(err) = self.publisher.publish(transport, *job.target(), body) {
                self.table.schedule(job);
                self.table.extend(due);
                return Err(err);
            }
            info!(event_id = job.event_id(), target = %job.target(), "cron job fired");
            fired.push(job);
        }
        Ok(fired)
    }

    /// True time until the next job falls due
    ///
    /// `None` when nothing is pending or the clock is paused. Waits too long
    /// to represent saturate at `Duration::MAX`.
    pub fn next_wait(&self) -> Option<Duration> {
        let next = self.table.next_due()?;
        if self.clock.state() == ClockState::Paused {
            return None;
        }
        let ahead = (next.fire_at() - self.clock.model_now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        Some(
            Duration::try_from_secs_f64(ahead.as_secs_f64() / self.clock.speed())
                .unwrap_or(Duration::MAX),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Exchange};
    use chrono::{DateTime, TimeZone, Utc};
    use mrcs_core::{ManualTime, Message, ModelClock, SubscriptionRoutingKey};
    use std::sync::{Arc, Mutex};

    fn true_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap()
    }

    fn model_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(1930, 1, 3, 6, 0, 0).unwrap()
    }

    fn running_clock(speed: f64) -> (ManualTime, SharedClock) {
        let time = ManualTime::new(true_start());
        let mut clock = ModelClock::new(time.clone());
        clock.set(speed, model_start()).unwrap();
        clock.run().unwrap();
        (time, clock.into())
    }

    fn signal() -> EquipmentIdentifier {
        "SIG.001.002".parse().unwrap()
    }

    struct Failing;

    impl Transport for Failing {
        fn publish(&mut self, _message: &Message) -> Result<usize> {
            Err(Error::NoRoutingKeys)
        }
    }

    #[test]
    fn test_poll_fires_due_jobs() {
        let (time, clock) = running_clock(4.0);
        let mut dispatcher = CronDispatcher::new(clock);
        assert_eq!(dispatcher.identity().to_string(), "SCH.*.001");

        dispatcher.schedule(Cronjob::new(signal(), "red", model_start() + chrono::Duration::seconds(8)));
        dispatcher.schedule(Cronjob::new(signal(), "green", model_start() + chrono::Duration::seconds(40)));

        let mut exchange = Exchange::new("mrcs.test");
        let inbox = Arc::new(Mutex::new(Vec::new()));
        let sink = inbox.clone();
        let key: SubscriptionRoutingKey = "*.*.*.SIG.*.*".parse().unwrap();
        exchange
            .subscribe(signal(), vec![key], move |m: &Message| sink.lock().unwrap().push(m.clone()))
            .unwrap();

        assert!(dispatcher.poll(&mut exchange).unwrap().is_empty());

        time.advance(chrono::Duration::seconds(2));
        let fired = dispatcher.poll(&mut exchange).unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].event_id(), "red");
        assert_eq!(dispatcher.pending().len(), 1);

        let inbox = inbox.lock().unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].topic(), "SCH.*.001.SIG.001.002");
        assert_eq!(inbox[0].body()["event_id"], "red");
        assert_eq!(inbox[0].body()["on"], "1930-01-03T06:00:08.000+00:00");
    }

    #[test]
    fn test_next_wait_scales_with_speed() {
        let (time, clock) = running_clock(4.0);
        let mut dispatcher = CronDispatcher::new(clock.clone());
        assert_eq!(dispatcher.next_wait(), None);

        dispatcher.schedule(Cronjob::new(signal(), "red", model_start() + chrono::Duration::seconds(8)));
        assert_eq!(dispatcher.next_wait(), Some(Duration::from_secs(2)));

        time.advance(chrono::Duration::seconds(3));
        assert_eq!(dispatcher.next_wait(), Some(Duration::ZERO));

        clock.pause().unwrap();
        assert_eq!(dispatcher.next_wait(), None);
    }

    #[test]
    fn test_next_wait_saturates_for_slow_clock() {
        let (_time, clock) = running_clock(1e-15);
        let mut dispatcher = CronDispatcher::new(clock);
        dispatcher.schedule(Cronjob::new(signal(), "tomorrow", model_start() + chrono::Duration::days(1)));
        assert_eq!(dispatcher.next_wait(), Some(Duration::MAX));
    }

    #[test]
    fn test_failed_publish_keeps_jobs() {
        let (time, clock) = running_clock(1.0);
        let mut dispatcher = CronDispatcher::new(clock);
        dispatcher.schedule(Cronjob::new(signal(), "a", model_start()));
        dispatcher.schedule(Cronjob::new(signal(), "b", model_start()));
        time.advance(chrono::Duration::seconds(1));

        assert!(dispatcher.poll(&mut Failing).is_err());
        assert_eq!(dispatcher.pending().len(), 2);

        let fired = dispatcher.poll(&mut Exchange::new("mrcs.test")).unwrap();
        assert_eq!(fired.len(), 2);
        assert!(dispatcher.pending().is_empty());
    }

    #[test]
    fn test_cancel() {
        let (_time, clock) = running_clock(1.0);
        let mut dispatcher = CronDispatcher::new(clock);
        let job = Cronjob::new(signal(), "a", model_start());
        assert!(dispatcher.schedule(job.clone()));
        assert!(!dispatcher.schedule(job.clone()));
        assert!(dispatcher.cancel(&job));
        assert!(dispatcher.pending().is_empty());
    }
}
