//! Model-time cron jobs
//!
//! A `Cronjob` asks for an event to be delivered to some equipment at a
//! model instant. A `CronTable` keeps pending jobs in firing order and hands
//! out the ones that have fallen due.

use crate::equipment::EquipmentFilter;
use crate::iso;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// A scheduled event
///
/// Ordered by firing instant, then target, then event ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cronjob {
    /// The equipment the event is for
    target: EquipmentFilter,
    /// Opaque event identifier
    event_id: String,
    /// Model instant at which the event fires
    #[serde(rename = "on", with = "iso::millis")]
    fire_at: DateTime<Utc>,
}

impl Cronjob {
    /// Create a new cron job
    pub fn new(
        target: impl Into<EquipmentFilter>,
        event_id: impl Into<String>,
        fire_at: DateTime<Utc>,
    ) -> Self {
        Self {
            target: target.into(),
            event_id: event_id.into(),
            fire_at,
        }
    }

    pub fn target(&self) -> &EquipmentFilter {
        &self.target
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn fire_at(&self) -> DateTime<Utc> {
        self.fire_at
    }

    /// Check if the job is due at model instant `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.fire_at <= now
    }
}

impl Ord for Cronjob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fire_at
            .cmp(&other.fire_at)
            .then_with(|| self.target.cmp(&other.target))
            .then_with(|| self.event_id.cmp(&other.event_id))
    }
}

impl PartialOrd for Cronjob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Cronjob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} @ {}",
            self.event_id,
            self.target,
            iso::format(&self.fire_at)
        )
    }
}

/// Pending cron jobs in firing order
///
/// Identical jobs are held once.
#[derive(Debug, Clone, Default)]
pub struct CronTable {
    jobs: BTreeSet<Cronjob>,
}

impl CronTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job; returns false if an identical job is already pending
    pub fn schedule(&mut self, job: Cronjob) -> bool {
        self.jobs.insert(job)
    }

    /// Remove a pending job
    pub fn cancel(&mut self, job: &Cronjob) -> bool {
        self.jobs.remove(job)
    }

    /// Remove every pending job for `target`; returns how many were removed
    pub fn cancel_target(&mut self, target: &EquipmentFilter) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|job| job.target != *target);
        before - self.jobs.len()
    }

    /// The job that fires first
    pub fn next_due(&self) -> Option<&Cronjob> {
        self.jobs.first()
    }

    /// Remove and return every job due at model instant `now`, in order
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Vec<Cronjob> {
        let mut due = Vec::new();
        while self.jobs.first().is_some_and(|job| job.is_due(now)) {
            if let Some(job) = self.jobs.pop_first() {
                due.push(job);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cronjob> {
        self.jobs.iter()
    }
}

impl FromIterator<Cronjob> for CronTable {
    fn from_iter<I: IntoIterator<Item = Cronjob>>(iter: I) -> Self {
        Self {
            jobs: iter.into_iter().collect(),
        }
    }
}

impl Extend<Cronjob> for CronTable {
    fn extend<I: IntoIterator<Item = Cronjob>>(&mut self, iter: I) {
        self.jobs.extend(iter);
    }
}
