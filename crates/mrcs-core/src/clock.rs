//! Model clock
//!
//! The layout runs on "model time": a virtual timeline that advances at
//! `speed` times true (wall-clock) time while running, and stands still
//! while paused.
//!
//! - `TimeSource` - where true time comes from (`WallClock`, or `ManualTime` in tests)
//! - `ClockConf` - the anchors that determine model time; this is what gets persisted
//! - `ModelClock` - the clock with its run/pause/resume/reload transitions
//! - `SharedClock` - a `ModelClock` behind one lock, for use across threads
//!
//! A clock that has never been configured follows true time.
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, TimeZone, Utc};
//! use mrcs_core::{ManualTime, ModelClock};
//!
//! let time = ManualTime::new(Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap());
//! let mut clock = ModelClock::new(time.clone());
//!
//! let t0 = Utc.with_ymd_and_hms(1930, 1, 3, 6, 0, 0).unwrap();
//! clock.set(4.0, t0).unwrap();
//! clock.run().unwrap();
//!
//! time.advance(Duration::seconds(1));
//! assert_eq!(clock.model_now(), t0 + Duration::seconds(4));
//! ```

use crate::store::ConfStore;
use crate::{iso, Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// The store key under which the clock configuration is kept
pub const CONF_KEY: &str = "clock_conf";

/// A source of true (wall-clock) instants
pub trait TimeSource: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock, truncated to milliseconds
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn now(&self) -> DateTime<Utc> {
        iso::truncate(Utc::now())
    }
}

/// A hand-driven time source
///
/// Clones share the same instant, so a test can keep one handle and give
/// another to the clock under test.
#[derive(Debug, Clone)]
pub struct ManualTime {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualTime {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    /// No configuration exists; model time is true time
    Unconfigured,
    /// Model time is frozen
    Paused,
    /// Model time advances at `speed`
    Running,
}

/// Clock anchors
///
/// While running, model time is `model_start + speed * (now - true_start)`.
/// While paused, `true_stop` takes the place of `now`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockConf {
    is_running: bool,
    speed: f64,
    #[serde(with = "iso::millis")]
    model_start: DateTime<Utc>,
    #[serde(with = "iso::millis")]
    true_start: DateTime<Utc>,
    #[serde(with = "iso::millis_option", default)]
    true_stop: Option<DateTime<Utc>>,
}

impl ClockConf {
    /// A paused configuration at `model_instant`, anchored at true instant `now`
    pub fn paused_at(speed: f64, model_instant: DateTime<Utc>, now: DateTime<Utc>) -> Result<Self> {
        let conf = Self {
            is_running: false,
            speed,
            model_start: model_instant,
            true_start: now,
            true_stop: Some(now),
        };
        conf.validate()?;
        Ok(conf)
    }

    fn validate(&self) -> Result<()> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "speed must be positive, got {}",
                self.speed
            )));
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn model_start(&self) -> DateTime<Utc> {
        self.model_start
    }

    pub fn true_start(&self) -> DateTime<Utc> {
        self.true_start
    }

    pub fn true_stop(&self) -> Option<DateTime<Utc>> {
        self.true_stop
    }

    /// The model instant corresponding to true instant `now`
    pub fn model_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let end = if self.is_running {
            now
        } else {
            self.true_stop.unwrap_or(self.true_start)
        };
        let true_ms = (end - self.true_start).num_milliseconds();
        let model_ms = (true_ms as f64 * self.speed).round() as i64;

        Duration::try_milliseconds(model_ms)
            .and_then(|offset| self.model_start.checked_add_signed(offset))
            .unwrap_or(if model_ms < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }
}

/// A model clock driven by a [`TimeSource`]
pub struct ModelClock {
    conf: Option<ClockConf>,
    source: Arc<dyn TimeSource>,
}

impl ModelClock {
    /// Create an unconfigured clock
    pub fn new(source: impl TimeSource + 'static) -> Self {
        Self {
            conf: None,
            source: Arc::new(source),
        }
    }

    /// Create an unconfigured clock on the system clock
    pub fn system() -> Self {
        Self::new(WallClock)
    }

    /// Rebuild a clock from persisted anchors
    ///
    /// The clock always comes back paused. If it was running when saved,
    /// `last_modified` stands in for the pause instant.
    pub fn from_conf(
        conf: ClockConf,
        last_modified: DateTime<Utc>,
        source: impl TimeSource + 'static,
    ) -> Result<Self> {
        conf.validate()?;
        let conf = ClockConf {
            is_running: false,
            true_stop: conf.true_stop.or(Some(last_modified)),
            ..conf
        };
        Ok(Self {
            conf: Some(conf),
            source: Arc::new(source),
        })
    }

    /// Load the clock from a configuration store
    ///
    /// Returns an unconfigured clock if nothing has been stored.
    pub fn load(store: &dyn ConfStore, source: impl TimeSource + 'static) -> Result<Self> {
        match store.load(CONF_KEY)? {
            None => Ok(Self::new(source)),
            Some((json, last_modified)) => {
                let conf: ClockConf = serde_json::from_str(&json)?;
                Self::from_conf(conf, last_modified, source)
            }
        }
    }

    /// Save the clock to a configuration store
    pub fn save(&self, store: &dyn ConfStore) -> Result<()> {
        write_conf(self.persisted(), store)
    }

    /// The configuration as it should be persisted
    ///
    /// `is_running` is always false; `true_stop` is only present if the
    /// clock is paused.
    pub fn persisted(&self) -> Option<ClockConf> {
        self.conf.map(|conf| ClockConf {
            is_running: false,
            true_stop: if conf.is_running { None } else { conf.true_stop },
            ..conf
        })
    }

    pub fn conf(&self) -> Option<&ClockConf> {
        self.conf.as_ref()
    }

    pub fn state(&self) -> ClockState {
        match &self.conf {
            None => ClockState::Unconfigured,
            Some(conf) if conf.is_running => ClockState::Running,
            Some(_) => ClockState::Paused,
        }
    }

    /// Speed multiplier; 1 when unconfigured
    pub fn speed(&self) -> f64 {
        self.conf.map_or(1.0, |conf| conf.speed)
    }

    /// True time taken by one model second
    ///
    /// Saturates at `Duration::MAX` for speeds too slow to represent.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::try_from_secs_f64(1.0 / self.speed())
            .unwrap_or(std::time::Duration::MAX)
    }

    /// The current model instant
    pub fn model_now(&self) -> DateTime<Utc> {
        let now = self.source.now();
        match &self.conf {
            None => now,
            Some(conf) => conf.model_at(now),
        }
    }

    /// Configure the clock, paused at `model_instant`
    pub fn set(&mut self, speed: f64, model_instant: DateTime<Utc>) -> Result<()> {
        let conf = ClockConf::paused_at(speed, model_instant, self.source.now())?;
        debug!(speed, model = %iso::format(&model_instant), "clock set");
        self.conf = Some(conf);
        Ok(())
    }

    /// Start a paused clock from the instant it is paused at
    pub fn run(&mut self) -> Result<()> {
        let now = self.source.now();
        let conf = self.conf.as_mut().ok_or(Error::NotConfigured("run"))?;
        if conf.is_running {
            return Ok(());
        }

        conf.model_start = conf.model_at(now);
        conf.true_start = now;
        conf.true_stop = None;
        conf.is_running = true;

        debug!(model = %iso::format(&conf.model_start), "clock running");
        Ok(())
    }

    /// Freeze model time
    pub fn pause(&mut self) -> Result<()> {
        let now = self.source.now();
        let conf = self.conf.as_mut().ok_or(Error::NotConfigured("pause"))?;
        if !conf.is_running {
            return Ok(());
        }

        conf.true_stop = Some(now);
        conf.is_running = false;

        debug!(model = %iso::format(&conf.model_at(now)), "clock paused");
        Ok(())
    }

    /// Restart a paused clock, discounting the time spent paused
    pub fn resume(&mut self) -> Result<()> {
        let now = self.source.now();
        let conf = self.conf.as_mut().ok_or(Error::NotConfigured("resume"))?;
        if conf.is_running {
            return Ok(());
        }

        let paused_since = conf.true_stop.unwrap_or(conf.true_start);
        conf.true_start += now - paused_since;
        conf.true_stop = None;
        conf.is_running = true;

        debug!(model = %iso::format(&conf.model_at(now)), "clock resumed");
        Ok(())
    }

    /// Re-anchor the clock at a stored model instant and run it
    ///
    /// Speed is preserved; an unconfigured clock starts at speed 1.
    pub fn reload(&mut self, stored: DateTime<Utc>) -> Result<()> {
        let now = self.source.now();
        let speed = self.speed();
        self.conf = Some(ClockConf {
            is_running: true,
            speed,
            model_start: stored,
            true_start: now,
            true_stop: None,
        });

        debug!(speed, model = %iso::format(&stored), "clock reloaded");
        Ok(())
    }
}

impl fmt::Debug for ModelClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClock")
            .field("state", &self.state())
            .field("conf", &self.conf)
            .finish()
    }
}

/// A model clock shared between threads
///
/// Readers and writers take the same lock, so `model_now` never sees a
/// half-applied transition.
#[derive(Debug, Clone)]
pub struct SharedClock {
    inner: Arc<Mutex<ModelClock>>,
}

impl SharedClock {
    pub fn new(clock: ModelClock) -> Self {
        Self {
            inner: Arc::new(Mutex::new(clock)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ModelClock> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn model_now(&self) -> DateTime<Utc> {
        self.lock().model_now()
    }

    pub fn state(&self) -> ClockState {
        self.lock().state()
    }

    pub fn speed(&self) -> f64 {
        self.lock().speed()
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        self.lock().tick_interval()
    }

    pub fn set(&self, speed: f64, model_instant: DateTime<Utc>) -> Result<()> {
        self.lock().set(speed, model_instant)
    }

    pub fn run(&self) -> Result<()> {
        self.lock().run()
    }

    pub fn pause(&self) -> Result<()> {
        self.lock().pause()
    }

    pub fn resume(&self) -> Result<()> {
        self.lock().resume()
    }

    pub fn reload(&self, stored: DateTime<Utc>) -> Result<()> {
        self.lock().reload(stored)
    }

    /// Save the clock to a configuration store
    ///
    /// The lock is released before the store is written.
    pub fn save(&self, store: &dyn ConfStore) -> Result<()> {
        let conf = self.lock().persisted();
        write_conf(conf, store)
    }
}

fn write_conf(conf: Option<ClockConf>, store: &dyn ConfStore) -> Result<()> {
    let conf = conf.ok_or(Error::NotConfigured("save"))?;
    let json = serde_json::to_string(&conf)?;
    store.save(&json, CONF_KEY)
}

impl From<ModelClock> for SharedClock {
    fn from(clock: ModelClock) -> Self {
        Self::new(clock)
    }
}
