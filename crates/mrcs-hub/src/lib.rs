//! MRCS Hub - in-process message bus for the railway control system
//!
//! This crate wires the pure types of `mrcs-core` into a working bus:
//!
//! ```text
//! Publisher ──► Transport (Exchange)
//!                  │
//!                  ├── queue mrcs.test.SIG.001.002 ── callback
//!                  ├── queue mrcs.test.MLG.*.001   ── MessageRecorder ──► MessageLog
//!                  └── ...
//!
//! CronDispatcher ── SharedClock (model time) ──► Publisher
//! ```
//!
//! ## Key Components
//!
//! - [`Exchange`]: topic exchange with one queue per subscriber
//! - [`Transport`]: the publishing seam, implemented by `Exchange`
//! - [`Publisher`]: sends messages as a fixed identity
//! - [`MessageRecorder`]: writes all traffic to a message log
//! - [`CronDispatcher`]: publishes scheduled events as model time passes
//! - [`HubConfig`]: operation mode and identity, loaded from RON

mod config;
mod dispatcher;
mod error;
mod exchange;
mod publisher;
mod recorder;

pub use config::HubConfig;
pub use dispatcher::CronDispatcher;
pub use error::{Error, Result};
pub use exchange::{Callback, Exchange, Transport};
pub use publisher::Publisher;
pub use recorder::MessageRecorder;
