//! MRCS Core - addressing and model time for the railway control bus
//!
//! This crate provides the pure core shared by every piece of equipment on
//! the bus:
//! - Equipment coordinates (`EquipmentIdentifier`, `EquipmentFilter`)
//! - Routing keys and their wildcard matching
//! - Messages and their wire payload
//! - The model clock (`ModelClock`, `SharedClock`) and its persistence seam
//! - Cron jobs scheduled in model time
//! - Recorded messages and the log they are written to
//!
//! Nothing here performs I/O. Transports, storage and logging sinks live in
//! `mrcs-hub` and `mrcs-db`.
//!
//! ```
//! use mrcs_core::{PublicationRoutingKey, SubscriptionRoutingKey};
//!
//! let key: PublicationRoutingKey = "SIG.001.002.MPU.003.007".parse().unwrap();
//! let sub: SubscriptionRoutingKey = "SIG.*.*.MPU.*.*".parse().unwrap();
//! assert!(key.matches(&sub));
//! assert!(key.matches(&SubscriptionRoutingKey::all()));
//! ```

pub mod clock;
mod cron;
mod equipment;
mod error;
pub mod iso;
mod message;
mod mode;
mod record;
mod routing;
mod store;

pub use clock::{ClockConf, ClockState, ManualTime, ModelClock, SharedClock, TimeSource, WallClock};
pub use cron::{CronTable, Cronjob};
pub use equipment::{
    EquipmentFilter, EquipmentIdentifier, EquipmentSpec, EquipmentType, MAX_NUMBER, WILDCARD,
};
pub use error::{Error, Result};
pub use message::{new_origin, Message, Payload};
pub use mode::OperationMode;
pub use record::{MemoryMessageLog, MessageLog, MessageRecord};
pub use routing::{PublicationRoutingKey, RoutingKey, SubscriptionRoutingKey};
pub use store::{ConfStore, MemoryConfStore};
